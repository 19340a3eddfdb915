fn main() {
    msim_tasks::entry_points::submit_jobs();
}
