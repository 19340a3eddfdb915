fn main() {
    msim_tasks::entry_points::job_script();
}
