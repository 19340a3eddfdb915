fn main() {
    msim_tasks::entry_points::resume_clean();
}
