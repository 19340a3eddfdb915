fn main() {
    msim_tasks::entry_points::relax();
}
