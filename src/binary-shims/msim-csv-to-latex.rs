fn main() {
    msim_tasks::entry_points::csv_to_latex();
}
