fn main() {
    msim_tasks::entry_points::keep_resource();
}
