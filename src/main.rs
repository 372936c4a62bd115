fn main() {
    rossa::cli::run();
}
