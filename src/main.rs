fn main() {
    querycheck::cli::run();
}
