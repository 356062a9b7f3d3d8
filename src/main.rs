fn main() {
    if let Err(err) = csv_catalogue::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
