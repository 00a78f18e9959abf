fn main() {
    if let Err(e) = iocsync::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
