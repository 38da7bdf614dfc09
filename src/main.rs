fn main() {
    if let Err(err) = framelabel::run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
