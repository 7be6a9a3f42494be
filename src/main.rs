fn main() {
    if let Err(err) = timeline_fishbone::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
