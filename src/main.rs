fn main() {
    if let Err(err) = dictionary_diff::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
