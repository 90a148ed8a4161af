fn main() {
    if let Err(e) = catalog_browser::app::run_cli() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
