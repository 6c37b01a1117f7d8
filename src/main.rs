fn main() {
    if let Err(err) = cardchat::cli::main() {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
}
