fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(error) = cornell_core::run() {
            eprintln!("cornell: {error}");
            std::process::exit(1);
        }
    }
}
