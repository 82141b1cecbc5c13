// Forwards to the block-forge-app binary
fn main() {
    std::process::exit(match block_forge_app::run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    });
}
