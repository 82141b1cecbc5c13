//! # Block Forge Application (Binary)
//!
//! Main executable entry point.

fn main() -> anyhow::Result<()> {
    block_forge_app::run()
}
