// CLASSIFICATION: COMMUNITY
// Filename: memcrash.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Entry point for the memcrash trial runner.

use clap::Parser;
use memcrash::binlib::memcrash_main;
use memcrash::cli::RunCli;

fn main() {
    env_logger::init();
    let cli = RunCli::parse();
    if let Err(err) = memcrash_main::run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
