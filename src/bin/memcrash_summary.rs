// CLASSIFICATION: COMMUNITY
// Filename: memcrash_summary.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Entry point for summarising a memcrash results file.

use clap::Parser;
use memcrash::binlib::summary_main;
use memcrash::cli::SummaryCli;

fn main() {
    env_logger::init();
    let cli = SummaryCli::parse();
    if let Err(err) = summary_main::run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
