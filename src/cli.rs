// CLASSIFICATION: COMMUNITY
// Filename: cli.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::path::PathBuf;

use clap::Parser;

use crate::config::{TestSelection, DEFAULT_CSV_PATH};

/// Arguments of the `memcrash` trial runner.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "memcrash",
    version,
    about = "Provoke heap-overrun and supervisor-write faults and time how long each takes to crash"
)]
pub struct RunCli {
    /// Probes to run in every trial
    #[arg(long, value_enum, default_value_t = TestSelection::Both)]
    pub test: TestSelection,
    /// Number of trials
    #[arg(long, default_value_t = 3)]
    pub trials: u32,
    /// Heap allocation size in bytes
    #[arg(long, default_value_t = 16)]
    pub alloc: usize,
    /// Bytes to write past the end of the allocation
    #[arg(long, default_value_t = 1024)]
    pub overrun: usize,
    /// Virtual address for the kernel probe (hex)
    #[arg(long, value_name = "HEX")]
    pub addr: Option<String>,
    /// Results CSV path [env: MEMCRASH_CSV] [default: mem_crash_results.csv]
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
    /// Do not print a summary
    #[arg(long)]
    pub quiet: bool,
}

/// Arguments of `memcrash-summary`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "memcrash-summary",
    version,
    about = "Summarise a memcrash results CSV"
)]
pub struct SummaryCli {
    /// Results CSV to read
    #[arg(default_value = DEFAULT_CSV_PATH)]
    pub input: PathBuf,
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}
