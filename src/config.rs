// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Harness configuration resolved from the command line and environment.

use std::num::ParseIntError;
use std::path::PathBuf;

use clap::ValueEnum;
use thiserror::Error;

use crate::cli::RunCli;
use crate::probe::heap::{DEFAULT_ALLOCATION_SIZE, DEFAULT_OVERRUN_SIZE};
use crate::probe::kernel::DEFAULT_SUPERVISOR_ADDRESS;
use crate::probe::ProbeKind;

/// Results file used when neither `--csv` nor the environment names one.
pub const DEFAULT_CSV_PATH: &str = "mem_crash_results.csv";
/// Environment variable overriding the results file.
pub const CSV_PATH_ENV: &str = "MEMCRASH_CSV";

/// Which probes each trial runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TestSelection {
    Heap,
    Kernel,
    #[default]
    Both,
}

impl TestSelection {
    /// Probe kinds in execution order within one trial.
    pub fn kinds(self) -> &'static [ProbeKind] {
        match self {
            TestSelection::Heap => &[ProbeKind::Heap],
            TestSelection::Kernel => &[ProbeKind::Kernel],
            TestSelection::Both => &[ProbeKind::Heap, ProbeKind::Kernel],
        }
    }
}

/// How the summary is printed at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Quiet,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("trial count must be at least 1")]
    NoTrials,
    #[error("allocation size must be at least 1 byte")]
    EmptyAllocation,
    #[error("invalid address {input:?}: {source}")]
    InvalidAddress {
        input: String,
        #[source]
        source: ParseIntError,
    },
    #[error("address {0:#x} does not fit this target's pointer width")]
    AddressTooWide(u64),
}

/// Resolved configuration after CLI parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub selection: TestSelection,
    pub trials: u32,
    pub allocation_size: usize,
    pub overrun_size: usize,
    pub address: u64,
    pub csv_path: PathBuf,
    pub output: OutputFormat,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            selection: TestSelection::Both,
            trials: 3,
            allocation_size: DEFAULT_ALLOCATION_SIZE,
            overrun_size: DEFAULT_OVERRUN_SIZE,
            address: DEFAULT_SUPERVISOR_ADDRESS,
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            output: OutputFormat::Table,
        }
    }
}

impl HarnessConfig {
    pub fn from_cli(cli: &RunCli) -> Result<Self, ConfigError> {
        let address = match cli.addr.as_deref() {
            Some(raw) => parse_address(raw)?,
            None => DEFAULT_SUPERVISOR_ADDRESS,
        };
        let csv_path = cli
            .csv
            .clone()
            .or_else(|| std::env::var_os(CSV_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH));
        let output = if cli.quiet {
            OutputFormat::Quiet
        } else if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        };
        let cfg = Self {
            selection: cli.test,
            trials: cli.trials,
            allocation_size: cli.alloc,
            overrun_size: cli.overrun,
            address,
            csv_path,
            output,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        if self.allocation_size == 0 {
            return Err(ConfigError::EmptyAllocation);
        }
        if usize::try_from(self.address).is_err() {
            return Err(ConfigError::AddressTooWide(self.address));
        }
        Ok(())
    }
}

/// Parse a hexadecimal address, with or without a `0x` prefix. Underscores
/// are accepted as digit separators.
pub fn parse_address(raw: &str) -> Result<u64, ConfigError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .replace('_', "");
    u64::from_str_radix(&digits, 16).map_err(|source| ConfigError::InvalidAddress {
        input: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> RunCli {
        let mut argv = vec!["memcrash"];
        argv.extend_from_slice(args);
        RunCli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_hex_addresses() {
        assert_eq!(parse_address("0xFFFF000000000000").unwrap(), 0xFFFF_0000_0000_0000);
        assert_eq!(parse_address("ffff000000000000").unwrap(), 0xFFFF_0000_0000_0000);
        assert_eq!(parse_address(" 0XdeAd_bEEf ").unwrap(), 0xDEAD_BEEF);
        assert!(matches!(
            parse_address("0xnothex"),
            Err(ConfigError::InvalidAddress { .. })
        ));
        assert!(parse_address("").is_err());
    }

    #[test]
    fn defaults_follow_harness_defaults() {
        let cfg = HarnessConfig::from_cli(&cli(&["--csv", "out.csv"])).unwrap();
        assert_eq!(cfg.selection, TestSelection::Both);
        assert_eq!(cfg.trials, 3);
        assert_eq!(cfg.allocation_size, 16);
        assert_eq!(cfg.overrun_size, 1024);
        assert_eq!(cfg.address, DEFAULT_SUPERVISOR_ADDRESS);
        assert_eq!(cfg.csv_path, PathBuf::from("out.csv"));
        assert_eq!(cfg.output, OutputFormat::Table);
    }

    #[test]
    fn flags_are_applied() {
        let cfg = HarnessConfig::from_cli(&cli(&[
            "--test", "kernel", "--trials", "7", "--alloc", "64", "--overrun", "0", "--addr",
            "0x1000", "--csv", "x.csv", "--json",
        ]))
        .unwrap();
        assert_eq!(cfg.selection, TestSelection::Kernel);
        assert_eq!(cfg.trials, 7);
        assert_eq!(cfg.allocation_size, 64);
        assert_eq!(cfg.overrun_size, 0);
        assert_eq!(cfg.address, 0x1000);
        assert_eq!(cfg.output, OutputFormat::Json);
    }

    #[test]
    fn quiet_wins_over_json() {
        let cfg = HarnessConfig::from_cli(&cli(&["--json", "--quiet", "--csv", "q.csv"])).unwrap();
        assert_eq!(cfg.output, OutputFormat::Quiet);
    }

    #[test]
    fn rejects_zero_trials_and_empty_allocation() {
        assert!(matches!(
            HarnessConfig::from_cli(&cli(&["--trials", "0", "--csv", "a.csv"])),
            Err(ConfigError::NoTrials)
        ));
        assert!(matches!(
            HarnessConfig::from_cli(&cli(&["--alloc", "0", "--csv", "a.csv"])),
            Err(ConfigError::EmptyAllocation)
        ));
    }

    #[test]
    fn selection_orders_heap_before_kernel() {
        assert_eq!(TestSelection::Both.kinds(), &[ProbeKind::Heap, ProbeKind::Kernel]);
        assert_eq!(TestSelection::Heap.kinds(), &[ProbeKind::Heap]);
        assert_eq!(TestSelection::Kernel.kinds(), &[ProbeKind::Kernel]);
    }
}
