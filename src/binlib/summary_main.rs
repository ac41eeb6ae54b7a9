// CLASSIFICATION: COMMUNITY
// Filename: summary_main.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::io::Write;

use anyhow::{bail, Context};
use log::info;

use crate::cli::SummaryCli;
use crate::report::{read_records, Summary};

/// Summarise a previously written results file.
pub fn run(cli: SummaryCli) -> anyhow::Result<()> {
    let records = read_records(&cli.input)?;
    info!("read {} record(s) from {}", records.len(), cli.input.display());
    if records.is_empty() {
        bail!("{}: no result rows", cli.input.display());
    }
    let summary = Summary::from_records(&records);
    let mut out = std::io::stdout().lock();
    if cli.json {
        writeln!(out, "{}", summary.to_json()?).context("writing summary")?;
    } else {
        write!(out, "{summary}").context("writing summary")?;
    }
    Ok(())
}
