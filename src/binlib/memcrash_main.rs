// CLASSIFICATION: COMMUNITY
// Filename: memcrash_main.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::io::Write;

use anyhow::Context;
use log::{debug, info};

use crate::cli::RunCli;
use crate::config::{HarnessConfig, OutputFormat};
use crate::guard::GuardError;
use crate::interceptor::FaultInterceptor;
use crate::report::{CsvWriter, SummaryBuilder};
use crate::trial::TrialRunner;

/// Run the trial harness described by `cli`, writing the summary to stdout.
pub fn run(cli: RunCli) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    run_with_output(cli, &mut stdout.lock())
}

/// As [`run`], with the summary written to `out`.
pub fn run_with_output<W: Write>(cli: RunCli, out: &mut W) -> anyhow::Result<()> {
    let config = HarnessConfig::from_cli(&cli)?;
    debug!("resolved config: {:?}", config);

    let mut csv = CsvWriter::create(&config.csv_path)?;
    let mut runner = TrialRunner::from_config(&config).map_err(GuardError::Setup)?;
    info!(
        "running {} trial(s) of {:?} with {} interceptor",
        config.trials,
        runner.probe_kinds(),
        runner.guard().interceptor().name()
    );

    let mut totals = SummaryBuilder::new();
    let rows = runner.stream(config.trials, |record| {
        csv.write_record(record)?;
        totals.push(record);
        Ok(())
    })?;
    csv.finish()?;
    info!("wrote {} result row(s) to {}", rows, config.csv_path.display());

    let summary = totals.finish();
    match config.output {
        OutputFormat::Table => write!(out, "{summary}").context("writing summary")?,
        OutputFormat::Json => writeln!(out, "{}", summary.to_json()?).context("writing summary")?,
        OutputFormat::Quiet => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    #[test]
    #[serial]
    fn json_summary_goes_to_writer() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("r.csv");
        let cli = RunCli::try_parse_from([
            "memcrash",
            "--test",
            "heap",
            "--trials",
            "1",
            "--json",
            "--csv",
            csv.to_str().unwrap(),
        ])
        .unwrap();
        let mut out = Vec::new();
        run_with_output(cli, &mut out).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["rows"][0]["kind"], "Heap");
        assert!(csv.exists());
    }

    #[test]
    fn invalid_config_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("r.csv");
        let cli = RunCli::try_parse_from([
            "memcrash",
            "--alloc",
            "0",
            "--csv",
            csv.to_str().unwrap(),
        ])
        .unwrap();
        let mut out = Vec::new();
        assert!(run_with_output(cli, &mut out).is_err());
        assert!(out.is_empty());
        assert!(!csv.exists());
    }
}
