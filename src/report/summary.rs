// CLASSIFICATION: COMMUNITY
// Filename: summary.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Per-probe aggregate of a run: trials, mean time, fault count.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use serde::Serialize;

use super::ReportError;
use crate::probe::ProbeKind;
use crate::trial::TrialRecord;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub kind: ProbeKind,
    pub trials: usize,
    /// Integer mean of `elapsed_ns`.
    pub avg_ns: u64,
    pub faults: usize,
}

/// Rows ordered Heap, Kernel. Kinds without records are left out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub rows: Vec<KindSummary>,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    generated_at: String,
    rows: &'a [KindSummary],
}

/// Running per-kind totals, fed one record at a time.
#[derive(Clone, Debug, Default)]
pub struct SummaryBuilder {
    acc: BTreeMap<ProbeKind, (usize, u128, usize)>,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &TrialRecord) {
        let entry = self.acc.entry(record.kind).or_default();
        entry.0 += 1;
        entry.1 += u128::from(record.result.elapsed_ns);
        entry.2 += usize::from(record.result.crashed);
    }

    pub fn finish(self) -> Summary {
        let rows = self
            .acc
            .into_iter()
            .map(|(kind, (trials, total, faults))| KindSummary {
                kind,
                trials,
                avg_ns: u64::try_from(total / trials as u128).unwrap_or(u64::MAX),
                faults,
            })
            .collect();
        Summary { rows }
    }
}

impl Summary {
    pub fn from_records(records: &[TrialRecord]) -> Self {
        let mut builder = SummaryBuilder::new();
        for rec in records {
            builder.push(rec);
        }
        builder.finish()
    }

    pub fn get(&self, kind: ProbeKind) -> Option<&KindSummary> {
        self.rows.iter().find(|r| r.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Markdown-style table, leading blank line included.
    pub fn render_table(&self) -> String {
        let mut out = String::from(
            "\n| Test   | Avg time (ns) | Trials | SIGSEGVs |\n\
             |--------|--------------:|-------:|---------:|\n",
        );
        for row in &self.rows {
            out.push_str(&format!(
                "| {:<6} | {:>12} | {} | {} |\n",
                row.kind.label(),
                row.avg_ns,
                row.trials,
                row.faults
            ));
        }
        out
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        let doc = JsonSummary {
            generated_at: Utc::now().to_rfc3339(),
            rows: &self.rows,
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_table())
    }
}
