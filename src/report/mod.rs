// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Result persistence and summaries.

pub mod csv;
pub mod summary;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use self::csv::{read_records, CsvWriter};
pub use summary::{KindSummary, Summary, SummaryBuilder};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unexpected CSV header {found:?}")]
    Header { found: String },
    #[error("line {line}: {reason}")]
    Row { line: usize, reason: String },
    #[error("summary serialisation failed: {0}")]
    Json(#[from] serde_json::Error),
}
