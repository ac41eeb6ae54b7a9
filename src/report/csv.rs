// CLASSIFICATION: COMMUNITY
// Filename: csv.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! `Trial,Test,Time_ns,SegFaulted` rows, one per guarded run.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::ReportError;
use crate::guard::RunResult;
use crate::probe::ProbeKind;
use crate::trial::TrialRecord;

pub const HEADER: &str = "Trial,Test,Time_ns,SegFaulted";

pub fn format_row(record: &TrialRecord) -> String {
    format!(
        "{},{},{},{}",
        record.trial,
        record.kind,
        record.result.elapsed_ns,
        u8::from(record.result.crashed)
    )
}

pub fn parse_row(line: &str, lineno: usize) -> Result<TrialRecord, ReportError> {
    let bad = |reason: String| ReportError::Row {
        line: lineno,
        reason,
    };
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [trial, kind, ns, faulted] = fields.as_slice() else {
        return Err(bad(format!("expected 4 fields, found {}", fields.len())));
    };
    let trial = trial
        .parse::<u32>()
        .map_err(|e| bad(format!("trial {trial:?}: {e}")))?;
    let kind = kind.parse::<ProbeKind>().map_err(|e| bad(format!("{e}")))?;
    let elapsed_ns = ns
        .parse::<u64>()
        .map_err(|e| bad(format!("time {ns:?}: {e}")))?;
    let crashed = match faulted.to_ascii_lowercase().as_str() {
        "1" | "true" => true,
        "0" | "false" => false,
        other => return Err(bad(format!("fault flag {other:?} is not 0/1"))),
    };
    Ok(TrialRecord {
        trial,
        kind,
        result: RunResult {
            crashed,
            elapsed_ns,
        },
    })
}

/// Streams rows to a writer, header first.
pub struct CsvWriter<W: Write> {
    out: W,
    path: PathBuf,
    rows: usize,
}

impl CsvWriter<BufWriter<File>> {
    /// Create or truncate `path` and write the header.
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ReportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_path(BufWriter::new(file), path.to_path_buf())
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W) -> Result<Self, ReportError> {
        Self::with_path(out, PathBuf::from("<writer>"))
    }

    fn with_path(out: W, path: PathBuf) -> Result<Self, ReportError> {
        let mut writer = Self { out, path, rows: 0 };
        writer.line(HEADER)?;
        Ok(writer)
    }

    fn line(&mut self, text: &str) -> Result<(), ReportError> {
        writeln!(self.out, "{text}").map_err(|source| self.io(source))
    }

    fn io(&self, source: io::Error) -> ReportError {
        ReportError::Io {
            path: self.path.clone(),
            source,
        }
    }

    pub fn write_record(&mut self, record: &TrialRecord) -> Result<(), ReportError> {
        self.line(&format_row(record))?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, ReportError> {
        self.out.flush().map_err(|source| self.io(source))?;
        Ok(self.out)
    }
}

/// Parse a results file written by [`CsvWriter`]. Blank lines are skipped.
pub fn parse_records<R: BufRead>(reader: R) -> Result<Vec<TrialRecord>, ReportError> {
    let mut lines = reader.lines().enumerate();
    let header = match lines.next() {
        Some((_, line)) => line.map_err(|source| ReportError::Io {
            path: PathBuf::from("<reader>"),
            source,
        })?,
        None => String::new(),
    };
    if header.trim() != HEADER {
        return Err(ReportError::Header { found: header });
    }
    let mut records = Vec::new();
    for (idx, line) in lines {
        let line = line.map_err(|source| ReportError::Io {
            path: PathBuf::from("<reader>"),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_row(&line, idx + 1)?);
    }
    Ok(records)
}

pub fn read_records(path: &Path) -> Result<Vec<TrialRecord>, ReportError> {
    let file = File::open(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(trial: u32, kind: ProbeKind, ns: u64, crashed: bool) -> TrialRecord {
        TrialRecord {
            trial,
            kind,
            result: RunResult {
                crashed,
                elapsed_ns: ns,
            },
        }
    }

    #[test]
    fn writes_header_then_rows() {
        let mut w = CsvWriter::new(Vec::new()).unwrap();
        w.write_record(&record(1, ProbeKind::Heap, 1500, true)).unwrap();
        w.write_record(&record(1, ProbeKind::Kernel, 900, false)).unwrap();
        assert_eq!(w.rows(), 2);
        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "Trial,Test,Time_ns,SegFaulted\n1,Heap,1500,1\n1,Kernel,900,0\n"
        );
    }

    #[test]
    fn reads_back_written_rows() {
        let text = "Trial,Test,Time_ns,SegFaulted\n1,Heap,42,1\n\n2,Kernel,7,true\n";
        let records = parse_records(text.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![
                record(1, ProbeKind::Heap, 42, true),
                record(2, ProbeKind::Kernel, 7, true)
            ]
        );
    }

    #[test]
    fn rejects_foreign_header() {
        let err = parse_records("a,b,c\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Header { found } if found == "a,b,c"));
        assert!(matches!(
            parse_records("".as_bytes()),
            Err(ReportError::Header { .. })
        ));
    }

    #[test]
    fn malformed_row_names_its_line() {
        let text = "Trial,Test,Time_ns,SegFaulted\n1,Heap,10,1\n2,Heap,oops,0\n";
        let err = parse_records(text.as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Row { line: 3, .. }), "{err}");
        let err = parse_row("1,Stack,10,1", 9).unwrap_err();
        assert!(matches!(err, ReportError::Row { line: 9, .. }));
        let err = parse_row("1,Heap,10", 4).unwrap_err();
        assert!(err.to_string().contains("expected 4 fields"));
    }
}
