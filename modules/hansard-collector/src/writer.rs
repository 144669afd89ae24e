//! Incremental writer for the persisted corpus.
//!
//! `quotes.jsonl` is the source of truth: append-only, one record per line,
//! synced after every record. `quotes.csv` mirrors it row for row and is
//! regenerated from the JSONL whenever the two disagree.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use hansard_common::ClassifiedQuote;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::tabular::{header_row, parse_rows, quote_row, write_row};

pub const QUOTES_JSONL: &str = "quotes.jsonl";
pub const QUOTES_CSV: &str = "quotes.csv";

pub struct IncrementalWriter {
    jsonl_path: PathBuf,
    csv_path: PathBuf,
    jsonl: File,
    csv: File,
    records: usize,
}

impl IncrementalWriter {
    /// Open (or create) the corpus in `dir`, repairing whatever a crash left behind.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(StoreError::io(dir))?;
        let jsonl_path = dir.join(QUOTES_JSONL);
        let csv_path = dir.join(QUOTES_CSV);

        let records = repair_jsonl(&jsonl_path)?;
        if !csv_matches(&csv_path, records)? {
            let rebuilt = rebuild_csv(dir)?;
            info!(rows = rebuilt, path = %csv_path.display(), "Regenerated tabular corpus from JSONL");
        }

        let jsonl = append_handle(&jsonl_path)?;
        let csv = append_handle(&csv_path)?;
        Ok(Self {
            jsonl_path,
            csv_path,
            jsonl,
            csv,
            records,
        })
    }

    /// Durably append one record. A crash part-way leaves at most a torn
    /// trailing JSONL line, which the next `open` truncates.
    pub fn append(&mut self, record: &ClassifiedQuote) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.jsonl
            .write_all(line.as_bytes())
            .and_then(|_| self.jsonl.sync_data())
            .map_err(StoreError::io(&self.jsonl_path))?;

        let mut row = Vec::new();
        write_row(&mut row, &quote_row(record), ',').map_err(StoreError::io(&self.csv_path))?;
        self.csv
            .write_all(&row)
            .and_then(|_| self.csv.sync_data())
            .map_err(StoreError::io(&self.csv_path))?;

        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn jsonl_path(&self) -> &Path {
        &self.jsonl_path
    }
}

fn append_handle(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(StoreError::io(path))
}

/// Truncate a torn trailing line and return the number of complete records.
fn repair_jsonl(path: &Path) -> Result<usize> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(StoreError::io(path)(e)),
    };

    let complete = match bytes.iter().rposition(|&b| b == b'\n') {
        Some(last_newline) => last_newline + 1,
        None => 0,
    };
    if complete < bytes.len() {
        warn!(
            path = %path.display(),
            torn_bytes = bytes.len() - complete,
            "Truncating torn trailing record"
        );
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(StoreError::io(path))?;
        file.set_len(complete as u64)
            .and_then(|_| file.sync_all())
            .map_err(StoreError::io(path))?;
    }

    Ok(bytes[..complete]
        .split(|&b| b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .count())
}

fn csv_matches(path: &Path, records: usize) -> Result<bool> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(StoreError::io(path)(e)),
    };
    if !text.ends_with('\n') {
        return Ok(false);
    }
    let rows = parse_rows(&text, ',');
    let header_ok = rows.first().is_some_and(|h| *h == header_row());
    Ok(header_ok && rows.len() - 1 == records)
}

/// Every record in a JSONL corpus, in file order. A missing file is an empty
/// corpus; a torn final line is ignored.
pub fn read_jsonl(path: &Path) -> Result<Vec<ClassifiedQuote>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path)(e)),
    };

    let mut records = Vec::new();
    let mut lines = BufReader::new(file).lines().enumerate().peekable();
    while let Some((n, line)) = lines.next() {
        let line = line.map_err(StoreError::io(path))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) if lines.peek().is_none() => {
                warn!(path = %path.display(), line = n + 1, error = %e, "Ignoring torn final record");
            }
            Err(source) => {
                return Err(StoreError::Record {
                    path: path.to_path_buf(),
                    line: n + 1,
                    source,
                })
            }
        }
    }
    Ok(records)
}

/// Regenerate `quotes.csv` from `quotes.jsonl`, replacing it atomically.
pub fn rebuild_csv(dir: &Path) -> Result<usize> {
    let records = read_jsonl(&dir.join(QUOTES_JSONL))?;
    let csv_path = dir.join(QUOTES_CSV);

    let mut tmp = NamedTempFile::new_in(dir).map_err(StoreError::io(dir))?;
    write_row(&mut tmp, &header_row(), ',').map_err(StoreError::io(&csv_path))?;
    for record in &records {
        write_row(&mut tmp, &quote_row(record), ',').map_err(StoreError::io(&csv_path))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(StoreError::io(&csv_path))?;
    tmp.persist(&csv_path).map_err(|source| StoreError::Persist {
        path: csv_path.clone(),
        source,
    })?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hansard_common::{Frame, House, QuoteCandidate};

    fn record(n: usize) -> ClassifiedQuote {
        ClassifiedQuote::new(
            QuoteCandidate {
                date: NaiveDate::from_ymd_opt(1905, 8, 10).unwrap(),
                house: House::Commons,
                debate_title: "ALIENS BILL.".into(),
                member: format!("Mr. Member{n}"),
                party: None,
                quote: format!("Aliens, sir, \"depress\" wages,\nnumber {n}."),
                hansard_url: "https://example.org/commons/1905/aug/10/aliens-bill".into(),
                json_url: "https://example.org/commons/1905/aug/10/aliens-bill.js".into(),
            },
            Frame::LabourThreat,
            6,
        )
    }

    #[test]
    fn appends_to_both_forms() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IncrementalWriter::open(dir.path()).unwrap();
        writer.append(&record(1)).unwrap();
        writer.append(&record(2)).unwrap();
        drop(writer);

        let records = read_jsonl(&dir.path().join(QUOTES_JSONL)).unwrap();
        assert_eq!(records, vec![record(1), record(2)]);

        let csv = fs::read_to_string(dir.path().join(QUOTES_CSV)).unwrap();
        let rows = parse_rows(&csv, ',');
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], header_row());
        assert_eq!(rows[2], quote_row(&record(2)));
    }

    #[test]
    fn reopening_continues_without_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IncrementalWriter::open(dir.path()).unwrap();
        writer.append(&record(1)).unwrap();
        drop(writer);

        let mut writer = IncrementalWriter::open(dir.path()).unwrap();
        assert_eq!(writer.records(), 1);
        writer.append(&record(2)).unwrap();
        assert_eq!(writer.records(), 2);
        drop(writer);

        assert_eq!(read_jsonl(&dir.path().join(QUOTES_JSONL)).unwrap().len(), 2);
    }

    #[test]
    fn torn_tail_is_truncated_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IncrementalWriter::open(dir.path()).unwrap();
        writer.append(&record(1)).unwrap();
        drop(writer);

        let path = dir.path().join(QUOTES_JSONL);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"date\":\"1905-08-").unwrap();
        drop(file);

        let mut writer = IncrementalWriter::open(dir.path()).unwrap();
        assert_eq!(writer.records(), 1);
        writer.append(&record(2)).unwrap();
        drop(writer);
        assert_eq!(read_jsonl(&path).unwrap(), vec![record(1), record(2)]);
    }

    #[test]
    fn stale_csv_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IncrementalWriter::open(dir.path()).unwrap();
        writer.append(&record(1)).unwrap();
        writer.append(&record(2)).unwrap();
        drop(writer);

        // Simulate a crash between the JSONL and CSV writes.
        fs::write(dir.path().join(QUOTES_CSV), "date,house\n").unwrap();
        IncrementalWriter::open(dir.path()).unwrap();

        let csv = fs::read_to_string(dir.path().join(QUOTES_CSV)).unwrap();
        assert_eq!(parse_rows(&csv, ',').len(), 3);
    }

    #[test]
    fn missing_corpus_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_jsonl(&dir.path().join(QUOTES_JSONL)).unwrap().is_empty());
    }
}
