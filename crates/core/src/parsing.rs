use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::models::Recipient;

pub fn compute_sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, thiserror::Error)]
pub enum RecipientLoadError {
    #[error("cannot open recipient file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read recipient file at line {line}: {source}")]
    Read {
        line: u64,
        #[source]
        source: csv::Error,
    },
}

/// A row whose first column did not reduce to a usable number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub raw: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecipientList {
    pub accepted: Vec<Recipient>,
    pub skipped: Vec<SkippedRow>,
}

impl RecipientList {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

pub fn load_recipients(path: &Path) -> Result<RecipientList, RecipientLoadError> {
    let file = File::open(path).map_err(|source| RecipientLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_recipients(file)
}

/// Reads comma-delimited rows without a header and keeps column 0 of each.
///
/// Blank rows are ignored silently. Every other row that fails
/// [`Recipient::parse`] lands in `skipped` with its raw value; output order
/// follows the file. Other columns are never decoded, so their encoding does
/// not matter.
pub fn parse_recipients<R: Read>(reader: R) -> Result<RecipientList, RecipientLoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut list = RecipientList::default();
    for (idx, record) in rdr.byte_records().enumerate() {
        let record = record.map_err(|source| RecipientLoadError::Read {
            line: source
                .position()
                .map(|p| p.line())
                .unwrap_or(idx as u64 + 1),
            source,
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(idx as u64 + 1);

        let Some(first) = record.get(0) else {
            continue;
        };
        if record.len() == 1 && first.is_empty() {
            continue;
        }

        let first = String::from_utf8_lossy(first);
        let raw = first.trim();
        match Recipient::parse(raw) {
            Some(recipient) => list.accepted.push(recipient),
            None => {
                tracing::debug!(line, raw, "skipping row without a usable number");
                list.skipped.push(SkippedRow {
                    line,
                    raw: raw.to_string(),
                });
            }
        }
    }
    Ok(list)
}
