use std::path::Path;

use wabc_core::DeliveryOutcome;

pub const HEADER: [&str; 3] = ["phone_number", "error_message", "timestamp"];

/// Writes one row per failed outcome, overwriting `path`. Returns the row
/// count.
pub fn write_failures(path: &Path, outcomes: &[DeliveryOutcome]) -> Result<usize, csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(HEADER)?;
    let mut rows = 0;
    for outcome in outcomes {
        if let Some(error) = outcome.error() {
            let timestamp = outcome.timestamp.to_rfc3339();
            wtr.write_record([outcome.recipient.as_str(), error, timestamp.as_str()])?;
            rows += 1;
        }
    }
    wtr.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wabc_core::Recipient;

    #[test]
    fn only_failures_are_written_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed.csv");
        let a = Recipient::parse("27821234567").unwrap();
        let b = Recipient::parse("27829876543").unwrap();
        let outcomes = vec![
            DeliveryOutcome::delivered(a, None, "wamid.1".into()),
            DeliveryOutcome::failed(b, "document send failed: 400 {\"error\":\"x, y\"}".into()),
        ];

        assert_eq!(write_failures(&path, &outcomes).unwrap(), 1);

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        assert_eq!(rdr.headers().unwrap(), &csv::StringRecord::from(HEADER.to_vec()));
        let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "27829876543");
        assert_eq!(&rows[0][1], "document send failed: 400 {\"error\":\"x, y\"}");
        assert!(chrono::DateTime::parse_from_rfc3339(&rows[0][2]).is_ok());
    }
}
