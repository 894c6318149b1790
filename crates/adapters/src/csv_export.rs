//! Semicolon separated export of digest records

use epo_reputation_domain::{DigestRecord, compact_date};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use time::Date;

/// Header row of every export
pub const CSV_HEADER: [&str; 5] = ["filename", "comment", "md5 hash", "sha1 hash", "reputation"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Write records as `;` separated rows with hex digests and numeric reputation
pub fn write_csv<W: Write>(writer: W, records: &[DigestRecord]) -> Result<(), ExportError> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(writer);

    csv.write_record(CSV_HEADER)?;
    for record in records {
        csv.write_record([
            record.name().to_string(),
            record.comment().to_string(),
            record.md5().to_hex(),
            record.sha1().to_hex(),
            record.reputation().score().to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write records to a file, replacing any existing content
pub fn export_csv(path: impl AsRef<Path>, records: &[DigestRecord]) -> Result<(), ExportError> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)?;
    write_csv(file, records)?;
    tracing::info!(path = %path.display(), rows = records.len(), "Exported digests");
    Ok(())
}

/// `output_<YYYYMMDD>.csv`
pub fn default_file_name(date: Date) -> String {
    format!("output_{}.csv", compact_date(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use epo_reputation_domain::Reputation;
    use tempfile::TempDir;
    use time::Month;

    fn records() -> Vec<DigestRecord> {
        vec![
            DigestRecord::from_contents(
                "setup.exe",
                "2016-11-14 alice@WebAPI",
                b"hello world",
                Reputation::KnownTrusted,
            ),
            DigestRecord::from_contents("a;b.dll", "c", b"", Reputation::Unknown),
        ]
    }

    #[test]
    fn test_write_csv_layout() {
        let mut out = Vec::new();
        write_csv(&mut out, &records()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "filename;comment;md5 hash;sha1 hash;reputation");
        assert_eq!(
            lines[1],
            "setup.exe;2016-11-14 alice@WebAPI;5eb63bbbe01eeed093cb22bb8f5acdc3;\
             2aae6c35c94fcfb415dbe95f408b9ce91ee846ed;99"
        );
        assert!(lines[2].starts_with("\"a;b.dll\";c;d41d8cd98f00b204e9800998ecf8427e;"));
        assert!(lines[2].ends_with(";50"));
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "filename;comment;md5 hash;sha1 hash;reputation\n"
        );
    }

    #[test]
    fn test_export_csv_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        export_csv(&path, &records()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_default_file_name() {
        let date = Date::from_calendar_date(2016, Month::November, 4).unwrap();
        assert_eq!(default_file_name(date), "output_20161104.csv");
    }
}
