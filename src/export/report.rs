//! Report file emission
//!
//! One delimited file per cycle, named `<prefix>_<YYYYMMDD_HHMMSS>.csv` from
//! the cycle's wall-clock start time:
//!
//! ```text
//! ID_MOEDA,DATA_REF,VLR_COTACAO
//! USD,02/01/2023,5.10
//! USD,03/01/2023,5.15
//! ```

use crate::error::{ExportError, Result};
use crate::types::ReportRow;
use chrono::NaiveDateTime;
use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_HEADER: [&str; 3] = ["ID_MOEDA", "DATA_REF", "VLR_COTACAO"];
pub const DEFAULT_REPORT_PREFIX: &str = "Resultado";
pub const REPORT_DATE_FORMAT: &str = "%d/%m/%Y";
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes joined rows to dated files under one output directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    prefix: String,
    delimiter: u8,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: DEFAULT_REPORT_PREFIX.to_string(),
            delimiter: b',',
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Field delimiter; must be a single ASCII character
    pub fn with_delimiter(mut self, delimiter: char) -> Result<Self> {
        if !delimiter.is_ascii() || delimiter == '\n' || delimiter == '\r' {
            return Err(ExportError::ConfigError(format!(
                "Report delimiter must be a single ASCII character, got {:?}",
                delimiter
            )));
        }
        self.delimiter = delimiter as u8;
        Ok(self)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File name for a cycle started at `started_at`
    pub fn file_name(&self, started_at: NaiveDateTime) -> String {
        format!("{}.csv", self.file_stem(started_at))
    }

    fn file_stem(&self, started_at: NaiveDateTime) -> String {
        format!("{}_{}", self.prefix, started_at.format(FILE_TIMESTAMP_FORMAT))
    }

    /// Write `rows` and return the path of the new file. An existing report
    /// with the same name is never overwritten; a numeric suffix is added.
    pub fn write(&self, rows: &[ReportRow], started_at: NaiveDateTime) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.free_path(started_at);
        self.write_at(rows, &path)?;
        Ok(path)
    }

    /// Write through a temp file renamed onto `path`; the temp file is
    /// removed again if any step fails.
    fn write_at(&self, rows: &[ReportRow], path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("csv.tmp");

        let written = self
            .write_rows(rows, &tmp_path)
            .and_then(|()| fs::rename(&tmp_path, path).map_err(ExportError::from));
        if written.is_err() {
            if let Err(e) = fs::remove_file(&tmp_path) {
                log::debug!("Could not remove {}: {}", tmp_path.display(), e);
            }
        }
        written
    }

    fn write_rows(&self, rows: &[ReportRow], tmp_path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(tmp_path)?;
        writer.write_record(REPORT_HEADER)?;
        for row in rows {
            let date = row.date.format(REPORT_DATE_FORMAT).to_string();
            let value = row.value.to_string();
            writer.write_record([row.currency_code.as_str(), date.as_str(), value.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn free_path(&self, started_at: NaiveDateTime) -> PathBuf {
        let stem = self.file_stem(started_at);
        let mut path = self.output_dir.join(format!("{}.csv", stem));
        let mut suffix = 1;
        while path.exists() {
            path = self.output_dir.join(format!("{}_{}.csv", stem, suffix));
            suffix += 1;
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn started_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 10)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    fn rows() -> Vec<ReportRow> {
        vec![
            ReportRow {
                currency_code: "USD".into(),
                date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                value: dec!(5.10),
            },
            ReportRow {
                currency_code: "USD".into(),
                date: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
                value: dec!(5.15),
            },
        ]
    }

    #[test]
    fn test_file_name() {
        let writer = ReportWriter::new("/tmp/out");
        assert_eq!(writer.file_name(started_at()), "Resultado_20230110_140509.csv");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let path = writer.write(&rows(), started_at()).unwrap();

        assert_eq!(path, dir.path().join("Resultado_20230110_140509.csv"));
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "ID_MOEDA,DATA_REF,VLR_COTACAO\nUSD,02/01/2023,5.10\nUSD,03/01/2023,5.15\n"
        );
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn test_custom_delimiter_and_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path())
            .with_prefix("Export")
            .with_delimiter(';')
            .unwrap();
        let path = writer.write(&rows()[..1], started_at()).unwrap();

        assert!(path.ends_with("Export_20230110_140509.csv"));
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "ID_MOEDA;DATA_REF;VLR_COTACAO\nUSD;02/01/2023;5.10\n");
    }

    #[test]
    fn test_same_second_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let first = writer.write(&rows(), started_at()).unwrap();
        let second = writer.write(&rows(), started_at()).unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("Resultado_20230110_140509_1.csv"));
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        // a non-empty directory in the way makes the final rename fail
        let blocked = dir.path().join("Resultado_20230110_140509.csv");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("keep"), "x").unwrap();

        assert!(writer.write_at(&rows(), &blocked).is_err());

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Resultado_20230110_140509.csv".to_string()]);
    }

    #[test]
    fn test_rejects_non_ascii_delimiter() {
        assert!(ReportWriter::new("/tmp").with_delimiter('§').is_err());
    }
}
