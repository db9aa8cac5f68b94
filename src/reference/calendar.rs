//! Currency calendar source: `currency_code;YYYY-MM-DD`, one header line

use crate::error::{ExportError, Result};
use crate::types::CalendarEntry;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::io::Read;

pub const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse every calendar row from a reader
pub fn read_calendar<R: Read>(reader: R) -> Result<Vec<CalendarEntry>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        // header is line 1
        let line = line + 2;
        let (Some(code), Some(raw_date)) = (record.get(0), record.get(1)) else {
            return Err(ExportError::ParseError(format!(
                "Calendar line {}: expected 2 columns, got {}",
                line,
                record.len()
            )));
        };
        let date = NaiveDate::parse_from_str(raw_date, CALENDAR_DATE_FORMAT).map_err(|e| {
            ExportError::ParseError(format!(
                "Calendar line {}: invalid date '{}': {}",
                line, raw_date, e
            ))
        })?;
        entries.push(CalendarEntry {
            currency_code: code.to_string(),
            date,
        });
    }

    Ok(entries)
}
