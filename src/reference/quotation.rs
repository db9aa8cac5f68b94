//! Quotation history source: `value;series_code;DD/MM/YYYY`, one header line.
//! Values use a comma as the decimal separator (`5,10`).

use crate::error::{ExportError, Result};
use crate::types::{QuotationEntry, SeriesCode};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;

pub const QUOTATION_DATE_FORMAT: &str = "%d/%m/%Y";

/// Parse every quotation row from a reader
pub fn read_quotations<R: Read>(reader: R) -> Result<Vec<QuotationEntry>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let line = line + 2;
        if record.len() < 3 {
            return Err(ExportError::ParseError(format!(
                "Quotation line {}: expected 3 columns, got {}",
                line,
                record.len()
            )));
        }

        let value = parse_value(&record[0]).ok_or_else(|| {
            ExportError::ParseError(format!(
                "Quotation line {}: invalid value '{}'",
                line, &record[0]
            ))
        })?;
        let series_code: SeriesCode = record[1].parse().map_err(|e| {
            ExportError::ParseError(format!(
                "Quotation line {}: invalid series code '{}': {}",
                line, &record[1], e
            ))
        })?;
        let date = NaiveDate::parse_from_str(&record[2], QUOTATION_DATE_FORMAT).map_err(|e| {
            ExportError::ParseError(format!(
                "Quotation line {}: invalid date '{}': {}",
                line, &record[2], e
            ))
        })?;

        entries.push(QuotationEntry {
            series_code,
            date,
            value,
        });
    }

    Ok(entries)
}

/// `5,10` -> 5.10
fn parse_value(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', ".")).ok()
}
