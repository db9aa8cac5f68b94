//! Core types shared by the queue, reference store and export cycle

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO-style currency code as it appears in requests and in the calendar table
pub type CurrencyCode = String;

/// Identifier of a quotation series in the quotation table
pub type SeriesCode = i32;

/// Ordered group of requests handed off together and processed in one cycle
pub type Batch = Vec<ExportRequest>;

/// A request to export one currency's quotations over an inclusive date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(rename = "moeda", alias = "Moeda", alias = "currency_code")]
    pub currency_code: CurrencyCode,
    #[serde(
        rename = "data_inicio",
        alias = "Data_inicio",
        alias = "range_start",
        with = "wire_date"
    )]
    pub range_start: NaiveDate,
    #[serde(
        rename = "data_fim",
        alias = "Data_fim",
        alias = "range_end",
        with = "wire_date"
    )]
    pub range_end: NaiveDate,
}

impl ExportRequest {
    /// Create a new request
    pub fn new(currency_code: impl Into<String>, range_start: NaiveDate, range_end: NaiveDate) -> Self {
        Self {
            currency_code: currency_code.into(),
            range_start,
            range_end,
        }
    }

    /// Check whether a date falls within the request range (inclusive)
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.range_start <= date && date <= self.range_end
    }
}

/// One business day on which a currency is quoted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub currency_code: CurrencyCode,
    pub date: NaiveDate,
}

/// Quotation value of a series on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationEntry {
    pub series_code: SeriesCode,
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Joined output record destined for the report file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub currency_code: CurrencyCode,
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Request dates travel either as `YYYY-MM-DD` or with a time component
/// (`YYYY-MM-DDTHH:MM:SS`); the time of day is dropped.
mod wire_date {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const DATE_FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            return Ok(date);
        }
        if let Ok(dt) = raw.parse::<NaiveDateTime>() {
            return Ok(dt.date());
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.date_naive());
        }
        Err(de::Error::custom(format!("invalid request date: {}", raw)))
    }
}
