//! Error types for quote_export

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for quote_export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Hand-off queue is empty")]
    EmptyQueue,

    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    #[error("No quotation for series {series_code} on {date}")]
    NoQuotation { series_code: i32, date: NaiveDate },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl ExportError {
    /// Errors that end a single cycle without output and leave the scheduler running.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExportError::EmptyQueue | ExportError::TransportError(_))
    }

    /// Per-request lookup failures raised while joining a batch.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            ExportError::UnknownCurrency(_) | ExportError::NoQuotation { .. }
        )
    }
}

/// Result type alias for quote_export operations
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ExportError::EmptyQueue.is_recoverable());
        assert!(ExportError::TransportError("timeout".into()).is_recoverable());
        assert!(!ExportError::UnknownCurrency("XYZ".into()).is_recoverable());

        let missing = ExportError::NoQuotation {
            series_code: 1,
            date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
        };
        assert!(missing.is_lookup_failure());
        assert!(!ExportError::EmptyQueue.is_lookup_failure());
    }

    #[test]
    fn test_messages() {
        let err = ExportError::NoQuotation {
            series_code: 7,
            date: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
        };
        assert_eq!(err.to_string(), "No quotation for series 7 on 2023-01-03");
        assert_eq!(
            ExportError::UnknownCurrency("BRL".into()).to_string(),
            "Unknown currency code: BRL"
        );
    }
}
