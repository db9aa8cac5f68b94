//! Currency code to quotation series mapping

use crate::error::{ExportError, Result};
use crate::types::SeriesCode;
use csv::ReaderBuilder;
use hashbrown::HashMap;
use std::io::Read;
use std::path::Path;

/// Read-only mapping from currency code to the series code used by the
/// quotation table
#[derive(Debug, Clone, Default)]
pub struct CodeIndex {
    series: HashMap<String, SeriesCode>,
}

impl CodeIndex {
    /// Build from `(currency_code, series_code)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, SeriesCode)>,
        S: Into<String>,
    {
        Self {
            series: pairs
                .into_iter()
                .map(|(code, series)| (code.into(), series))
                .collect(),
        }
    }

    /// Load a `;`-delimited `currency_code;series_code` file with a header line
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            ExportError::ConfigError(format!("Failed to open code index {}: {}", path.display(), e))
        })?;
        Self::load_from_reader(file)
    }

    /// Load the same format from any reader
    pub fn load_from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut series = HashMap::new();
        for (line, result) in reader.records().enumerate() {
            let record = result?;
            let (Some(code), Some(raw_series)) = (record.get(0), record.get(1)) else {
                return Err(ExportError::ParseError(format!(
                    "Code index line {}: expected 2 columns, got {}",
                    line + 2,
                    record.len()
                )));
            };
            let series_code: SeriesCode = raw_series.parse().map_err(|e| {
                ExportError::ParseError(format!(
                    "Code index line {}: invalid series code '{}': {}",
                    line + 2,
                    raw_series,
                    e
                ))
            })?;
            series.entry(code.to_string()).or_insert(series_code);
        }

        Ok(Self { series })
    }

    /// Add or replace mappings
    pub fn extend<I, S>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (S, SeriesCode)>,
        S: Into<String>,
    {
        self.series
            .extend(pairs.into_iter().map(|(code, series)| (code.into(), series)));
    }

    /// Resolve the series code for a currency
    pub fn resolve(&self, currency_code: &str) -> Result<SeriesCode> {
        self.series
            .get(currency_code)
            .copied()
            .ok_or_else(|| ExportError::UnknownCurrency(currency_code.to_string()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
