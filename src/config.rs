//! Process configuration loaded from TOML
//!
//! ```toml
//! calendar_path = "csv/DadosMoeda.csv"
//! quotation_path = "csv/DadosCotacao.csv"
//! output_dir = "csv"
//! interval_secs = 120
//! failure_policy = "abort_batch"
//!
//! [series_codes]
//! USD = 1
//! EUR = 21
//!
//! [fetch]
//! url = "https://localhost:44361/moeda"
//! timeout_secs = 30
//! ```

use crate::code_index::CodeIndex;
use crate::error::{ExportError, Result};
use crate::export::report::DEFAULT_REPORT_PREFIX;
use crate::export::{FailurePolicy, ReportWriter, SchedulerConfig};
use crate::queue::HandoffQueue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Remote fetch endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_calendar_path")]
    pub calendar_path: PathBuf,
    #[serde(default = "default_quotation_path")]
    pub quotation_path: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_report_prefix")]
    pub report_prefix: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_queue_ttl_days")]
    pub queue_ttl_days: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Optional `currency_code;series_code` file, merged under `series_codes`
    #[serde(default)]
    pub code_index_path: Option<PathBuf>,
    #[serde(default)]
    pub series_codes: BTreeMap<String, i32>,
    #[serde(default)]
    pub fetch: Option<FetchConfig>,
}

fn default_calendar_path() -> PathBuf {
    PathBuf::from("csv").join("DadosMoeda.csv")
}

fn default_quotation_path() -> PathBuf {
    PathBuf::from("csv").join("DadosCotacao.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("csv")
}

fn default_interval_secs() -> u64 {
    120
}

fn default_report_prefix() -> String {
    DEFAULT_REPORT_PREFIX.to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_queue_ttl_days() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            calendar_path: default_calendar_path(),
            quotation_path: default_quotation_path(),
            output_dir: default_output_dir(),
            interval_secs: default_interval_secs(),
            report_prefix: default_report_prefix(),
            delimiter: default_delimiter(),
            queue_ttl_days: default_queue_ttl_days(),
            failure_policy: FailurePolicy::default(),
            code_index_path: None,
            series_codes: BTreeMap::new(),
            fetch: None,
        }
    }
}

impl ExportConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| ExportError::ConfigError(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ExportError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(ExportError::ConfigError(
                "interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.queue_ttl_days == 0 {
            return Err(ExportError::ConfigError(
                "queue_ttl_days must be greater than zero".to_string(),
            ));
        }
        if self.queue_ttl_days.checked_mul(SECS_PER_DAY).is_none() {
            return Err(ExportError::ConfigError(format!(
                "queue_ttl_days {} is out of range",
                self.queue_ttl_days
            )));
        }
        for (name, path) in [
            ("calendar_path", &self.calendar_path),
            ("quotation_path", &self.quotation_path),
            ("output_dir", &self.output_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ExportError::ConfigError(format!("{} must not be empty", name)));
            }
        }
        if self.report_prefix.is_empty() {
            return Err(ExportError::ConfigError("report_prefix must not be empty".to_string()));
        }
        if let Some(fetch) = &self.fetch {
            if fetch.url.is_empty() || fetch.timeout_secs == 0 {
                return Err(ExportError::ConfigError(
                    "fetch requires a url and a non-zero timeout_secs".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn queue_ttl(&self) -> Duration {
        Duration::from_secs(self.queue_ttl_days.saturating_mul(SECS_PER_DAY))
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: self.interval(),
            failure_policy: self.failure_policy,
        }
    }

    pub fn handoff_queue(&self) -> HandoffQueue {
        HandoffQueue::with_ttl(self.queue_ttl())
    }

    pub fn report_writer(&self) -> Result<ReportWriter> {
        ReportWriter::new(&self.output_dir)
            .with_prefix(&self.report_prefix)
            .with_delimiter(self.delimiter)
    }

    /// Code index from `code_index_path` (if any) overlaid with `series_codes`
    pub fn code_index(&self) -> Result<CodeIndex> {
        let mut index = match &self.code_index_path {
            Some(path) => CodeIndex::load_from_path(path)?,
            None => CodeIndex::default(),
        };
        index.extend(
            self.series_codes
                .iter()
                .map(|(code, series)| (code.clone(), *series)),
        );
        if index.is_empty() {
            log::warn!("Code index is empty; every request will fail with an unknown currency");
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::from_toml_str("").unwrap();
        assert_eq!(config, ExportConfig::default());
        assert_eq!(config.interval(), Duration::from_secs(120));
        assert_eq!(config.failure_policy, FailurePolicy::AbortBatch);
        assert!(config.fetch.is_none());
    }

    #[test]
    fn test_full_document() {
        let config = ExportConfig::from_toml_str(
            r#"
            calendar_path = "/data/calendar.csv"
            output_dir = "/data/out"
            interval_secs = 30
            delimiter = ";"
            failure_policy = "skip_item"

            [series_codes]
            USD = 1
            EUR = 21

            [fetch]
            url = "http://localhost:8080/moeda"
            "#,
        )
        .unwrap();

        assert_eq!(config.calendar_path, PathBuf::from("/data/calendar.csv"));
        assert_eq!(config.interval_secs, 30);
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.failure_policy, FailurePolicy::SkipItem);
        assert_eq!(config.fetch.as_ref().unwrap().timeout_secs, 30);

        let index = config.code_index().unwrap();
        assert_eq!(index.resolve("EUR").unwrap(), 21);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = ExportConfig::from_toml_str("interval_secs = 0").unwrap_err();
        assert!(matches!(err, ExportError::ConfigError(_)));
    }

    #[test]
    fn test_oversized_queue_ttl_rejected() {
        let err = ExportConfig::from_toml_str(&format!("queue_ttl_days = {}", u64::MAX / 1000))
            .unwrap_err();
        assert!(matches!(err, ExportError::ConfigError(_)));

        let config = ExportConfig {
            queue_ttl_days: u64::MAX,
            ..ExportConfig::default()
        };
        assert_eq!(config.queue_ttl(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(ExportConfig::from_toml_str(r#"failure_policy = "retry""#).is_err());
    }

    #[test]
    fn test_inline_codes_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.csv");
        fs::write(&path, "ID_MOEDA;COD_COTACAO\nUSD;1\nEUR;2\n").unwrap();

        let mut config = ExportConfig::default();
        config.code_index_path = Some(path);
        config.series_codes.insert("EUR".to_string(), 21);

        let index = config.code_index().unwrap();
        assert_eq!(index.resolve("USD").unwrap(), 1);
        assert_eq!(index.resolve("EUR").unwrap(), 21);
    }
}
