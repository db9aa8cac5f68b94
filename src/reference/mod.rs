//! Reference data held in memory for the process lifetime
//!
//! Two tables are loaded once at startup:
//!
//! - **calendar**: the business days on which each currency is quoted
//! - **quotation**: the value of each quotation series per date
//!
//! After loading, the store is immutable and can be shared behind an `Arc`
//! without further locking.

pub mod calendar;
pub mod quotation;

pub use calendar::read_calendar;
pub use quotation::read_quotations;

use crate::error::{ExportError, Result};
use crate::types::{CalendarEntry, QuotationEntry, SeriesCode};
use chrono::NaiveDate;
use hashbrown::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Row counts and date coverage of a loaded store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceStats {
    pub calendar_rows: usize,
    pub currencies: usize,
    pub quotation_rows: usize,
    pub series: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Read-only calendar and quotation tables
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    /// Currency code -> calendar entries sorted by date
    calendar: HashMap<String, Vec<CalendarEntry>>,
    /// (series, date) -> first loaded quotation
    quotations: HashMap<(SeriesCode, NaiveDate), QuotationEntry>,
    calendar_rows: usize,
    quotation_rows: usize,
}

impl ReferenceStore {
    /// Load both tables from disk, parsing them in parallel. Blocks until both
    /// are complete; any failure is fatal for the caller.
    pub fn load(calendar_path: &Path, quotation_path: &Path) -> Result<Self> {
        let (calendar, quotations) = rayon::join(
            || open(calendar_path).and_then(read_calendar),
            || open(quotation_path).and_then(read_quotations),
        );
        let store = Self::from_entries(calendar?, quotations?);

        let stats = store.stats();
        log::info!(
            "Loaded reference data: {} calendar rows for {} currencies, {} quotations for {} series",
            stats.calendar_rows,
            stats.currencies,
            stats.quotation_rows,
            stats.series
        );
        Ok(store)
    }

    /// Load both tables from in-memory or streamed sources
    pub fn load_from_readers<C, Q>(calendar: C, quotations: Q) -> Result<Self>
    where
        C: Read + Send,
        Q: Read + Send,
    {
        let (calendar, quotations) =
            rayon::join(|| read_calendar(calendar), || read_quotations(quotations));
        Ok(Self::from_entries(calendar?, quotations?))
    }

    /// Build the store from already-parsed rows
    pub fn from_entries(calendar: Vec<CalendarEntry>, quotations: Vec<QuotationEntry>) -> Self {
        let calendar_rows = calendar.len();
        let quotation_rows = quotations.len();

        let mut by_currency: HashMap<String, Vec<CalendarEntry>> = HashMap::new();
        for entry in calendar {
            by_currency
                .entry(entry.currency_code.clone())
                .or_default()
                .push(entry);
        }
        // stable: same-day duplicates keep file order
        for entries in by_currency.values_mut() {
            entries.sort_by_key(|e| e.date);
        }

        let mut by_series = HashMap::with_capacity(quotation_rows);
        for entry in quotations {
            by_series
                .entry((entry.series_code, entry.date))
                .or_insert(entry);
        }

        Self {
            calendar: by_currency,
            quotations: by_series,
            calendar_rows,
            quotation_rows,
        }
    }

    /// Calendar entries of `currency_code` with `start <= date <= end`, in date order
    pub fn calendar_entries_in_range(
        &self,
        currency_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> &[CalendarEntry] {
        let Some(entries) = self.calendar.get(currency_code) else {
            return &[];
        };
        if start > end {
            return &[];
        }
        let lo = entries.partition_point(|e| e.date < start);
        let hi = entries.partition_point(|e| e.date <= end);
        &entries[lo..hi]
    }

    /// The quotation of `series_code` on `date`
    pub fn quotation_on(&self, series_code: SeriesCode, date: NaiveDate) -> Result<&QuotationEntry> {
        self.quotations
            .get(&(series_code, date))
            .ok_or(ExportError::NoQuotation { series_code, date })
    }

    pub fn stats(&self) -> ReferenceStats {
        let dates = self.calendar.values().flatten().map(|e| e.date);
        let series: hashbrown::HashSet<SeriesCode> =
            self.quotations.keys().map(|(series, _)| *series).collect();

        ReferenceStats {
            calendar_rows: self.calendar_rows,
            currencies: self.calendar.len(),
            quotation_rows: self.quotation_rows,
            series: series.len(),
            first_date: dates.clone().min(),
            last_date: dates.max(),
        }
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        ExportError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to open reference source {}: {}", path.display(), e),
        ))
    })
}
