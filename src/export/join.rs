//! Join of a request batch against the reference tables

use crate::code_index::CodeIndex;
use crate::error::{ExportError, Result};
use crate::reference::ReferenceStore;
use crate::types::{ExportRequest, ReportRow};
use serde::{Deserialize, Serialize};

/// What a lookup failure does to the rest of the batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed lookup; rows reached before it are kept and
    /// later requests are not processed
    #[default]
    AbortBatch,
    /// Drop only the failing request and continue with the next one
    SkipItem,
}

/// A request whose join stopped at a failed lookup
#[derive(Debug)]
pub struct RequestFailure {
    /// Position of the request within its batch
    pub position: usize,
    pub currency_code: String,
    pub error: ExportError,
}

/// Rows and failures of one batch join
#[derive(Debug, Default)]
pub struct JoinOutcome {
    pub rows: Vec<ReportRow>,
    pub failures: Vec<RequestFailure>,
    /// Requests left unprocessed after an abort
    pub skipped: usize,
}

impl JoinOutcome {
    pub fn aborted(&self) -> bool {
        self.skipped > 0
    }
}

/// Join every request of a batch, in batch order
pub fn join_batch(
    batch: &[ExportRequest],
    store: &ReferenceStore,
    index: &CodeIndex,
    policy: FailurePolicy,
) -> JoinOutcome {
    let mut outcome = JoinOutcome::default();

    for (position, request) in batch.iter().enumerate() {
        let result = match policy {
            // rows reached before a failure are kept
            FailurePolicy::AbortBatch => emit_rows(request, store, index, &mut outcome.rows),
            FailurePolicy::SkipItem => {
                join_request(request, store, index).map(|rows| outcome.rows.extend(rows))
            }
        };

        if let Err(error) = result {
            log::warn!(
                "Request {} ({} {}..={}) failed: {}",
                position,
                request.currency_code,
                request.range_start,
                request.range_end,
                error
            );
            outcome.failures.push(RequestFailure {
                position,
                currency_code: request.currency_code.clone(),
                error,
            });
            if policy == FailurePolicy::AbortBatch {
                outcome.skipped = batch.len() - position - 1;
                break;
            }
        }
    }

    outcome
}

/// Rows for a single request. A request contributes either all of its rows
/// or none of them.
pub fn join_request(
    request: &ExportRequest,
    store: &ReferenceStore,
    index: &CodeIndex,
) -> Result<Vec<ReportRow>> {
    let mut rows = Vec::new();
    emit_rows(request, store, index, &mut rows)?;
    Ok(rows)
}

/// Push one row per calendar entry in range, stopping at the first lookup
/// failure. Rows pushed before the failure stay in `rows`.
fn emit_rows(
    request: &ExportRequest,
    store: &ReferenceStore,
    index: &CodeIndex,
    rows: &mut Vec<ReportRow>,
) -> Result<()> {
    let series_code = index.resolve(&request.currency_code)?;

    for entry in store.calendar_entries_in_range(
        &request.currency_code,
        request.range_start,
        request.range_end,
    ) {
        let quotation = store.quotation_on(series_code, entry.date)?;
        rows.push(ReportRow {
            currency_code: entry.currency_code.clone(),
            date: entry.date,
            value: quotation.value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CalendarEntry, QuotationEntry};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn fixtures() -> (ReferenceStore, CodeIndex) {
        let calendar = vec![
            CalendarEntry { currency_code: "USD".into(), date: date(2) },
            CalendarEntry { currency_code: "USD".into(), date: date(3) },
            CalendarEntry { currency_code: "EUR".into(), date: date(2) },
            CalendarEntry { currency_code: "EUR".into(), date: date(3) },
        ];
        let quotations = vec![
            QuotationEntry { series_code: 1, date: date(2), value: dec!(5.10) },
            QuotationEntry { series_code: 1, date: date(3), value: dec!(5.15) },
            QuotationEntry { series_code: 21, date: date(2), value: dec!(5.60) },
        ];
        (
            ReferenceStore::from_entries(calendar, quotations),
            CodeIndex::from_pairs([("USD", 1), ("EUR", 21)]),
        )
    }

    #[test]
    fn test_join_single_request() {
        let (store, index) = fixtures();
        let rows = join_request(&ExportRequest::new("USD", date(2), date(3)), &store, &index).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, dec!(5.10));
        assert_eq!(rows[1].date, date(3));
    }

    #[test]
    fn test_missing_quotation_drops_whole_request() {
        let (store, index) = fixtures();
        let err = join_request(&ExportRequest::new("EUR", date(2), date(3)), &store, &index).unwrap_err();
        assert!(matches!(err, ExportError::NoQuotation { series_code: 21, .. }));
    }

    #[test]
    fn test_abort_batch_stops_at_first_failure() {
        let (store, index) = fixtures();
        let batch = vec![
            ExportRequest::new("USD", date(2), date(2)),
            ExportRequest::new("XYZ", date(2), date(3)),
            ExportRequest::new("USD", date(3), date(3)),
        ];
        let outcome = join_batch(&batch, &store, &index, FailurePolicy::AbortBatch);

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].position, 1);
        assert!(matches!(outcome.failures[0].error, ExportError::UnknownCurrency(_)));
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.aborted());
    }

    #[test]
    fn test_abort_batch_keeps_rows_reached_before_failure() {
        let (store, index) = fixtures();
        // EUR resolves on the 2nd but has no quotation on the 3rd
        let batch = vec![
            ExportRequest::new("USD", date(2), date(2)),
            ExportRequest::new("EUR", date(2), date(3)),
        ];
        let outcome = join_batch(&batch, &store, &index, FailurePolicy::AbortBatch);

        let keys: Vec<(&str, NaiveDate)> = outcome
            .rows
            .iter()
            .map(|r| (r.currency_code.as_str(), r.date))
            .collect();
        assert_eq!(keys, vec![("USD", date(2)), ("EUR", date(2))]);
        assert_eq!(outcome.failures[0].position, 1);
        assert!(matches!(
            outcome.failures[0].error,
            ExportError::NoQuotation { series_code: 21, date: d } if d == date(3)
        ));
    }

    #[test]
    fn test_skip_item_drops_partial_request() {
        let (store, index) = fixtures();
        let batch = vec![
            ExportRequest::new("EUR", date(2), date(3)),
            ExportRequest::new("USD", date(3), date(3)),
        ];
        let outcome = join_batch(&batch, &store, &index, FailurePolicy::SkipItem);

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].currency_code, "USD");
        assert_eq!(outcome.failures.len(), 1);
    }

    #[test]
    fn test_skip_item_continues() {
        let (store, index) = fixtures();
        let batch = vec![
            ExportRequest::new("XYZ", date(2), date(3)),
            ExportRequest::new("USD", date(2), date(3)),
        ];
        let outcome = join_batch(&batch, &store, &index, FailurePolicy::SkipItem);

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert!(!outcome.aborted());
    }

    #[test]
    fn test_failure_on_last_request_is_not_an_abort() {
        let (store, index) = fixtures();
        let batch = vec![ExportRequest::new("XYZ", date(2), date(3))];
        let outcome = join_batch(&batch, &store, &index, FailurePolicy::AbortBatch);

        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.skipped, 0);
    }
}
