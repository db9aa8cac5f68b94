use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quote_export::{
    code_index::CodeIndex,
    export::{join_batch, FailurePolicy},
    queue::HandoffQueue,
    reference::ReferenceStore,
    types::{CalendarEntry, ExportRequest, QuotationEntry},
};
use rust_decimal::Decimal;

const CURRENCIES: [&str; 8] = ["USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD"];

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// Roughly four years of daily quotations for each currency
fn reference_fixture(days: i64) -> (ReferenceStore, CodeIndex) {
    let mut calendar = Vec::new();
    let mut quotations = Vec::new();

    for (series, code) in CURRENCIES.iter().enumerate() {
        for day in 0..days {
            let date = base_date() + Duration::days(day);
            calendar.push(CalendarEntry {
                currency_code: code.to_string(),
                date,
            });
            quotations.push(QuotationEntry {
                series_code: series as i32 + 1,
                date,
                value: Decimal::new(5_000 + day, 3),
            });
        }
    }

    let index = CodeIndex::from_pairs(
        CURRENCIES
            .iter()
            .enumerate()
            .map(|(series, code)| (*code, series as i32 + 1)),
    );
    (ReferenceStore::from_entries(calendar, quotations), index)
}

fn benchmark_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("handoff_queue");

    for outstanding in [10usize, 100, 500] {
        group.bench_with_input(
            BenchmarkId::new("fill_and_drain", outstanding),
            &outstanding,
            |b, &outstanding| {
                b.iter(|| {
                    let queue = HandoffQueue::new();
                    for _ in 0..outstanding {
                        queue.enqueue(vec![ExportRequest::new(
                            "USD",
                            base_date(),
                            base_date() + Duration::days(30),
                        )]);
                    }
                    while let Ok(batch) = queue.dequeue_latest() {
                        black_box(batch);
                    }
                });
            },
        );
    }

    group.finish();
}

fn benchmark_join(c: &mut Criterion) {
    let (store, index) = reference_fixture(1_460);
    let batch: Vec<ExportRequest> = CURRENCIES
        .iter()
        .map(|code| ExportRequest::new(*code, base_date(), base_date() + Duration::days(365)))
        .collect();

    c.bench_function("join_batch_8_currencies_1y", |b| {
        b.iter(|| {
            let outcome = join_batch(
                black_box(&batch),
                black_box(&store),
                black_box(&index),
                FailurePolicy::AbortBatch,
            );
            black_box(outcome.rows.len())
        });
    });
}

fn benchmark_reference_build(c: &mut Criterion) {
    c.bench_function("reference_store_build_4y", |b| {
        b.iter(|| black_box(reference_fixture(1_460)));
    });
}

criterion_group!(
    benches,
    benchmark_queue,
    benchmark_join,
    benchmark_reference_build
);
criterion_main!(benches);
