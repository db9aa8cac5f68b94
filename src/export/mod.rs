//! Periodic join-and-export routine
//!
//! # Components
//!
//! - **join**: per-request lookup of calendar days and quotations
//! - **report**: dated report file emission
//! - **source**: batch retrieval (local queue or remote fetch endpoint)
//! - **scheduler**: fixed-interval cycle driver

pub mod join;
pub mod report;
pub mod scheduler;
pub mod source;

pub use join::{join_batch, join_request, FailurePolicy, JoinOutcome, RequestFailure};
pub use report::ReportWriter;
pub use scheduler::{
    CycleOutcome, CycleReport, ExportScheduler, SchedulerConfig, SchedulerHandle, SchedulerStats,
    StatsSnapshot,
};
#[cfg(feature = "http")]
pub use source::HttpBatchSource;
pub use source::{BatchSource, QueueSource};
