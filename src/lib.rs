//! # quote_export
//!
//! Periodic export of currency quotations.
//!
//! Producers hand batches of [`ExportRequest`](types::ExportRequest)s to a
//! [`HandoffQueue`](queue::HandoffQueue). A background
//! [`ExportScheduler`](export::ExportScheduler) wakes on a fixed interval,
//! takes the next batch, joins it against the in-memory currency calendar
//! and quotation tables, and writes the joined rows to a dated CSV report.
//!
//! ## Example
//!
//! ```rust,no_run
//! use quote_export::prelude::*;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> quote_export::error::Result<()> {
//! let store = ReferenceStore::load(
//!     Path::new("csv/DadosMoeda.csv"),
//!     Path::new("csv/DadosCotacao.csv"),
//! )?;
//! let queue = Arc::new(HandoffQueue::new());
//! let scheduler = ExportScheduler::new(
//!     QueueSource::new(Arc::clone(&queue)),
//!     Arc::new(store),
//!     Arc::new(CodeIndex::from_pairs([("USD", 1)])),
//!     ReportWriter::new("csv"),
//!     SchedulerConfig::default(),
//! );
//! let handle = scheduler.spawn();
//! // producers call queue.enqueue(batch) ...
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod code_index;
pub mod config;
pub mod error;
pub mod export;
pub mod queue;
pub mod reference;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::code_index::CodeIndex;
    pub use crate::config::ExportConfig;
    pub use crate::error::{ExportError, Result};
    pub use crate::export::{
        BatchSource, CycleOutcome, CycleReport, ExportScheduler, FailurePolicy, QueueSource,
        ReportWriter, SchedulerConfig, SchedulerHandle,
    };
    pub use crate::queue::HandoffQueue;
    pub use crate::reference::ReferenceStore;
    pub use crate::types::*;
}
