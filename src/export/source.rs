//! Where an export cycle gets its batch from
//!
//! - [`QueueSource`]: the in-process [`HandoffQueue`]
//! - [`HttpBatchSource`]: a remote fetch endpoint that dequeues on the
//!   scheduler's behalf (feature `http`)
//!
//! Every source reports "nothing to export" as [`ExportError::EmptyQueue`]
//! and unreachable collaborators as [`ExportError::TransportError`]; the
//! scheduler treats both as an empty cycle.

use crate::error::{ExportError, Result};
use crate::queue::HandoffQueue;
use crate::types::Batch;
use std::future::Future;
use std::sync::Arc;

/// Trait for batch sources polled once per cycle
pub trait BatchSource: Send + Sync {
    /// Retrieve the next batch to export
    fn fetch_batch(&self) -> impl Future<Output = Result<Batch>> + Send;

    /// Get the source name
    fn name(&self) -> &str;
}

/// Reads batches straight from a shared hand-off queue
#[derive(Debug, Clone)]
pub struct QueueSource {
    queue: Arc<HandoffQueue>,
}

impl QueueSource {
    pub fn new(queue: Arc<HandoffQueue>) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Arc<HandoffQueue> {
        &self.queue
    }
}

impl BatchSource for QueueSource {
    fn fetch_batch(&self) -> impl Future<Output = Result<Batch>> + Send {
        let result = self.queue.dequeue_latest();
        async move { result }
    }

    fn name(&self) -> &str {
        "queue"
    }
}

#[cfg(feature = "http")]
pub use http::HttpBatchSource;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use reqwest::{Client, StatusCode};
    use std::time::Duration;

    /// Fetches batches from a remote endpoint returning a JSON request list
    pub struct HttpBatchSource {
        client: Client,
        url: String,
    }

    impl HttpBatchSource {
        /// Create a source for `url` with a per-request timeout
        pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .user_agent(concat!("quote-export/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| {
                    ExportError::TransportError(format!("Failed to create HTTP client: {}", e))
                })?;

            Ok(Self {
                client,
                url: url.into(),
            })
        }

        pub fn url(&self) -> &str {
            &self.url
        }

        async fn fetch(&self) -> Result<Batch> {
            let response = self.client.get(&self.url).send().await.map_err(|e| {
                ExportError::TransportError(format!("GET {} failed: {}", self.url, e))
            })?;

            match response.status() {
                StatusCode::OK => {}
                // the endpoint answers an empty queue with 401 or 204
                StatusCode::UNAUTHORIZED | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                    return Err(ExportError::EmptyQueue);
                }
                status => {
                    return Err(ExportError::TransportError(format!(
                        "GET {} returned {}",
                        self.url, status
                    )));
                }
            }

            let batch: Batch = response.json().await.map_err(|e| {
                ExportError::TransportError(format!("Invalid batch payload from {}: {}", self.url, e))
            })?;
            if batch.is_empty() {
                return Err(ExportError::EmptyQueue);
            }
            Ok(batch)
        }
    }

    impl BatchSource for HttpBatchSource {
        fn fetch_batch(&self) -> impl Future<Output = Result<Batch>> + Send {
            self.fetch()
        }

        fn name(&self) -> &str {
            "http"
        }
    }
}
