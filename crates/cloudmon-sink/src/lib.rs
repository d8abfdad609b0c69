//! Time-series sink for collected samples.
//!
//! Collectors hand one batch of [`SampleRecord`]s per invocation to a
//! [`SinkClient`]. Endpoint selection, chunking and compression are the
//! sink's business; callers never retry a failed batch.

pub mod error;
pub mod influxdb;

use async_trait::async_trait;
use cloudmon_common::types::SampleRecord;

/// Batched writer for [`SampleRecord`]s.
#[async_trait]
pub trait SinkClient: Send + Sync {
    /// Write `records` into `database`, using any of `urls`.
    ///
    /// # Errors
    ///
    /// Returns [`error::SinkError::NoEndpoint`] when `urls` is empty, or the
    /// last endpoint failure when no endpoint accepted a chunk.
    async fn send_batch(
        &self,
        urls: &[String],
        database: &str,
        records: &[SampleRecord],
        gzip: bool,
    ) -> error::Result<()>;
}
