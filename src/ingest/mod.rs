//! Stream ingestion with per-record failure isolation.
//!
//! Records are processed sequentially in input order. A record that cannot be
//! decoded or persisted is logged and skipped; it never stops the batch, and
//! the batch is always acknowledged as successful.
//!
//! # Key scheme
//!
//! Each processed record is stored as `processed/<epoch-millis>-<count>.json`,
//! where `count` is the 1-based number of records processed successfully so
//! far in this batch. Keys are not globally unique: two concurrent batches that
//! read the same millisecond produce the same key for their n-th record.

pub mod store;

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::Result;
use crate::telemetry;
use crate::types::{BatchOutcome, BatchResponse, OutputRef, StreamEvent, StreamRecord};

pub use store::{FsObjectStore, MemoryObjectStore, ObjectStore, S3Config, S3ObjectStore};

/// Prefix of every persisted record key.
pub const KEY_PREFIX: &str = "processed/";

/// Storage key for the `count`-th processed record at `epoch_millis`.
pub fn record_key(epoch_millis: i64, count: usize) -> String {
    format!("{KEY_PREFIX}{epoch_millis}-{count}.json")
}

/// Clock used for record keys, in epoch milliseconds.
pub type MillisClock = fn() -> i64;

fn system_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Processes stream batches and persists each record.
#[derive(Clone)]
pub struct Ingestor {
    store: Option<Arc<dyn ObjectStore>>,
    clock: MillisClock,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Ingestor {
    /// Create an ingestor. With no store, records are counted but not written.
    pub fn new(store: Option<Arc<dyn ObjectStore>>) -> Self {
        Self {
            store,
            clock: system_millis,
        }
    }

    /// Replace the key clock.
    pub fn with_clock(mut self, clock: MillisClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn has_destination(&self) -> bool {
        self.store.is_some()
    }

    /// Handle a raw stream event and acknowledge it.
    pub async fn handle_event(&self, event: StreamEvent) -> BatchResponse {
        let outcome = self.process_batch(&event.into_records()).await;
        BatchResponse::from(&outcome)
    }

    /// Process every record in order, isolating failures.
    #[instrument(skip(self, records), fields(batch_size = records.len()))]
    pub async fn process_batch(&self, records: &[StreamRecord]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (index, record) in records.iter().enumerate() {
            let count = outcome.processed_count + 1;
            match self.process_record(record, count).await {
                Ok(key) => {
                    outcome.processed_count = count;
                    outcome.outputs.push(OutputRef { key });
                    metrics::counter!(telemetry::RECORDS_PROCESSED_TOTAL).increment(1);
                }
                Err(e) => {
                    warn!(index, error = %e, "error processing record");
                    metrics::counter!(telemetry::RECORDS_FAILED_TOTAL, "reason" => e.kind())
                        .increment(1);
                }
            }
        }

        info!(
            processed = outcome.processed_count,
            outputs = %serde_json::to_string(&outcome.outputs).unwrap_or_default(),
            "batch processed"
        );
        outcome
    }

    async fn process_record(&self, record: &StreamRecord, count: usize) -> Result<String> {
        let raw = record.decode()?;
        let key = record_key((self.clock)(), count);
        if let Some(store) = &self.store {
            let body = serde_json::to_vec(&json!({ "raw": raw }))?;
            store.put(&key, body).await?;
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> i64 {
        1_700_000_000_000
    }

    #[test]
    fn key_format() {
        assert_eq!(record_key(1234, 2), "processed/1234-2.json");
    }

    #[tokio::test]
    async fn counts_without_destination() {
        let ingestor = Ingestor::default().with_clock(fixed_clock);
        assert!(!ingestor.has_destination());
        let outcome = ingestor
            .process_batch(&[StreamRecord::from_bytes(b"a"), StreamRecord::from_bytes(b"b")])
            .await;
        assert_eq!(outcome.processed_count, 2);
        assert_eq!(outcome.outputs[1].key, "processed/1700000000000-2.json");
    }

    #[tokio::test]
    async fn empty_batch() {
        let outcome = Ingestor::default().process_batch(&[]).await;
        assert_eq!(outcome, BatchOutcome::default());
    }
}
