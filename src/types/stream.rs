//! Stream batch wire types and per-batch outcome.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Inbound stream batch: `{"Records": [{"kinesis": {"data": "<base64>"}}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamEventRecord>,
}

/// One record as delivered by the stream.
///
/// Fields are optional on the wire so that a single malformed record does not
/// reject the whole batch during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamEventRecord {
    #[serde(default)]
    pub kinesis: Option<StreamPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamPayload {
    #[serde(default)]
    pub data: Option<String>,
}

impl StreamEvent {
    /// Convert the wire records into [`StreamRecord`]s, keeping input order.
    pub fn into_records(self) -> Vec<StreamRecord> {
        self.records
            .into_iter()
            .map(|record| StreamRecord {
                data: record.kinesis.and_then(|k| k.data),
            })
            .collect()
    }
}

/// A single stream record awaiting processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// Base64 payload, `None` when the record carried no data.
    pub data: Option<String>,
}

impl StreamRecord {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    /// Build a record from raw bytes, encoding them the way the stream does.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(STANDARD.encode(bytes))
    }

    /// Decode the payload into text.
    ///
    /// Invalid UTF-8 sequences are dropped rather than rejected; only a
    /// missing payload or broken base64 fails.
    pub fn decode(&self) -> Result<String> {
        let data = self
            .data
            .as_deref()
            .ok_or_else(|| crate::BifrostError::Decode("record has no data".to_string()))?;
        let bytes = STANDARD.decode(data)?;
        Ok(utf8_dropping_invalid(&bytes))
    }
}

/// Decode UTF-8, skipping invalid byte sequences.
pub fn utf8_dropping_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Reference to a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    pub key: String,
}

/// Accumulated result of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    #[serde(rename = "processed")]
    pub processed_count: usize,
    /// Keys of successfully processed records, in processing order.
    pub outputs: Vec<OutputRef>,
}

/// Acknowledgement returned to the stream trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub processed: usize,
}

impl From<&BatchOutcome> for BatchResponse {
    fn from(outcome: &BatchOutcome) -> Self {
        Self {
            status_code: 200,
            processed: outcome.processed_count,
        }
    }
}
