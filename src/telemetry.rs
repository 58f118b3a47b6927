//! Telemetry metric name constants.
//!
//! Centralised metric names for bifrost operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `bifrost_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: operation routed (e.g. "analyze_sentiment", "generate")
//! - `backend`: capability that answered, or "none"
//! - `outcome`: "primary", "degraded" or "failed"

/// Total routed invocations.
///
/// Labels: `operation`, `backend`, `outcome`.
pub const REQUESTS_TOTAL: &str = "bifrost_requests_total";

/// Routed invocation duration in seconds, fallback included.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "bifrost_request_duration_seconds";

/// Transitions from the primary to the secondary capability.
///
/// Labels: `operation`, `reason` (error kind).
pub const FALLBACKS_TOTAL: &str = "bifrost_fallbacks_total";

/// Stream records processed successfully.
pub const RECORDS_PROCESSED_TOTAL: &str = "bifrost_records_processed_total";

/// Stream records dropped after a per-record failure.
///
/// Labels: `reason` (error kind).
pub const RECORDS_FAILED_TOTAL: &str = "bifrost_records_failed_total";
