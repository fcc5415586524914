//! # DA Consensus Metrics
//!
//! Prometheus metrics for monitoring block production and verification.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! da-02-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `da_blocks_produced_total` - Counter of blocks produced by this sequencer
//! - `da_blocks_rejected_total` - Counter of rejected blocks (by reason)
//! - `da_blocks_imported_total` - Counter of DA blocks imported
//! - `da_production_failures_total` - Counter of failed production intervals
//! - `da_suspected_fraud_total` - Counter of blocks from unstaked producers seen by a WatchTower

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_counter_vec, register_int_counter, CounterVec, IntCounter};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total blocks produced
    pub static ref BLOCKS_PRODUCED: IntCounter = register_int_counter!(
        "da_blocks_produced_total",
        "Total number of blocks produced by this sequencer"
    )
    .expect("Failed to create BLOCKS_PRODUCED metric");

    /// Total blocks rejected, labeled by rejection reason
    pub static ref BLOCKS_REJECTED: CounterVec = register_counter_vec!(
        "da_blocks_rejected_total",
        "Total number of blocks rejected",
        &["reason"]
    )
    .expect("Failed to create BLOCKS_REJECTED metric");

    /// Total DA blocks imported
    pub static ref BLOCKS_IMPORTED: IntCounter = register_int_counter!(
        "da_blocks_imported_total",
        "Total number of DA blocks verified and imported"
    )
    .expect("Failed to create BLOCKS_IMPORTED metric");

    /// Total failed production intervals
    pub static ref PRODUCTION_FAILURES: IntCounter = register_int_counter!(
        "da_production_failures_total",
        "Total number of production intervals that failed"
    )
    .expect("Failed to create PRODUCTION_FAILURES metric");

    /// Total suspected fraudulent blocks
    pub static ref SUSPECTED_FRAUD: IntCounter = register_int_counter!(
        "da_suspected_fraud_total",
        "Total number of blocks written by unstaked producers"
    )
    .expect("Failed to create SUSPECTED_FRAUD metric");
}

/// Record a produced block
#[cfg(feature = "metrics")]
pub fn record_block_produced() {
    BLOCKS_PRODUCED.inc();
}

/// Record a rejected block with reason
#[cfg(feature = "metrics")]
pub fn record_block_rejected(reason: &str) {
    BLOCKS_REJECTED.with_label_values(&[reason]).inc();
}

/// Record an imported block
#[cfg(feature = "metrics")]
pub fn record_block_imported() {
    BLOCKS_IMPORTED.inc();
}

/// Record a failed production interval
#[cfg(feature = "metrics")]
pub fn record_production_failure() {
    PRODUCTION_FAILURES.inc();
}

/// Record a suspected fraudulent block
#[cfg(feature = "metrics")]
pub fn record_suspected_fraud() {
    SUSPECTED_FRAUD.inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_block_produced() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_imported() {}

#[cfg(not(feature = "metrics"))]
pub fn record_production_failure() {}

#[cfg(not(feature = "metrics"))]
pub fn record_suspected_fraud() {}
