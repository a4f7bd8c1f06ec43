//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Transactions submitted and failed per signing address
//! - Time spent waiting for the per-address nonce lock

use ethers::types::Address;
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "nonce_wallet_transactions_submitted_total",
        "Total transactions accepted by the node",
        &["address"]
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "nonce_wallet_transactions_failed_total",
        "Total sends that failed, by failing step",
        &["address", "kind"]
    ).unwrap();

    pub static ref NONCE_LOCK_WAIT: HistogramVec = register_histogram_vec!(
        "nonce_wallet_nonce_lock_wait_seconds",
        "Time a send waited for its address lock",
        &["address"],
        vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
    ).unwrap();
}

fn label(address: &Address) -> String {
    format!("{:?}", address)
}

/// Record a successful submission
pub fn record_tx_submitted(address: &Address) {
    TX_SUBMITTED.with_label_values(&[&label(address)]).inc();
}

/// Record a failed send
pub fn record_tx_failed(address: &Address, kind: &str) {
    TX_FAILED.with_label_values(&[&label(address), kind]).inc();
}

/// Record time spent waiting for the nonce lock
pub fn record_lock_wait(address: &Address, waited: Duration) {
    NONCE_LOCK_WAIT
        .with_label_values(&[&label(address)])
        .observe(waited.as_secs_f64());
}

/// Render all registered metrics in the Prometheus text format
pub fn encode() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
