//! # Prometheus Metrics
//!
//! Operational metrics for the ledger service, scraped at `/metrics` on the
//! metrics port. Everything lives in a dedicated [`prometheus::Registry`]
//! prefixed `qreceipt_`, never the global default registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

use qreceipt_protocol::ledger::LedgerStatus;

/// Metric handles for the node. Each handle is internally reference
/// counted, so clones record into the same series.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    pub blocks_sealed_total: IntCounter,
    pub transactions_accepted_total: IntCounter,
    pub transactions_rejected_total: IntCounter,
    pub receipts_issued_total: IntCounter,
    pub receipts_verified_total: IntCounter,
    pub receipts_rejected_total: IntCounter,
    pub pending_transactions: IntGauge,
    pub chain_height: IntGauge,
    pub seal_latency_seconds: Histogram,
}

fn register<C>(registry: &Registry, collector: C) -> prometheus::Result<C>
where
    C: Collector + Clone + 'static,
{
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl NodeMetrics {
    /// Create and register every metric. Call once at startup.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("qreceipt".into()), None)?;

        let blocks_sealed_total = register(
            &registry,
            IntCounter::new("blocks_sealed_total", "Blocks sealed by this node")?,
        )?;
        let transactions_accepted_total = register(
            &registry,
            IntCounter::new(
                "transactions_accepted_total",
                "Submissions that passed validation and entered the pending pool",
            )?,
        )?;
        let transactions_rejected_total = register(
            &registry,
            IntCounter::new(
                "transactions_rejected_total",
                "Submissions rejected by validation",
            )?,
        )?;
        let receipts_issued_total = register(
            &registry,
            IntCounter::new("receipts_issued_total", "Receipts served")?,
        )?;
        let receipts_verified_total = register(
            &registry,
            IntCounter::new(
                "receipts_verified_total",
                "Receipts checked through the verify endpoint and found valid",
            )?,
        )?;
        let receipts_rejected_total = register(
            &registry,
            IntCounter::new(
                "receipts_rejected_total",
                "Receipts checked through the verify endpoint and found invalid",
            )?,
        )?;
        let pending_transactions = register(
            &registry,
            IntGauge::new("pending_transactions", "Transactions waiting to be sealed")?,
        )?;
        let chain_height = register(
            &registry,
            IntGauge::new("chain_height", "Number of sealed blocks")?,
        )?;
        let seal_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "seal_latency_seconds",
                    "Wall time of a seal: Merkle build, header signature and commit",
                )
                .buckets(vec![
                    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
                ]),
            )?,
        )?;

        Ok(Self {
            registry,
            blocks_sealed_total,
            transactions_accepted_total,
            transactions_rejected_total,
            receipts_issued_total,
            receipts_verified_total,
            receipts_rejected_total,
            pending_transactions,
            chain_height,
            seal_latency_seconds,
        })
    }

    /// Refresh the gauges from a ledger snapshot.
    pub fn observe_status(&self, status: &LedgerStatus) {
        self.pending_transactions.set(status.pending as i64);
        self.chain_height.set(status.height as i64);
    }

    /// Encode all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics` on the metrics port.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_encodes_prefixed_series() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.blocks_sealed_total.inc();
        metrics.seal_latency_seconds.observe(0.002);
        metrics.pending_transactions.set(2);

        let text = metrics.encode().unwrap();
        assert!(text.contains("qreceipt_blocks_sealed_total 1"));
        assert!(text.contains("qreceipt_pending_transactions 2"));
        assert!(text.contains("qreceipt_seal_latency_seconds_count 1"));
    }

    #[test]
    fn instances_are_independent() {
        let a = NodeMetrics::new().unwrap();
        let b = NodeMetrics::new().unwrap();
        a.transactions_accepted_total.inc();
        assert_eq!(b.transactions_accepted_total.get(), 0);
    }
}
