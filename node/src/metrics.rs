//! # Prometheus Metrics
//!
//! Exposes vault activity to Prometheus at the `/metrics` HTTP endpoint on
//! the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use pacific_contracts::{Amount, SimulatedAdapter, Vault};
use prometheus::{
    Counter, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntGauge, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Deposits that committed.
    pub deposits_total: IntCounter,
    /// Withdrawals that committed.
    pub withdrawals_total: IntCounter,
    /// Operations the vault rejected, for any reason.
    pub rejected_operations_total: IntCounter,
    /// Gross base units deposited, across all users.
    pub deposited_amount_total: Counter,
    /// Accrued, un-swept fees in base units.
    pub total_fees: Gauge,
    /// Destinations currently receiving capital.
    pub active_destinations: IntGauge,
    /// Time spent holding the vault lock per mutating operation.
    pub operation_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("pacific".into()), None)?;

        let deposits_total =
            IntCounter::new("deposits_total", "Total number of committed deposits")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let withdrawals_total =
            IntCounter::new("withdrawals_total", "Total number of committed withdrawals")?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let rejected_operations_total = IntCounter::new(
            "rejected_operations_total",
            "Total number of vault operations rejected with an error",
        )?;
        registry.register(Box::new(rejected_operations_total.clone()))?;

        let deposited_amount_total = Counter::new(
            "deposited_amount_total",
            "Gross base units deposited into the vault",
        )?;
        registry.register(Box::new(deposited_amount_total.clone()))?;

        let total_fees = Gauge::new("total_fees", "Accrued fees not yet swept, in base units")?;
        registry.register(Box::new(total_fees.clone()))?;

        let active_destinations =
            IntGauge::new("active_destinations", "Number of active destinations")?;
        registry.register(Box::new(active_destinations.clone()))?;

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Time spent executing a mutating vault operation, in seconds",
            )
            .buckets(vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05]),
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            deposits_total,
            withdrawals_total,
            rejected_operations_total,
            deposited_amount_total,
            total_fees,
            active_destinations,
            operation_latency_seconds,
        })
    }

    /// Refreshes the gauges from the vault's current state.
    pub fn observe_vault(&self, vault: &Vault<SimulatedAdapter>) {
        self.total_fees.set(as_float(vault.total_fees()));
        self.active_destinations.set(vault.active_count() as i64);
    }

    /// Records a committed deposit of `gross` base units.
    pub fn record_deposit(&self, gross: Amount) {
        self.deposits_total.inc();
        self.deposited_amount_total.inc_by(as_float(gross));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

// Prometheus samples are f64; amounts beyond 2^53 lose precision there.
fn as_float(amount: Amount) -> f64 {
    amount as f64
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
