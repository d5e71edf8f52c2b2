//! Prometheus metrics for the swap coordinator.
//!
//! All instruments register against one process-wide registry; the HTTP
//! surface exposes it at `GET /metrics` in text exposition format.

use prometheus::{
	Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
};
use std::sync::{LazyLock, Once};
use swap_store::StatusCount;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Current swap counts by chain and status; refreshed every settlement tick.
pub static SWAPS_BY_STATUS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
	IntGaugeVec::new(
		Opts::new("swap_swaps", "Current number of swaps by chain and status"),
		&["chain", "status"],
	)
	.expect("metric creation failed")
});

pub static DEPOSITS_DETECTED: LazyLock<IntCounter> = LazyLock::new(|| {
	IntCounter::new(
		"swap_deposits_detected_total",
		"Total number of funded vaults detected by the deposit pollers",
	)
	.expect("metric creation failed")
});

pub static ORDERS_SUBMITTED: LazyLock<IntCounter> = LazyLock::new(|| {
	IntCounter::new(
		"swap_orders_submitted_total",
		"Total number of orders accepted by the orderbook",
	)
	.expect("metric creation failed")
});

pub static EXECUTION_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
	IntCounter::new(
		"swap_execution_failures_total",
		"Total number of swaps that failed after deposit detection",
	)
	.expect("metric creation failed")
});

pub static POLLER_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
	IntCounterVec::new(
		Opts::new("swap_poller_errors_total", "Total poller errors by poller"),
		&["poller"],
	)
	.expect("metric creation failed")
});

/// Wall-clock seconds from swap creation to observed fill.
pub static COMPLETION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
	Histogram::with_opts(
		HistogramOpts::new(
			"swap_completion_seconds",
			"Time from swap creation to observed settlement",
		)
		.buckets(vec![
			15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0, 86400.0,
		]),
	)
	.expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent; subsequent calls are no-ops.
pub fn register_metrics() {
	REGISTER_ONCE.call_once(|| {
		REGISTRY
			.register(Box::new(SWAPS_BY_STATUS.clone()))
			.expect("metric registration failed");
		REGISTRY
			.register(Box::new(DEPOSITS_DETECTED.clone()))
			.expect("metric registration failed");
		REGISTRY
			.register(Box::new(ORDERS_SUBMITTED.clone()))
			.expect("metric registration failed");
		REGISTRY
			.register(Box::new(EXECUTION_FAILURES.clone()))
			.expect("metric registration failed");
		REGISTRY
			.register(Box::new(POLLER_ERRORS.clone()))
			.expect("metric registration failed");
		REGISTRY
			.register(Box::new(COMPLETION_SECONDS.clone()))
			.expect("metric registration failed");
	});
}

/// Replaces the status gauges with a fresh aggregation from the store.
pub fn refresh_status_gauges(counts: &[StatusCount]) {
	SWAPS_BY_STATUS.reset();
	for entry in counts {
		SWAPS_BY_STATUS
			.with_label_values(&[entry.chain.name(), entry.status.as_str()])
			.set(entry.count as i64);
	}
}
