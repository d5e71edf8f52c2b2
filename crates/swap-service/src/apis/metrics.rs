//! `GET /metrics` - Prometheus text exposition.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, TextEncoder};

pub async fn handle_metrics() -> impl IntoResponse {
	let encoder = TextEncoder::new();
	let metric_families = swap_core::metrics::REGISTRY.gather();

	let mut buffer = Vec::new();
	match encoder.encode(&metric_families, &mut buffer) {
		Ok(()) => (
			StatusCode::OK,
			[("content-type", "text/plain; version=0.0.4; charset=utf-8")],
			buffer,
		),
		Err(e) => (
			StatusCode::INTERNAL_SERVER_ERROR,
			[("content-type", "text/plain; charset=utf-8")],
			format!("failed to encode metrics: {e}").into_bytes(),
		),
	}
}
