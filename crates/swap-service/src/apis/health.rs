//! `GET /health`.

use axum::response::Json;
use swap_types::utils::current_timestamp_millis;
use swap_types::HealthResponse;

pub async fn handle_health() -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		timestamp: current_timestamp_millis(),
	})
}
