//! Router, shared state, and server startup.

use crate::apis;
use axum::{
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use std::time::Duration;
use swap_orderbook::Orderbook;
use swap_store::SwapStore;
use swap_vault::KeyVault;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub store: Arc<dyn SwapStore>,
	pub orderbook: Arc<dyn Orderbook>,
	pub vault: Arc<KeyVault>,
	/// How long a fresh swap waits for its deposit.
	pub swap_ttl: Duration,
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(apis::health::handle_health))
		.route("/quote", post(apis::quote::handle_quote))
		.route("/swap", post(apis::swap::handle_create_swap))
		.route("/swap/{id}", get(apis::swap::handle_swap_status))
		.route("/metrics", get(apis::metrics::handle_metrics))
		.layer(CorsLayer::permissive())
		.with_state(state)
}

/// Starts the HTTP server and serves until the shutdown token fires, then
/// drains in-flight requests.
pub async fn start_server(
	port: u16,
	state: AppState,
	shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let app = router(state);
	let bind_address = format!("0.0.0.0:{}", port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("swap coordinator API listening on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown.cancelled_owned())
		.await?;

	Ok(())
}

/// Logs a startup warning for every `executing` row with no order UID.
///
/// Such rows mean a previous process died between claiming the swap and
/// persisting its order; the settlement sweep will write them off after
/// the grace window, but operators want to see them immediately.
pub async fn audit_stuck_swaps(store: &dyn SwapStore) -> Result<usize, swap_store::StoreError> {
	let mut stuck = 0;
	for swap in store.executing().await? {
		if swap.cow_order_uid.is_none() {
			stuck += 1;
			tracing::warn!(
				swap_id = %swap.swap_id,
				chain = %swap.chain,
				updated_at = %swap.updated_at,
				"executing swap has no order uid; submission did not complete"
			);
		}
	}
	Ok(stuck)
}
