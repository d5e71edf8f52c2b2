//! `POST /swap` and `GET /swap/{id}`.

use crate::server::AppState;
use axum::extract::{Path, State};
use axum::response::Json;
use chrono::{Duration as ChronoDuration, Utc};
use swap_store::SwapStore;
use swap_types::{
	to_checksum, ApiError, CreateSwapRequest, CreateSwapResponse, NewSwap, SupportedChain,
	SwapStatusResponse, Token, CBBTC,
};
use uuid::Uuid;

pub async fn handle_create_swap(
	State(state): State<AppState>,
	Json(request): Json<CreateSwapRequest>,
) -> Result<Json<CreateSwapResponse>, ApiError> {
	let chain = SupportedChain::from_id(request.chain_id)
		.ok_or_else(|| ApiError::bad_request(format!("unsupported chain id: {}", request.chain_id)))?;
	let buy_token = request.buy_token.parse().map_err(ApiError::bad_request)?;
	let recipient_address = swap_types::parse_evm_address(&request.recipient_address)
		.map_err(|e| ApiError::bad_request(format!("invalid recipientAddress: {}", e)))?;
	let refund_address = swap_types::parse_evm_address(&request.refund_address)
		.map_err(|e| ApiError::bad_request(format!("invalid refundAddress: {}", e)))?;

	let minted = state
		.vault
		.mint()
		.map_err(|e| ApiError::internal(format!("vault mint failed: {}", e)))?;

	let ttl = ChronoDuration::from_std(state.swap_ttl)
		.map_err(|e| ApiError::internal(format!("invalid swap ttl: {}", e)))?;

	let swap = state
		.store
		.create(NewSwap {
			swap_id: Uuid::now_v7(),
			chain,
			vault_address: minted.address(),
			vault_salt: minted.salt(),
			sell_token: Token::Erc20 { address: CBBTC },
			buy_token,
			recipient_address,
			refund_address,
			expires_at: Utc::now() + ttl,
		})
		.await
		.map_err(|e| ApiError::internal(format!("failed to persist swap: {}", e)))?;

	tracing::info!(
		swap_id = %swap.swap_id,
		chain = %chain,
		vault = %to_checksum(&swap.vault_address),
		"swap created"
	);

	Ok(Json(CreateSwapResponse {
		swap_id: swap.swap_id.to_string(),
		chain_id: chain.id(),
		vault_address: to_checksum(&swap.vault_address),
		sell_token: swap.sell_token,
		buy_token: swap.buy_token,
		status: swap.status,
		created_at: swap.created_at.to_rfc3339(),
		expires_at: swap.expires_at.to_rfc3339(),
	}))
}

pub async fn handle_swap_status(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<SwapStatusResponse>, ApiError> {
	// A malformed id cannot name a swap; treat it as unknown.
	let swap_id =
		Uuid::parse_str(&id).map_err(|_| ApiError::not_found(format!("swap not found: {}", id)))?;

	let swap = state
		.store
		.by_id(swap_id)
		.await
		.map_err(|e| ApiError::internal(format!("failed to load swap: {}", e)))?
		.ok_or_else(|| ApiError::not_found(format!("swap not found: {}", id)))?;

	Ok(Json(SwapStatusResponse::from(&swap)))
}
