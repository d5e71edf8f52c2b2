//! `POST /quote`.
//!
//! Advisory quote for the public API. The executable quote is taken again
//! by the orchestrator once a deposit lands, so this one only answers
//! "roughly what would I get" - which is also why orderbook rejections
//! come back as a 400 with `canFill:false` and the upstream message
//! rather than as an opaque error.

use crate::server::AppState;
use alloy_primitives::U256;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use std::str::FromStr;
use swap_orderbook::Orderbook;
use swap_types::{ApiError, QuoteRequest, QuoteResponse, SupportedChain, CBBTC, GPV2_SETTLEMENT};

pub async fn handle_quote(
	State(state): State<AppState>,
	Json(request): Json<QuoteRequest>,
) -> Result<(StatusCode, Json<QuoteResponse>), ApiError> {
	let chain = SupportedChain::from_id(request.chain_id)
		.ok_or_else(|| ApiError::bad_request(format!("unsupported chain id: {}", request.chain_id)))?;
	let buy_token = request.buy_token.parse().map_err(ApiError::bad_request)?;
	let sell_amount = U256::from_str(&request.sell_amount)
		.map_err(|e| ApiError::bad_request(format!("invalid sellAmount: {}", e)))?;

	// No vault exists yet, so the settlement contract stands in as the
	// quote's `from`; the executable quote later uses the real vault.
	match state
		.orderbook
		.quote(
			chain,
			CBBTC,
			buy_token.orderbook_address(),
			sell_amount,
			GPV2_SETTLEMENT,
		)
		.await
	{
		Ok(quote) => Ok((
			StatusCode::OK,
			Json(QuoteResponse {
				can_fill: true,
				sell_amount: Some(quote.sell_amount.to_string()),
				buy_amount: Some(quote.buy_amount.to_string()),
				fee_amount: Some(quote.fee_amount.to_string()),
				valid_to: Some(quote.valid_to),
				message: None,
			}),
		)),
		Err(e) => {
			tracing::debug!(chain = %chain, error = %e, "quote rejected");
			Ok((
				StatusCode::BAD_REQUEST,
				Json(QuoteResponse::rejection(e.to_string())),
			))
		},
	}
}
