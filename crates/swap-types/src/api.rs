//! HTTP API request/response types and the structured API error.
//!
//! Request bodies deserialize into loosely-typed inputs (`u64` chain ids,
//! `String` addresses) so that schema problems surface as 422 while
//! semantic problems (unsupported chain, bad address) are validated in the
//! handlers and surface as 400 with a useful message.

use crate::swap::{OrderStatus, Swap, SwapStatus};
use crate::token::Token;
use crate::utils::{parse_evm_address, to_checksum};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw token descriptor as it appears in request bodies.
///
/// Parsed into a [`Token`] by the handlers so invalid addresses map to 400.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInput {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
}

impl TokenInput {
	/// Validates the descriptor into a [`Token`].
	pub fn parse(&self) -> Result<Token, String> {
		match self.kind.as_str() {
			"erc20" => {
				let raw = self
					.address
					.as_deref()
					.ok_or_else(|| "erc20 token requires an address".to_string())?;
				Ok(Token::Erc20 {
					address: parse_evm_address(raw)?,
				})
			},
			"ether" => Ok(Token::Ether),
			other => Err(format!("unknown token type: {}", other)),
		}
	}
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	/// Unix milliseconds.
	pub timestamp: u64,
}

/// `POST /quote` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
	pub chain_id: u64,
	pub buy_token: TokenInput,
	/// Decimal string, sell-token base units.
	pub sell_amount: String,
}

/// `POST /quote` response body. Also returned with a 400 status when the
/// orderbook rejects the quote, carrying the upstream message verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
	pub can_fill: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sell_amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub buy_amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fee_amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub valid_to: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl QuoteResponse {
	/// A rejection response carrying the orderbook's message verbatim.
	pub fn rejection(message: String) -> Self {
		Self {
			can_fill: false,
			sell_amount: None,
			buy_amount: None,
			fee_amount: None,
			valid_to: None,
			message: Some(message),
		}
	}
}

/// `POST /swap` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwapRequest {
	pub chain_id: u64,
	pub buy_token: TokenInput,
	pub recipient_address: String,
	pub refund_address: String,
}

/// `POST /swap` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwapResponse {
	pub swap_id: String,
	pub chain_id: u64,
	/// EIP-55 checksummed deposit address.
	pub vault_address: String,
	pub sell_token: Token,
	pub buy_token: Token,
	pub status: SwapStatus,
	/// RFC 3339.
	pub created_at: String,
	pub expires_at: String,
}

/// `GET /swap/{id}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapStatusResponse {
	pub swap_id: String,
	pub chain_id: u64,
	pub vault_address: String,
	pub sell_token: Token,
	pub buy_token: Token,
	pub recipient_address: String,
	pub refund_address: String,
	pub status: SwapStatus,
	pub created_at: String,
	pub expires_at: String,
	pub updated_at: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deposit_tx_hash: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deposit_amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order_uid: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order_status: Option<OrderStatus>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub settlement_tx_hash: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub actual_buy_amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failure_reason: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refund_tx_hash: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refund_amount: Option<String>,
}

impl From<&Swap> for SwapStatusResponse {
	fn from(swap: &Swap) -> Self {
		Self {
			swap_id: swap.swap_id.to_string(),
			chain_id: swap.chain.id(),
			vault_address: to_checksum(&swap.vault_address),
			sell_token: swap.sell_token,
			buy_token: swap.buy_token,
			recipient_address: to_checksum(&swap.recipient_address),
			refund_address: to_checksum(&swap.refund_address),
			status: swap.status,
			created_at: swap.created_at.to_rfc3339(),
			expires_at: swap.expires_at.to_rfc3339(),
			updated_at: swap.updated_at.to_rfc3339(),
			deposit_tx_hash: swap.deposit_tx_hash.clone(),
			deposit_amount: swap.deposit_amount.map(|a| a.to_string()),
			order_uid: swap.cow_order_uid.map(|u| u.to_string()),
			order_status: swap.order_status,
			settlement_tx_hash: swap.settlement_tx_hash.clone(),
			actual_buy_amount: swap.actual_buy_amount.map(|a| a.to_string()),
			failure_reason: swap.failure_reason.clone(),
			refund_tx_hash: swap.refund_tx_hash.clone(),
			refund_amount: swap.refund_amount.map(|a| a.to_string()),
		}
	}
}

/// JSON error body for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error class.
	pub error: String,
	/// Human-readable description.
	pub message: String,
}

/// Structured API error with HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
	/// Semantic validation failure (400).
	BadRequest { message: String },
	/// Unknown resource (404).
	NotFound { message: String },
	/// Schema-level failure (422).
	UnprocessableEntity { message: String },
	/// Anything unexpected (500). The message is logged, not leaked.
	InternalServerError { message: String },
}

impl ApiError {
	pub fn bad_request(message: impl Into<String>) -> Self {
		ApiError::BadRequest {
			message: message.into(),
		}
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		ApiError::NotFound {
			message: message.into(),
		}
	}

	pub fn internal(message: impl Into<String>) -> Self {
		ApiError::InternalServerError {
			message: message.into(),
		}
	}

	/// HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::NotFound { .. } => 404,
			ApiError::UnprocessableEntity { .. } => 422,
			ApiError::InternalServerError { .. } => 500,
		}
	}

	/// Converts to the JSON error body.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message) = match self {
			ApiError::BadRequest { message } => ("bad_request", message.clone()),
			ApiError::NotFound { message } => ("not_found", message.clone()),
			ApiError::UnprocessableEntity { message } => ("unprocessable_entity", message.clone()),
			// Internal details stay in the logs.
			ApiError::InternalServerError { .. } => {
				("internal_server_error", "internal server error".to_string())
			},
		};
		ErrorResponse {
			error: error.to_string(),
			message,
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::BadRequest { message } => write!(f, "Bad Request: {}", message),
			ApiError::NotFound { message } => write!(f, "Not Found: {}", message),
			ApiError::UnprocessableEntity { message } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			ApiError::InternalServerError { message } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for ApiError {}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		if let ApiError::InternalServerError { message } = &self {
			tracing::error!(error = %message, "internal server error");
		}

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_token_input_parses_erc20() {
		let input = TokenInput {
			kind: "erc20".to_string(),
			address: Some("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913".to_string()),
		};
		let token = input.parse().unwrap();
		assert!(matches!(token, Token::Erc20 { .. }));
	}

	#[test]
	fn test_token_input_parses_ether() {
		let input = TokenInput {
			kind: "ether".to_string(),
			address: None,
		};
		assert_eq!(input.parse().unwrap(), Token::Ether);
	}

	#[test]
	fn test_token_input_rejects_missing_address() {
		let input = TokenInput {
			kind: "erc20".to_string(),
			address: None,
		};
		assert!(input.parse().is_err());
	}

	#[test]
	fn test_api_error_status_codes() {
		assert_eq!(ApiError::bad_request("x").status_code(), 400);
		assert_eq!(ApiError::not_found("x").status_code(), 404);
		assert_eq!(
			ApiError::UnprocessableEntity {
				message: "x".into()
			}
			.status_code(),
			422
		);
		assert_eq!(ApiError::internal("x").status_code(), 500);
	}

	#[test]
	fn test_internal_error_body_hides_details() {
		let body = ApiError::internal("connection string leaked").to_error_response();
		assert_eq!(body.message, "internal server error");
	}

	#[test]
	fn test_quote_rejection_shape() {
		let resp = QuoteResponse::rejection("sell amount does not cover fee".to_string());
		let json = serde_json::to_value(&resp).unwrap();
		assert_eq!(json["canFill"], false);
		assert_eq!(json["message"], "sell amount does not cover fee");
		assert!(json.get("buyAmount").is_none());
	}
}
