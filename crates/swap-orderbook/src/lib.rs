//! Orderbook client and slippage oracle.
//!
//! A thin, well-typed wrapper over the external settlement orderbook's
//! HTTP API, plus the per-market slippage oracle with its short-TTL cache.
//! Upstream rejection messages are preserved verbatim so the public API
//! can forward them to callers.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swap_types::{OrderKind, OrderStatus, OrderUid, SigningScheme, SupportedChain};
use thiserror::Error;

pub mod slippage;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

pub use implementations::http::HttpOrderbook;
pub use slippage::{apply_to_buy_amount, SlippageOracle};

/// Errors that can occur talking to the orderbook.
#[derive(Debug, Error)]
pub enum OrderbookError {
	/// Transport-level failure (connect, timeout, TLS).
	#[error("orderbook network error: {0}")]
	Network(String),
	/// The orderbook rejected the request; the message is the server's,
	/// verbatim, suitable for forwarding to the API caller.
	#[error("{0}")]
	Rejected(String),
	/// A 2xx response that did not parse into the expected shape.
	#[error("unexpected orderbook response: {0}")]
	InvalidResponse(String),
}

/// Serde helper: U256 amounts travel as decimal strings on the wire.
pub mod amount_string {
	use alloy_primitives::U256;
	use serde::{de, Deserialize, Deserializer, Serializer};
	use std::str::FromStr;

	pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&value.to_string())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
		let raw = String::deserialize(deserializer)?;
		U256::from_str(&raw).map_err(de::Error::custom)
	}

	pub mod option {
		use super::*;

		pub fn serialize<S: Serializer>(
			value: &Option<U256>,
			serializer: S,
		) -> Result<S::Ok, S::Error> {
			match value {
				Some(v) => serializer.serialize_some(&v.to_string()),
				None => serializer.serialize_none(),
			}
		}

		pub fn deserialize<'de, D: Deserializer<'de>>(
			deserializer: D,
		) -> Result<Option<U256>, D::Error> {
			let raw = Option::<String>::deserialize(deserializer)?;
			raw.map(|s| U256::from_str(&s).map_err(de::Error::custom))
				.transpose()
		}
	}
}

/// A quote from the orderbook for selling an exact amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
	/// Orderbook-assigned quote id, echoed back at order submission.
	pub quote_id: Option<i64>,
	/// Sell amount after fee, base units.
	pub sell_amount: U256,
	/// Expected buy amount before slippage, base units.
	pub buy_amount: U256,
	pub fee_amount: U256,
	/// Unix seconds the quote is valid until.
	pub valid_to: u64,
}

/// A signed order as the orderbook accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
	pub sell_token: Address,
	pub buy_token: Address,
	pub receiver: Address,
	#[serde(with = "amount_string")]
	pub sell_amount: U256,
	#[serde(with = "amount_string")]
	pub buy_amount: U256,
	pub valid_to: u32,
	/// keccak256 of the canonical app-data document.
	pub app_data: B256,
	#[serde(with = "amount_string")]
	pub fee_amount: U256,
	pub kind: OrderKind,
	pub partially_fillable: bool,
	pub sell_token_balance: String,
	pub buy_token_balance: String,
	pub signing_scheme: SigningScheme,
	/// 65-byte signature, 0x-prefixed hex.
	pub signature: String,
	/// The vault address that signed the order.
	pub from: Address,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub quote_id: Option<i64>,
}

/// Current orderbook-side state of a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderState {
	pub status: OrderStatus,
	#[serde(default, with = "amount_string::option")]
	pub executed_buy_amount: Option<U256>,
	#[serde(default, with = "amount_string::option")]
	pub executed_sell_amount: Option<U256>,
}

/// A settled fill of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
	pub tx_hash: String,
	#[serde(with = "amount_string")]
	pub buy_amount: U256,
	#[serde(with = "amount_string")]
	pub sell_amount: U256,
	pub block_number: u64,
}

/// The external settlement orderbook.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait Orderbook: Send + Sync {
	/// Requests a sell quote. Rejections carry the server's message.
	async fn quote(
		&self,
		chain: SupportedChain,
		sell_token: Address,
		buy_token: Address,
		sell_amount: U256,
		from: Address,
	) -> Result<Quote, OrderbookError>;

	/// Registers the full app-data document for `hash`. Idempotent; must
	/// happen before an order referencing `hash` is submitted.
	async fn upload_app_data(
		&self,
		chain: SupportedChain,
		hash: B256,
		document: &str,
	) -> Result<(), OrderbookError>;

	/// Submits a signed order, returning the orderbook-assigned UID.
	async fn submit_order(
		&self,
		chain: SupportedChain,
		submission: &OrderSubmission,
	) -> Result<OrderUid, OrderbookError>;

	/// Looks up the current status of an order.
	async fn order_status(
		&self,
		chain: SupportedChain,
		uid: &OrderUid,
	) -> Result<OrderState, OrderbookError>;

	/// Settled fills of an order (entries without a settlement transaction
	/// are filtered out).
	async fn trades(
		&self,
		chain: SupportedChain,
		uid: &OrderUid,
	) -> Result<Vec<Trade>, OrderbookError>;
}
