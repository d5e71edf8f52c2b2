//! Persisted swap record and status enums.

use crate::chain::SupportedChain;
use crate::order::OrderUid;
use crate::token::Token;
use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a swap.
///
/// A state only ever advances; every store mutation is gated on the
/// expected current state so a duplicate transition is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
	/// Vault minted, waiting for the deposit to land.
	PendingDeposit,
	/// Deposit seen; permit + order construction and tracking in flight.
	Executing,
	/// Order filled; settlement observed.
	Complete,
	/// Order construction or submission failed; funds stay in the vault.
	Failed,
	/// Deposit never arrived before `expires_at`.
	Expired,
	/// Order terminated without a fill; awaiting out-of-band recovery.
	RefundPending,
	/// Out-of-band recovery returned the deposit.
	Refunded,
}

impl SwapStatus {
	pub const ALL: [SwapStatus; 7] = [
		SwapStatus::PendingDeposit,
		SwapStatus::Executing,
		SwapStatus::Complete,
		SwapStatus::Failed,
		SwapStatus::Expired,
		SwapStatus::RefundPending,
		SwapStatus::Refunded,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			SwapStatus::PendingDeposit => "pending_deposit",
			SwapStatus::Executing => "executing",
			SwapStatus::Complete => "complete",
			SwapStatus::Failed => "failed",
			SwapStatus::Expired => "expired",
			SwapStatus::RefundPending => "refund_pending",
			SwapStatus::Refunded => "refunded",
		}
	}

	/// Terminal states admit no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			SwapStatus::Complete | SwapStatus::Failed | SwapStatus::Expired | SwapStatus::Refunded
		)
	}
}

impl fmt::Display for SwapStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SwapStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SwapStatus::ALL
			.into_iter()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| format!("unknown swap status: {}", s))
	}
}

/// Orderbook-side status of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	PresignaturePending,
	Open,
	Fulfilled,
	Cancelled,
	Expired,
}

impl OrderStatus {
	pub const ALL: [OrderStatus; 5] = [
		OrderStatus::PresignaturePending,
		OrderStatus::Open,
		OrderStatus::Fulfilled,
		OrderStatus::Cancelled,
		OrderStatus::Expired,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::PresignaturePending => "PRESIGNATURE_PENDING",
			OrderStatus::Open => "OPEN",
			OrderStatus::Fulfilled => "FULFILLED",
			OrderStatus::Cancelled => "CANCELLED",
			OrderStatus::Expired => "EXPIRED",
		}
	}

	/// Whether the orderbook will never change this status again.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderStatus::Fulfilled | OrderStatus::Cancelled | OrderStatus::Expired
		)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		OrderStatus::ALL
			.into_iter()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| format!("unknown order status: {}", s))
	}
}

/// The persisted swap record, the atomic unit of coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
	/// Time-ordered primary key (UUIDv7).
	pub swap_id: Uuid,
	pub chain: SupportedChain,
	/// Single-use deposit address, unique across all swaps.
	pub vault_address: Address,
	/// The only material needed to re-derive the vault key.
	pub vault_salt: B256,
	pub sell_token: Token,
	pub buy_token: Token,
	pub recipient_address: Address,
	pub refund_address: Address,
	pub status: SwapStatus,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub deposit_tx_hash: Option<String>,
	pub deposit_amount: Option<U256>,
	pub cow_order_uid: Option<OrderUid>,
	pub order_status: Option<OrderStatus>,
	pub settlement_tx_hash: Option<String>,
	pub actual_buy_amount: Option<U256>,
	/// Human diagnostic, never parsed.
	pub failure_reason: Option<String>,
	pub refund_tx_hash: Option<String>,
	pub refund_amount: Option<U256>,
}

/// The insert shape for a freshly created swap.
#[derive(Debug, Clone)]
pub struct NewSwap {
	pub swap_id: Uuid,
	pub chain: SupportedChain,
	pub vault_address: Address,
	pub vault_salt: B256,
	pub sell_token: Token,
	pub buy_token: Token,
	pub recipient_address: Address,
	pub refund_address: Address,
	pub expires_at: DateTime<Utc>,
}
