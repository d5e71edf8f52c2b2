//! Persistent swap storage.
//!
//! The store is the serialization point for all swap mutations: every
//! status transition carries the expected current status in its WHERE
//! clause, so a duplicate delivery affects zero rows instead of corrupting
//! state. Callers treat a `false` return from a transition as "another
//! worker already made progress" and move on.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use swap_types::{NewSwap, OrderStatus, OrderUid, SupportedChain, Swap, SwapStatus};
use thiserror::Error;
use uuid::Uuid;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
	pub mod postgres;
}

pub use implementations::memory::MemoryStore;
pub use implementations::postgres::PostgresStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
	/// Error surfaced by the database driver.
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	/// Error applying startup migrations.
	#[error("migration error: {0}")]
	Migration(#[from] sqlx::migrate::MigrateError),
	/// A persisted row failed to parse back into the domain model.
	#[error("corrupt swap record {0}: {1}")]
	Corrupt(Uuid, String),
}

/// Aggregated gauge input: swap count per (chain, status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCount {
	pub chain: SupportedChain,
	pub status: SwapStatus,
	pub count: u64,
}

/// Narrow query surface over persisted swaps.
///
/// The state machine of the swap lifecycle advances only through these
/// status-conditioned methods. Mutating methods return whether a row was
/// actually updated; `false` means the gate did not match (duplicate
/// dispatch or a concurrent transition) and is not an error.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait SwapStore: Send + Sync {
	/// Inserts a freshly created swap in `pending_deposit`.
	async fn create(&self, swap: NewSwap) -> Result<Swap, StoreError>;

	/// Looks a swap up by primary key.
	async fn by_id(&self, swap_id: Uuid) -> Result<Option<Swap>, StoreError>;

	/// Looks a swap up by its (unique) vault address.
	async fn by_vault(&self, vault_address: Address) -> Result<Option<Swap>, StoreError>;

	/// Swaps on one chain still waiting for a deposit, bounded by expiry.
	async fn pending_by_chain(&self, chain: SupportedChain) -> Result<Vec<Swap>, StoreError>;

	/// All swaps currently in `executing`, including those whose order UID
	/// has not been persisted yet.
	async fn executing(&self) -> Result<Vec<Swap>, StoreError>;

	/// Records the observed deposit on a `pending_deposit` row.
	///
	/// The depositing transaction hash is not captured by the deposit
	/// poller and is optional by design.
	async fn record_deposit(
		&self,
		swap_id: Uuid,
		deposit_tx_hash: Option<String>,
		amount: U256,
	) -> Result<bool, StoreError>;

	/// `pending_deposit -> executing`. Returns `false` on duplicate dispatch.
	async fn mark_executing(&self, swap_id: Uuid) -> Result<bool, StoreError>;

	/// Persists the orderbook-assigned UID on an `executing` row and sets
	/// the order sub-status to `OPEN`.
	async fn save_order_uid(&self, swap_id: Uuid, uid: &OrderUid) -> Result<bool, StoreError>;

	/// `executing -> failed` with a human-readable reason.
	async fn mark_failed(&self, swap_id: Uuid, reason: &str) -> Result<bool, StoreError>;

	/// `executing -> refund_pending` with a human-readable reason.
	async fn mark_needs_refund(&self, swap_id: Uuid, reason: &str) -> Result<bool, StoreError>;

	/// Applies an orderbook status observation to an `executing` row.
	///
	/// Terminal mapping:
	/// - `FULFILLED` also moves the swap to `complete` and records the
	///   settlement transaction and executed buy amount;
	/// - `EXPIRED` / `CANCELLED` move the swap to `refund_pending` and set
	///   the failure reason;
	/// - `OPEN` / `PRESIGNATURE_PENDING` only refresh the sub-status.
	async fn update_order_status(
		&self,
		swap_id: Uuid,
		order_status: OrderStatus,
		settlement_tx_hash: Option<String>,
		actual_buy_amount: Option<U256>,
	) -> Result<bool, StoreError>;

	/// Bulk `pending_deposit -> expired` for rows past their expiry.
	/// Returns the number of rows moved.
	async fn expire_overdue(&self) -> Result<u64, StoreError>;

	/// Swap counts per (chain, status) for gauge refresh.
	async fn counts_by_status_and_chain(&self) -> Result<Vec<StatusCount>, StoreError>;

	/// Connectivity probe.
	async fn health_check(&self) -> Result<(), StoreError>;
}

/// The failure reason recorded when an order expires without a fill.
pub const REASON_ORDER_EXPIRED: &str = "order expired without fill";

/// The failure reason recorded when an order is cancelled.
pub const REASON_ORDER_CANCELLED: &str = "order cancelled";
