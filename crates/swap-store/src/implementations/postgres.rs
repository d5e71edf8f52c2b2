//! PostgreSQL-backed swap store.
//!
//! Status transitions are expressed directly in SQL: each UPDATE carries
//! the expected current status in its WHERE clause, so concurrency safety
//! degrades to rows-affected accounting instead of row locks.

use crate::{StatusCount, StoreError, SwapStore, REASON_ORDER_CANCELLED, REASON_ORDER_EXPIRED};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, Pool, Postgres, Row};
use std::str::FromStr;
use swap_types::{
	parse_evm_address, to_checksum, NewSwap, OrderStatus, OrderUid, SupportedChain, Swap,
	SwapStatus, Token,
};
use uuid::Uuid;

/// Column list shared by every SELECT; the status enum comes back as text.
const SWAP_COLUMNS: &str = "swap_id, chain_id, vault_address, vault_salt, sell_token, buy_token, \
	recipient_address, refund_address, status::TEXT AS status, created_at, expires_at, \
	updated_at, deposit_tx_hash, deposit_amount, cow_order_uid, order_status, \
	settlement_tx_hash, actual_buy_amount, failure_reason, refund_tx_hash, refund_amount";

/// Raw database row for a swap.
#[derive(Debug, Clone, FromRow)]
struct SwapRow {
	swap_id: Uuid,
	chain_id: i64,
	vault_address: String,
	vault_salt: Vec<u8>,
	sell_token: String,
	buy_token: String,
	recipient_address: String,
	refund_address: String,
	status: String,
	created_at: DateTime<Utc>,
	expires_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
	deposit_tx_hash: Option<String>,
	deposit_amount: Option<String>,
	cow_order_uid: Option<String>,
	order_status: Option<String>,
	settlement_tx_hash: Option<String>,
	actual_buy_amount: Option<String>,
	failure_reason: Option<String>,
	refund_tx_hash: Option<String>,
	refund_amount: Option<String>,
}

impl SwapRow {
	fn into_swap(self) -> Result<Swap, StoreError> {
		let id = self.swap_id;
		let corrupt = |what: &str, detail: String| StoreError::Corrupt(id, format!("{}: {}", what, detail));

		let chain = SupportedChain::from_id(self.chain_id as u64)
			.ok_or_else(|| corrupt("chain_id", self.chain_id.to_string()))?;
		let vault_salt: [u8; 32] = self
			.vault_salt
			.try_into()
			.map_err(|v: Vec<u8>| corrupt("vault_salt", format!("{} bytes", v.len())))?;

		let parse_amount = |field: &str, value: Option<String>| -> Result<Option<U256>, StoreError> {
			value
				.map(|v| U256::from_str(&v).map_err(|e| corrupt(field, e.to_string())))
				.transpose()
		};

		Ok(Swap {
			swap_id: id,
			chain,
			vault_address: parse_evm_address(&self.vault_address)
				.map_err(|e| corrupt("vault_address", e))?,
			vault_salt: B256::from(vault_salt),
			sell_token: Token::from_json(&self.sell_token)
				.map_err(|e| corrupt("sell_token", e))?,
			buy_token: Token::from_json(&self.buy_token).map_err(|e| corrupt("buy_token", e))?,
			recipient_address: parse_evm_address(&self.recipient_address)
				.map_err(|e| corrupt("recipient_address", e))?,
			refund_address: parse_evm_address(&self.refund_address)
				.map_err(|e| corrupt("refund_address", e))?,
			status: SwapStatus::from_str(&self.status).map_err(|e| corrupt("status", e))?,
			created_at: self.created_at,
			expires_at: self.expires_at,
			updated_at: self.updated_at,
			deposit_tx_hash: self.deposit_tx_hash,
			deposit_amount: parse_amount("deposit_amount", self.deposit_amount)?,
			cow_order_uid: self
				.cow_order_uid
				.map(|v| OrderUid::from_str(&v).map_err(|e| corrupt("cow_order_uid", e)))
				.transpose()?,
			order_status: self
				.order_status
				.map(|v| OrderStatus::from_str(&v).map_err(|e| corrupt("order_status", e)))
				.transpose()?,
			settlement_tx_hash: self.settlement_tx_hash,
			actual_buy_amount: parse_amount("actual_buy_amount", self.actual_buy_amount)?,
			failure_reason: self.failure_reason,
			refund_tx_hash: self.refund_tx_hash,
			refund_amount: parse_amount("refund_amount", self.refund_amount)?,
		})
	}
}

/// PostgreSQL swap store.
pub struct PostgresStore {
	pool: Pool<Postgres>,
}

impl PostgresStore {
	/// Connects to the database and applies pending migrations.
	pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
		let pool = PgPoolOptions::new()
			.max_connections(max_connections)
			.connect(url)
			.await?;

		sqlx::migrate!("./migrations").run(&pool).await?;

		Ok(Self { pool })
	}

	/// Wraps an existing pool (migrations are the caller's concern).
	pub fn with_pool(pool: Pool<Postgres>) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl SwapStore for PostgresStore {
	async fn create(&self, swap: NewSwap) -> Result<Swap, StoreError> {
		let query = format!(
			"INSERT INTO swaps (swap_id, chain_id, vault_address, vault_salt, sell_token, \
			 buy_token, recipient_address, refund_address, status, expires_at) \
			 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending_deposit', $9) \
			 RETURNING {}",
			SWAP_COLUMNS
		);
		let row = sqlx::query_as::<_, SwapRow>(&query)
			.bind(swap.swap_id)
			.bind(swap.chain.id() as i64)
			.bind(to_checksum(&swap.vault_address))
			.bind(swap.vault_salt.as_slice())
			.bind(swap.sell_token.to_json())
			.bind(swap.buy_token.to_json())
			.bind(to_checksum(&swap.recipient_address))
			.bind(to_checksum(&swap.refund_address))
			.bind(swap.expires_at)
			.fetch_one(&self.pool)
			.await?;
		row.into_swap()
	}

	async fn by_id(&self, swap_id: Uuid) -> Result<Option<Swap>, StoreError> {
		let query = format!("SELECT {} FROM swaps WHERE swap_id = $1", SWAP_COLUMNS);
		let row = sqlx::query_as::<_, SwapRow>(&query)
			.bind(swap_id)
			.fetch_optional(&self.pool)
			.await?;
		row.map(SwapRow::into_swap).transpose()
	}

	async fn by_vault(&self, vault_address: Address) -> Result<Option<Swap>, StoreError> {
		let query = format!(
			"SELECT {} FROM swaps WHERE vault_address = $1",
			SWAP_COLUMNS
		);
		let row = sqlx::query_as::<_, SwapRow>(&query)
			.bind(to_checksum(&vault_address))
			.fetch_optional(&self.pool)
			.await?;
		row.map(SwapRow::into_swap).transpose()
	}

	async fn pending_by_chain(&self, chain: SupportedChain) -> Result<Vec<Swap>, StoreError> {
		let query = format!(
			"SELECT {} FROM swaps \
			 WHERE chain_id = $1 AND status = 'pending_deposit' AND expires_at > now() \
			 ORDER BY created_at",
			SWAP_COLUMNS
		);
		let rows = sqlx::query_as::<_, SwapRow>(&query)
			.bind(chain.id() as i64)
			.fetch_all(&self.pool)
			.await?;
		rows.into_iter().map(SwapRow::into_swap).collect()
	}

	async fn executing(&self) -> Result<Vec<Swap>, StoreError> {
		let query = format!(
			"SELECT {} FROM swaps WHERE status = 'executing' ORDER BY created_at",
			SWAP_COLUMNS
		);
		let rows = sqlx::query_as::<_, SwapRow>(&query)
			.fetch_all(&self.pool)
			.await?;
		rows.into_iter().map(SwapRow::into_swap).collect()
	}

	async fn record_deposit(
		&self,
		swap_id: Uuid,
		deposit_tx_hash: Option<String>,
		amount: U256,
	) -> Result<bool, StoreError> {
		let result = sqlx::query(
			"UPDATE swaps SET deposit_tx_hash = $2, deposit_amount = $3, updated_at = now() \
			 WHERE swap_id = $1 AND status = 'pending_deposit'",
		)
		.bind(swap_id)
		.bind(deposit_tx_hash)
		.bind(amount.to_string())
		.execute(&self.pool)
		.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn mark_executing(&self, swap_id: Uuid) -> Result<bool, StoreError> {
		let result = sqlx::query(
			"UPDATE swaps SET status = 'executing', updated_at = now() \
			 WHERE swap_id = $1 AND status = 'pending_deposit'",
		)
		.bind(swap_id)
		.execute(&self.pool)
		.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn save_order_uid(&self, swap_id: Uuid, uid: &OrderUid) -> Result<bool, StoreError> {
		let result = sqlx::query(
			"UPDATE swaps SET cow_order_uid = $2, order_status = 'OPEN', updated_at = now() \
			 WHERE swap_id = $1 AND status = 'executing'",
		)
		.bind(swap_id)
		.bind(uid.to_string())
		.execute(&self.pool)
		.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn mark_failed(&self, swap_id: Uuid, reason: &str) -> Result<bool, StoreError> {
		let result = sqlx::query(
			"UPDATE swaps SET status = 'failed', failure_reason = $2, updated_at = now() \
			 WHERE swap_id = $1 AND status = 'executing'",
		)
		.bind(swap_id)
		.bind(reason)
		.execute(&self.pool)
		.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn mark_needs_refund(&self, swap_id: Uuid, reason: &str) -> Result<bool, StoreError> {
		let result = sqlx::query(
			"UPDATE swaps SET status = 'refund_pending', failure_reason = $2, updated_at = now() \
			 WHERE swap_id = $1 AND status = 'executing'",
		)
		.bind(swap_id)
		.bind(reason)
		.execute(&self.pool)
		.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn update_order_status(
		&self,
		swap_id: Uuid,
		order_status: OrderStatus,
		settlement_tx_hash: Option<String>,
		actual_buy_amount: Option<U256>,
	) -> Result<bool, StoreError> {
		let result = match order_status {
			OrderStatus::Fulfilled => {
				sqlx::query(
					"UPDATE swaps SET status = 'complete', order_status = 'FULFILLED', \
					 settlement_tx_hash = $2, actual_buy_amount = $3, updated_at = now() \
					 WHERE swap_id = $1 AND status = 'executing'",
				)
				.bind(swap_id)
				.bind(settlement_tx_hash)
				.bind(actual_buy_amount.map(|a| a.to_string()))
				.execute(&self.pool)
				.await?
			},
			OrderStatus::Expired => {
				sqlx::query(
					"UPDATE swaps SET status = 'refund_pending', order_status = 'EXPIRED', \
					 failure_reason = $2, updated_at = now() \
					 WHERE swap_id = $1 AND status = 'executing'",
				)
				.bind(swap_id)
				.bind(REASON_ORDER_EXPIRED)
				.execute(&self.pool)
				.await?
			},
			OrderStatus::Cancelled => {
				sqlx::query(
					"UPDATE swaps SET status = 'refund_pending', order_status = 'CANCELLED', \
					 failure_reason = $2, updated_at = now() \
					 WHERE swap_id = $1 AND status = 'executing'",
				)
				.bind(swap_id)
				.bind(REASON_ORDER_CANCELLED)
				.execute(&self.pool)
				.await?
			},
			OrderStatus::Open | OrderStatus::PresignaturePending => {
				sqlx::query(
					"UPDATE swaps SET order_status = $2, updated_at = now() \
					 WHERE swap_id = $1 AND status = 'executing'",
				)
				.bind(swap_id)
				.bind(order_status.as_str())
				.execute(&self.pool)
				.await?
			},
		};
		Ok(result.rows_affected() > 0)
	}

	async fn expire_overdue(&self) -> Result<u64, StoreError> {
		let result = sqlx::query(
			"UPDATE swaps SET status = 'expired', updated_at = now() \
			 WHERE status = 'pending_deposit' AND expires_at < now()",
		)
		.execute(&self.pool)
		.await?;
		Ok(result.rows_affected())
	}

	async fn counts_by_status_and_chain(&self) -> Result<Vec<StatusCount>, StoreError> {
		let rows: Vec<PgRow> =
			sqlx::query("SELECT chain_id, status::TEXT AS status, COUNT(*) AS n FROM swaps GROUP BY chain_id, status")
				.fetch_all(&self.pool)
				.await?;

		let mut counts = Vec::with_capacity(rows.len());
		for row in rows {
			let chain_id: i64 = row.try_get("chain_id")?;
			let status: String = row.try_get("status")?;
			let n: i64 = row.try_get("n")?;
			let Some(chain) = SupportedChain::from_id(chain_id as u64) else {
				tracing::warn!(chain_id, "skipping counts for unknown chain");
				continue;
			};
			let Ok(status) = SwapStatus::from_str(&status) else {
				tracing::warn!(status = %status, "skipping counts for unknown status");
				continue;
			};
			counts.push(StatusCount {
				chain,
				status,
				count: n.max(0) as u64,
			});
		}
		Ok(counts)
	}

	async fn health_check(&self) -> Result<(), StoreError> {
		sqlx::query("SELECT 1").execute(&self.pool).await?;
		Ok(())
	}
}
