//! In-memory swap store.
//!
//! Mirrors the status-gating semantics of the PostgreSQL implementation
//! under a process-local lock. Used by tests and local development; the
//! state-machine tests here double as the executable specification of the
//! gating rules both implementations share.

use crate::{StatusCount, StoreError, SwapStore, REASON_ORDER_CANCELLED, REASON_ORDER_EXPIRED};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use swap_types::{NewSwap, OrderStatus, OrderUid, SupportedChain, Swap, SwapStatus};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory swap store.
#[derive(Default)]
pub struct MemoryStore {
	swaps: RwLock<HashMap<Uuid, Swap>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Applies `update` to the swap iff its status matches `gate`.
	/// Returns whether the row was updated, like SQL rows-affected.
	async fn gated_update<F>(&self, swap_id: Uuid, gate: SwapStatus, update: F) -> bool
	where
		F: FnOnce(&mut Swap),
	{
		let mut swaps = self.swaps.write().await;
		match swaps.get_mut(&swap_id) {
			Some(swap) if swap.status == gate => {
				update(swap);
				swap.updated_at = Utc::now();
				true
			},
			_ => false,
		}
	}
}

#[async_trait]
impl SwapStore for MemoryStore {
	async fn create(&self, new: NewSwap) -> Result<Swap, StoreError> {
		let now = Utc::now();
		let swap = Swap {
			swap_id: new.swap_id,
			chain: new.chain,
			vault_address: new.vault_address,
			vault_salt: new.vault_salt,
			sell_token: new.sell_token,
			buy_token: new.buy_token,
			recipient_address: new.recipient_address,
			refund_address: new.refund_address,
			status: SwapStatus::PendingDeposit,
			created_at: now,
			expires_at: new.expires_at,
			updated_at: now,
			deposit_tx_hash: None,
			deposit_amount: None,
			cow_order_uid: None,
			order_status: None,
			settlement_tx_hash: None,
			actual_buy_amount: None,
			failure_reason: None,
			refund_tx_hash: None,
			refund_amount: None,
		};
		self.swaps.write().await.insert(swap.swap_id, swap.clone());
		Ok(swap)
	}

	async fn by_id(&self, swap_id: Uuid) -> Result<Option<Swap>, StoreError> {
		Ok(self.swaps.read().await.get(&swap_id).cloned())
	}

	async fn by_vault(&self, vault_address: Address) -> Result<Option<Swap>, StoreError> {
		Ok(self
			.swaps
			.read()
			.await
			.values()
			.find(|s| s.vault_address == vault_address)
			.cloned())
	}

	async fn pending_by_chain(&self, chain: SupportedChain) -> Result<Vec<Swap>, StoreError> {
		let now = Utc::now();
		let mut pending: Vec<Swap> = self
			.swaps
			.read()
			.await
			.values()
			.filter(|s| {
				s.chain == chain && s.status == SwapStatus::PendingDeposit && s.expires_at > now
			})
			.cloned()
			.collect();
		pending.sort_by_key(|s| s.created_at);
		Ok(pending)
	}

	async fn executing(&self) -> Result<Vec<Swap>, StoreError> {
		let mut executing: Vec<Swap> = self
			.swaps
			.read()
			.await
			.values()
			.filter(|s| s.status == SwapStatus::Executing)
			.cloned()
			.collect();
		executing.sort_by_key(|s| s.created_at);
		Ok(executing)
	}

	async fn record_deposit(
		&self,
		swap_id: Uuid,
		deposit_tx_hash: Option<String>,
		amount: U256,
	) -> Result<bool, StoreError> {
		Ok(self
			.gated_update(swap_id, SwapStatus::PendingDeposit, |swap| {
				swap.deposit_tx_hash = deposit_tx_hash;
				swap.deposit_amount = Some(amount);
			})
			.await)
	}

	async fn mark_executing(&self, swap_id: Uuid) -> Result<bool, StoreError> {
		Ok(self
			.gated_update(swap_id, SwapStatus::PendingDeposit, |swap| {
				swap.status = SwapStatus::Executing;
			})
			.await)
	}

	async fn save_order_uid(&self, swap_id: Uuid, uid: &OrderUid) -> Result<bool, StoreError> {
		let uid = *uid;
		Ok(self
			.gated_update(swap_id, SwapStatus::Executing, |swap| {
				swap.cow_order_uid = Some(uid);
				swap.order_status = Some(OrderStatus::Open);
			})
			.await)
	}

	async fn mark_failed(&self, swap_id: Uuid, reason: &str) -> Result<bool, StoreError> {
		let reason = reason.to_string();
		Ok(self
			.gated_update(swap_id, SwapStatus::Executing, |swap| {
				swap.status = SwapStatus::Failed;
				swap.failure_reason = Some(reason);
			})
			.await)
	}

	async fn mark_needs_refund(&self, swap_id: Uuid, reason: &str) -> Result<bool, StoreError> {
		let reason = reason.to_string();
		Ok(self
			.gated_update(swap_id, SwapStatus::Executing, |swap| {
				swap.status = SwapStatus::RefundPending;
				swap.failure_reason = Some(reason);
			})
			.await)
	}

	async fn update_order_status(
		&self,
		swap_id: Uuid,
		order_status: OrderStatus,
		settlement_tx_hash: Option<String>,
		actual_buy_amount: Option<U256>,
	) -> Result<bool, StoreError> {
		Ok(self
			.gated_update(swap_id, SwapStatus::Executing, |swap| match order_status {
				OrderStatus::Fulfilled => {
					swap.status = SwapStatus::Complete;
					swap.order_status = Some(OrderStatus::Fulfilled);
					swap.settlement_tx_hash = settlement_tx_hash;
					swap.actual_buy_amount = actual_buy_amount;
				},
				OrderStatus::Expired => {
					swap.status = SwapStatus::RefundPending;
					swap.order_status = Some(OrderStatus::Expired);
					swap.failure_reason = Some(REASON_ORDER_EXPIRED.to_string());
				},
				OrderStatus::Cancelled => {
					swap.status = SwapStatus::RefundPending;
					swap.order_status = Some(OrderStatus::Cancelled);
					swap.failure_reason = Some(REASON_ORDER_CANCELLED.to_string());
				},
				OrderStatus::Open | OrderStatus::PresignaturePending => {
					swap.order_status = Some(order_status);
				},
			})
			.await)
	}

	async fn expire_overdue(&self) -> Result<u64, StoreError> {
		let now = Utc::now();
		let mut swaps = self.swaps.write().await;
		let mut moved = 0;
		for swap in swaps.values_mut() {
			if swap.status == SwapStatus::PendingDeposit && swap.expires_at < now {
				swap.status = SwapStatus::Expired;
				swap.updated_at = now;
				moved += 1;
			}
		}
		Ok(moved)
	}

	async fn counts_by_status_and_chain(&self) -> Result<Vec<StatusCount>, StoreError> {
		let mut grouped: HashMap<(SupportedChain, SwapStatus), u64> = HashMap::new();
		for swap in self.swaps.read().await.values() {
			*grouped.entry((swap.chain, swap.status)).or_default() += 1;
		}
		Ok(grouped
			.into_iter()
			.map(|((chain, status), count)| StatusCount {
				chain,
				status,
				count,
			})
			.collect())
	}

	async fn health_check(&self) -> Result<(), StoreError> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, b256, B256};
	use chrono::Duration;

	fn new_swap(chain: SupportedChain, expires_in_secs: i64) -> NewSwap {
		NewSwap {
			swap_id: Uuid::now_v7(),
			chain,
			vault_address: Address::random(),
			vault_salt: B256::random(),
			sell_token: swap_types::Token::Erc20 {
				address: swap_types::CBBTC,
			},
			buy_token: swap_types::Token::Ether,
			recipient_address: address!("1111111111111111111111111111111111111111"),
			refund_address: address!("2222222222222222222222222222222222222222"),
			expires_at: Utc::now() + Duration::seconds(expires_in_secs),
		}
	}

	fn test_uid() -> OrderUid {
		OrderUid::new(
			b256!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
			address!("1234567890123456789012345678901234567890"),
			1_700_000_000,
		)
	}

	#[tokio::test]
	async fn test_create_and_lookups() {
		let store = MemoryStore::new();
		let created = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();

		assert_eq!(created.status, SwapStatus::PendingDeposit);
		let by_id = store.by_id(created.swap_id).await.unwrap().unwrap();
		assert_eq!(by_id, created);
		let by_vault = store.by_vault(created.vault_address).await.unwrap().unwrap();
		assert_eq!(by_vault.swap_id, created.swap_id);
		assert!(store.by_id(Uuid::now_v7()).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_pending_by_chain_excludes_expired_and_other_chains() {
		let store = MemoryStore::new();
		let live = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();
		store
			.create(new_swap(SupportedChain::Base, -1))
			.await
			.unwrap();
		store
			.create(new_swap(SupportedChain::Ethereum, 3600))
			.await
			.unwrap();

		let pending = store.pending_by_chain(SupportedChain::Base).await.unwrap();
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].swap_id, live.swap_id);
	}

	#[tokio::test]
	async fn test_mark_executing_is_single_shot() {
		let store = MemoryStore::new();
		let swap = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();

		assert!(store.mark_executing(swap.swap_id).await.unwrap());
		// The losing tick of a duplicate dispatch affects zero rows.
		assert!(!store.mark_executing(swap.swap_id).await.unwrap());
	}

	#[tokio::test]
	async fn test_record_deposit_then_execute_then_save_uid() {
		let store = MemoryStore::new();
		let swap = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();

		assert!(store
			.record_deposit(swap.swap_id, None, U256::from(10_000u64))
			.await
			.unwrap());
		assert!(store.mark_executing(swap.swap_id).await.unwrap());
		assert!(store.save_order_uid(swap.swap_id, &test_uid()).await.unwrap());

		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::Executing);
		assert_eq!(loaded.deposit_amount, Some(U256::from(10_000u64)));
		assert_eq!(loaded.cow_order_uid, Some(test_uid()));
		assert_eq!(loaded.order_status, Some(OrderStatus::Open));
	}

	#[tokio::test]
	async fn test_save_uid_requires_executing() {
		let store = MemoryStore::new();
		let swap = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();
		assert!(!store.save_order_uid(swap.swap_id, &test_uid()).await.unwrap());
	}

	#[tokio::test]
	async fn test_fulfilled_completes_with_settlement_details() {
		let store = MemoryStore::new();
		let swap = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();
		store.mark_executing(swap.swap_id).await.unwrap();
		store.save_order_uid(swap.swap_id, &test_uid()).await.unwrap();

		assert!(store
			.update_order_status(
				swap.swap_id,
				OrderStatus::Fulfilled,
				Some("0xsettle".to_string()),
				Some(U256::from(9_950u64)),
			)
			.await
			.unwrap());

		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::Complete);
		assert_eq!(loaded.settlement_tx_hash.as_deref(), Some("0xsettle"));
		assert_eq!(loaded.actual_buy_amount, Some(U256::from(9_950u64)));
	}

	#[tokio::test]
	async fn test_expired_order_needs_refund() {
		let store = MemoryStore::new();
		let swap = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();
		store.mark_executing(swap.swap_id).await.unwrap();

		assert!(store
			.update_order_status(swap.swap_id, OrderStatus::Expired, None, None)
			.await
			.unwrap());

		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::RefundPending);
		assert_eq!(loaded.failure_reason.as_deref(), Some(REASON_ORDER_EXPIRED));
	}

	#[tokio::test]
	async fn test_open_observation_only_refreshes_substatus() {
		let store = MemoryStore::new();
		let swap = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();
		store.mark_executing(swap.swap_id).await.unwrap();

		assert!(store
			.update_order_status(swap.swap_id, OrderStatus::PresignaturePending, None, None)
			.await
			.unwrap());

		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::Executing);
		assert_eq!(loaded.order_status, Some(OrderStatus::PresignaturePending));
	}

	#[tokio::test]
	async fn test_terminal_states_never_advance() {
		let store = MemoryStore::new();
		let swap = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();
		store.mark_executing(swap.swap_id).await.unwrap();
		store.mark_failed(swap.swap_id, "orderbook rejected").await.unwrap();

		// Every further transition is a no-op against a terminal row.
		assert!(!store.mark_executing(swap.swap_id).await.unwrap());
		assert!(!store.save_order_uid(swap.swap_id, &test_uid()).await.unwrap());
		assert!(!store
			.update_order_status(swap.swap_id, OrderStatus::Fulfilled, None, None)
			.await
			.unwrap());
		assert!(!store.mark_needs_refund(swap.swap_id, "x").await.unwrap());

		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::Failed);
		assert_eq!(loaded.failure_reason.as_deref(), Some("orderbook rejected"));
	}

	#[tokio::test]
	async fn test_expire_overdue_moves_only_overdue_pending() {
		let store = MemoryStore::new();
		let overdue = store
			.create(new_swap(SupportedChain::Base, -1))
			.await
			.unwrap();
		let live = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();
		let executing = store
			.create(new_swap(SupportedChain::Ethereum, -1))
			.await
			.unwrap();
		store.mark_executing(executing.swap_id).await.unwrap();

		assert_eq!(store.expire_overdue().await.unwrap(), 1);

		assert_eq!(
			store.by_id(overdue.swap_id).await.unwrap().unwrap().status,
			SwapStatus::Expired
		);
		assert_eq!(
			store.by_id(live.swap_id).await.unwrap().unwrap().status,
			SwapStatus::PendingDeposit
		);
		assert_eq!(
			store.by_id(executing.swap_id).await.unwrap().unwrap().status,
			SwapStatus::Executing
		);
	}

	#[tokio::test]
	async fn test_counts_by_status_and_chain() {
		let store = MemoryStore::new();
		store.create(new_swap(SupportedChain::Base, 3600)).await.unwrap();
		store.create(new_swap(SupportedChain::Base, 3600)).await.unwrap();
		let eth = store
			.create(new_swap(SupportedChain::Ethereum, 3600))
			.await
			.unwrap();
		store.mark_executing(eth.swap_id).await.unwrap();

		let counts = store.counts_by_status_and_chain().await.unwrap();
		let get = |chain, status| {
			counts
				.iter()
				.find(|c| c.chain == chain && c.status == status)
				.map(|c| c.count)
		};
		assert_eq!(
			get(SupportedChain::Base, SwapStatus::PendingDeposit),
			Some(2)
		);
		assert_eq!(get(SupportedChain::Ethereum, SwapStatus::Executing), Some(1));
		assert_eq!(get(SupportedChain::Ethereum, SwapStatus::Complete), None);
	}

	#[tokio::test]
	async fn test_updated_at_advances_on_mutation() {
		let store = MemoryStore::new();
		let swap = store
			.create(new_swap(SupportedChain::Base, 3600))
			.await
			.unwrap();
		let before = swap.updated_at;
		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
		store.mark_executing(swap.swap_id).await.unwrap();
		let after = store.by_id(swap.swap_id).await.unwrap().unwrap().updated_at;
		assert!(after > before);
	}
}
