//! Settlement tracking.
//!
//! One process-wide loop. Each tick expires overdue pending swaps,
//! refreshes the status gauges, then advances every `executing` swap by
//! asking the orderbook where its order stands. Per-swap failures are
//! logged and counted without stopping the tick.

use crate::metrics;
use alloy_primitives::U256;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use swap_orderbook::{Orderbook, OrderbookError};
use swap_store::{StoreError, SwapStore};
use swap_types::{OrderStatus, Swap};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Reason recorded for rows stuck in `executing` with no order UID.
pub const REASON_SUBMISSION_INCOMPLETE: &str = "order submission did not complete";

/// Errors that can occur while advancing one executing swap.
#[derive(Debug, Error)]
pub enum AdvanceError {
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error("orderbook error: {0}")]
	Orderbook(#[from] OrderbookError),
}

/// Tracks submitted orders to a terminal state and expires stale swaps.
pub struct SettlementPoller {
	store: Arc<dyn SwapStore>,
	orderbook: Arc<dyn Orderbook>,
	interval: Duration,
	/// How long an `executing` row may sit without an order UID before it
	/// is written off as a failed submission.
	stuck_grace: ChronoDuration,
}

impl SettlementPoller {
	pub fn new(
		store: Arc<dyn SwapStore>,
		orderbook: Arc<dyn Orderbook>,
		interval: Duration,
		stuck_grace: Duration,
	) -> Self {
		Self {
			store,
			orderbook,
			interval,
			stuck_grace: ChronoDuration::from_std(stuck_grace)
				.unwrap_or_else(|_| ChronoDuration::seconds(600)),
		}
	}

	/// Runs the polling loop until the shutdown token fires.
	pub async fn run(&self, shutdown: CancellationToken) {
		tracing::info!(
			interval_secs = self.interval.as_secs(),
			"settlement poller started"
		);
		let mut ticker = tokio::time::interval(self.interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = shutdown.cancelled() => {
					tracing::info!("settlement poller stopping");
					break;
				}
				_ = ticker.tick() => {
					self.tick().await;
				}
			}
		}
	}

	/// One sweep: expire, refresh gauges, advance executing swaps.
	/// Never fails; every error is logged and counted.
	pub async fn tick(&self) {
		match self.store.expire_overdue().await {
			Ok(0) => {},
			Ok(count) => tracing::info!(count, "expired overdue swaps"),
			Err(e) => {
				metrics::POLLER_ERRORS
					.with_label_values(&["settlement"])
					.inc();
				tracing::warn!(error = %e, "expiry sweep failed");
			},
		}

		match self.store.counts_by_status_and_chain().await {
			Ok(counts) => metrics::refresh_status_gauges(&counts),
			Err(e) => {
				metrics::POLLER_ERRORS
					.with_label_values(&["settlement"])
					.inc();
				tracing::warn!(error = %e, "gauge refresh failed");
			},
		}

		let executing = match self.store.executing().await {
			Ok(swaps) => swaps,
			Err(e) => {
				metrics::POLLER_ERRORS
					.with_label_values(&["settlement"])
					.inc();
				tracing::warn!(error = %e, "executing sweep failed");
				return;
			},
		};

		for swap in executing {
			let swap_id = swap.swap_id;
			if let Err(e) = self.advance(&swap).await {
				metrics::POLLER_ERRORS
					.with_label_values(&["settlement"])
					.inc();
				tracing::warn!(%swap_id, error = %e, "failed to advance swap");
			}
		}
	}

	async fn advance(&self, swap: &Swap) -> Result<(), AdvanceError> {
		let Some(uid) = swap.cow_order_uid else {
			// Submission died between mark_executing and save_order_uid.
			// Give in-flight submissions a grace window, then write the
			// row off; the deposit stays in the vault for recovery.
			if Utc::now() - swap.updated_at > self.stuck_grace {
				tracing::warn!(
					swap_id = %swap.swap_id,
					"executing swap has no order uid past grace, marking failed"
				);
				self.store
					.mark_failed(swap.swap_id, REASON_SUBMISSION_INCOMPLETE)
					.await?;
			}
			return Ok(());
		};

		let state = self.orderbook.order_status(swap.chain, &uid).await?;
		match state.status {
			OrderStatus::Fulfilled => {
				let trades = self.orderbook.trades(swap.chain, &uid).await?;
				let Some(trade) = trades.first() else {
					// Fulfilled but the settlement is not indexed yet;
					// leave the row for the next tick.
					tracing::debug!(swap_id = %swap.swap_id, "fulfilled order has no settled trade yet");
					return Ok(());
				};
				let buy_amount = state
					.executed_buy_amount
					.filter(|amount| *amount > U256::ZERO)
					.unwrap_or(trade.buy_amount);
				if self
					.store
					.update_order_status(
						swap.swap_id,
						OrderStatus::Fulfilled,
						Some(trade.tx_hash.clone()),
						Some(buy_amount),
					)
					.await?
				{
					let elapsed = (Utc::now() - swap.created_at).num_seconds().max(0);
					metrics::COMPLETION_SECONDS.observe(elapsed as f64);
					tracing::info!(
						swap_id = %swap.swap_id,
						tx_hash = %trade.tx_hash,
						buy_amount = %buy_amount,
						elapsed_secs = elapsed,
						"swap complete"
					);
				}
			},
			OrderStatus::Expired | OrderStatus::Cancelled => {
				self.store
					.update_order_status(swap.swap_id, state.status, None, None)
					.await?;
				tracing::warn!(
					swap_id = %swap.swap_id,
					order_status = %state.status,
					"order terminated without fill, refund pending"
				);
			},
			OrderStatus::Open | OrderStatus::PresignaturePending => {
				// Persist the sub-status only when it actually moved.
				if swap.order_status != Some(state.status) {
					self.store
						.update_order_status(swap.swap_id, state.status, None, None)
						.await?;
				}
			},
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, B256};
	use chrono::Duration as ChronoDuration;
	use swap_orderbook::{MockOrderbook, OrderState, Trade};
	use swap_store::{MemoryStore, REASON_ORDER_EXPIRED};
	use swap_types::{NewSwap, OrderUid, SupportedChain, SwapStatus, Token, CBBTC};
	use uuid::Uuid;

	fn test_uid() -> OrderUid {
		OrderUid::new(
			B256::repeat_byte(0xaa),
			address!("1234567890123456789012345678901234567890"),
			1_700_000_000,
		)
	}

	async fn seed_executing(store: &MemoryStore, with_uid: bool) -> Swap {
		let swap = store
			.create(NewSwap {
				swap_id: Uuid::now_v7(),
				chain: SupportedChain::Base,
				vault_address: alloy_primitives::Address::random(),
				vault_salt: B256::random(),
				sell_token: Token::Erc20 { address: CBBTC },
				buy_token: Token::Ether,
				recipient_address: address!("1111111111111111111111111111111111111111"),
				refund_address: address!("2222222222222222222222222222222222222222"),
				expires_at: Utc::now() + ChronoDuration::hours(1),
			})
			.await
			.unwrap();
		store.mark_executing(swap.swap_id).await.unwrap();
		if with_uid {
			store.save_order_uid(swap.swap_id, &test_uid()).await.unwrap();
		}
		store.by_id(swap.swap_id).await.unwrap().unwrap()
	}

	fn poller(store: Arc<MemoryStore>, orderbook: MockOrderbook) -> SettlementPoller {
		SettlementPoller::new(
			store,
			Arc::new(orderbook),
			Duration::from_secs(30),
			Duration::from_secs(600),
		)
	}

	#[tokio::test]
	async fn test_fulfilled_order_completes_swap() {
		let store = Arc::new(MemoryStore::new());
		let swap = seed_executing(&store, true).await;

		let mut orderbook = MockOrderbook::new();
		orderbook.expect_order_status().returning(|_, _| {
			Box::pin(async {
				Ok(OrderState {
					status: OrderStatus::Fulfilled,
					executed_buy_amount: Some(U256::from(9_951u64)),
					executed_sell_amount: Some(U256::from(10_000u64)),
				})
			})
		});
		orderbook.expect_trades().returning(|_, _| {
			Box::pin(async {
				Ok(vec![Trade {
					tx_hash: "0xsettlement".to_string(),
					buy_amount: U256::from(9_951u64),
					sell_amount: U256::from(10_000u64),
					block_number: 100,
				}])
			})
		});

		poller(store.clone(), orderbook).tick().await;

		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::Complete);
		assert_eq!(loaded.settlement_tx_hash.as_deref(), Some("0xsettlement"));
		assert_eq!(loaded.actual_buy_amount, Some(U256::from(9_951u64)));
	}

	#[tokio::test]
	async fn test_fulfilled_without_indexed_trade_waits() {
		let store = Arc::new(MemoryStore::new());
		let swap = seed_executing(&store, true).await;

		let mut orderbook = MockOrderbook::new();
		orderbook.expect_order_status().returning(|_, _| {
			Box::pin(async {
				Ok(OrderState {
					status: OrderStatus::Fulfilled,
					executed_buy_amount: Some(U256::from(9_951u64)),
					executed_sell_amount: None,
				})
			})
		});
		orderbook
			.expect_trades()
			.returning(|_, _| Box::pin(async { Ok(vec![]) }));

		poller(store.clone(), orderbook).tick().await;

		// Still executing; completeness requires a settlement tx hash.
		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::Executing);
	}

	#[tokio::test]
	async fn test_expired_order_moves_to_refund_pending() {
		let store = Arc::new(MemoryStore::new());
		let swap = seed_executing(&store, true).await;

		let mut orderbook = MockOrderbook::new();
		orderbook.expect_order_status().returning(|_, _| {
			Box::pin(async {
				Ok(OrderState {
					status: OrderStatus::Expired,
					executed_buy_amount: None,
					executed_sell_amount: None,
				})
			})
		});

		poller(store.clone(), orderbook).tick().await;

		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::RefundPending);
		assert_eq!(loaded.failure_reason.as_deref(), Some(REASON_ORDER_EXPIRED));
	}

	#[tokio::test]
	async fn test_open_order_only_refreshes_substatus() {
		let store = Arc::new(MemoryStore::new());
		let swap = seed_executing(&store, true).await;

		let mut orderbook = MockOrderbook::new();
		orderbook.expect_order_status().returning(|_, _| {
			Box::pin(async {
				Ok(OrderState {
					status: OrderStatus::Open,
					executed_buy_amount: None,
					executed_sell_amount: None,
				})
			})
		});

		poller(store.clone(), orderbook).tick().await;

		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::Executing);
		assert_eq!(loaded.order_status, Some(OrderStatus::Open));
	}

	#[tokio::test]
	async fn test_tick_expires_overdue_pending_swaps() {
		let store = Arc::new(MemoryStore::new());
		let overdue = store
			.create(NewSwap {
				swap_id: Uuid::now_v7(),
				chain: SupportedChain::Ethereum,
				vault_address: alloy_primitives::Address::random(),
				vault_salt: B256::random(),
				sell_token: Token::Erc20 { address: CBBTC },
				buy_token: Token::Ether,
				recipient_address: address!("1111111111111111111111111111111111111111"),
				refund_address: address!("2222222222222222222222222222222222222222"),
				// Already past expiry when the tick runs.
				expires_at: Utc::now() - ChronoDuration::milliseconds(1),
			})
			.await
			.unwrap();

		poller(store.clone(), MockOrderbook::new()).tick().await;

		assert_eq!(
			store.by_id(overdue.swap_id).await.unwrap().unwrap().status,
			SwapStatus::Expired
		);
	}

	#[tokio::test]
	async fn test_uidless_row_within_grace_is_left_alone() {
		let store = Arc::new(MemoryStore::new());
		let swap = seed_executing(&store, false).await;

		poller(store.clone(), MockOrderbook::new()).tick().await;

		assert_eq!(
			store.by_id(swap.swap_id).await.unwrap().unwrap().status,
			SwapStatus::Executing
		);
	}

	#[tokio::test]
	async fn test_uidless_row_past_grace_is_failed() {
		let store = Arc::new(MemoryStore::new());
		let swap = seed_executing(&store, false).await;

		let poller = SettlementPoller::new(
			store.clone(),
			Arc::new(MockOrderbook::new()),
			Duration::from_secs(30),
			Duration::ZERO,
		);
		// updated_at is in the past relative to a zero grace window.
		tokio::time::sleep(Duration::from_millis(5)).await;
		poller.tick().await;

		let loaded = store.by_id(swap.swap_id).await.unwrap().unwrap();
		assert_eq!(loaded.status, SwapStatus::Failed);
		assert_eq!(
			loaded.failure_reason.as_deref(),
			Some(REASON_SUBMISSION_INCOMPLETE)
		);
	}

	#[tokio::test]
	async fn test_per_swap_failure_does_not_stop_the_tick() {
		use std::sync::atomic::{AtomicUsize, Ordering};

		let store = Arc::new(MemoryStore::new());
		// Visited in creation order: the first lookup fails, the second
		// terminates; the tick must still advance the second row.
		let failing = seed_executing(&store, true).await;
		let expiring = seed_executing(&store, true).await;

		let calls = AtomicUsize::new(0);
		let mut orderbook = MockOrderbook::new();
		orderbook.expect_order_status().returning(move |_, _| {
			Box::pin(async move {
				if calls.fetch_add(1, Ordering::SeqCst) == 0 {
					Err(OrderbookError::Network("timeout".to_string()))
				} else {
					Ok(OrderState {
						status: OrderStatus::Expired,
						executed_buy_amount: None,
						executed_sell_amount: None,
					})
				}
			})
		});

		poller(store.clone(), orderbook).tick().await;

		assert_eq!(
			store.by_id(failing.swap_id).await.unwrap().unwrap().status,
			SwapStatus::Executing
		);
		assert_eq!(
			store.by_id(expiring.swap_id).await.unwrap().unwrap().status,
			SwapStatus::RefundPending
		);
	}
}
