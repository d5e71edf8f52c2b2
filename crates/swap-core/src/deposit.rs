//! Per-chain deposit polling.
//!
//! One poller per supported chain, each on its own cadence. A tick loads
//! the chain's pending swaps, batch-reads vault balances through the
//! aggregator, and dispatches every funded swap to the orchestrator
//! without awaiting it: consecutive ticks may overlap in-flight
//! dispatches, and the store's status gating keeps that safe.

use crate::metrics;
use crate::orchestrator::LifecycleOrchestrator;
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use swap_chain::{ChainError, ChainReader};
use swap_store::{StoreError, SwapStore};
use swap_types::SupportedChain;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Errors that can fail a whole deposit tick.
#[derive(Debug, Error)]
pub enum DepositPollError {
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error("chain error: {0}")]
	Chain(#[from] ChainError),
}

/// Watches one chain's pending vaults for incoming balance.
pub struct DepositPoller {
	chain: SupportedChain,
	store: Arc<dyn SwapStore>,
	chain_reader: Arc<dyn ChainReader>,
	orchestrator: Arc<LifecycleOrchestrator>,
	interval: Duration,
}

impl DepositPoller {
	pub fn new(
		chain: SupportedChain,
		store: Arc<dyn SwapStore>,
		chain_reader: Arc<dyn ChainReader>,
		orchestrator: Arc<LifecycleOrchestrator>,
		interval: Duration,
	) -> Self {
		Self {
			chain,
			store,
			chain_reader,
			orchestrator,
			interval,
		}
	}

	/// Runs the polling loop until the shutdown token fires.
	///
	/// The token is observed at the top of each iteration; an in-progress
	/// tick finishes before the loop exits, and in-flight dispatches are
	/// left to complete on their own.
	pub async fn run(&self, shutdown: CancellationToken) {
		tracing::info!(
			chain = %self.chain,
			interval_secs = self.interval.as_secs(),
			"deposit poller started"
		);
		let mut ticker = tokio::time::interval(self.interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = shutdown.cancelled() => {
					tracing::info!(chain = %self.chain, "deposit poller stopping");
					break;
				}
				_ = ticker.tick() => {
					if let Err(e) = self.tick().await {
						metrics::POLLER_ERRORS.with_label_values(&["deposit"]).inc();
						tracing::warn!(chain = %self.chain, error = %e, "deposit tick failed");
					}
				}
			}
		}
	}

	/// One sweep: load pending swaps, batch-read balances, dispatch funded
	/// ones. Returns the handles of spawned dispatches; the loop drops
	/// them (detaching the tasks) so the poller never blocks on execution.
	pub async fn tick(&self) -> Result<Vec<JoinHandle<()>>, DepositPollError> {
		let pending = self.store.pending_by_chain(self.chain).await?;
		if pending.is_empty() {
			return Ok(Vec::new());
		}

		let vaults: Vec<Address> = pending.iter().map(|s| s.vault_address).collect();
		let balances = self.chain_reader.cbbtc_balances(&vaults).await?;

		let mut dispatched = Vec::new();
		for (swap, balance) in pending.into_iter().zip(balances) {
			if balance > U256::ZERO {
				metrics::DEPOSITS_DETECTED.inc();
				let orchestrator = self.orchestrator.clone();
				dispatched.push(tokio::spawn(async move {
					orchestrator.execute(swap, balance).await;
				}));
			}
		}
		Ok(dispatched)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use chrono::{Duration as ChronoDuration, Utc};
	use std::collections::HashMap;
	use swap_chain::MockChainReader;
	use swap_orderbook::{MockOrderbook, Quote, SlippageOracle};
	use swap_store::MemoryStore;
	use swap_types::{NewSwap, OrderUid, SwapStatus, Token, CBBTC};
	use swap_vault::KeyVault;
	use uuid::Uuid;

	const TEST_MASTER_KEY: &str =
		"ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	async fn seed_swap(store: &MemoryStore, vault: &KeyVault) -> swap_types::Swap {
		let minted = vault.mint().unwrap();
		store
			.create(NewSwap {
				swap_id: Uuid::now_v7(),
				chain: SupportedChain::Base,
				vault_address: minted.address(),
				vault_salt: minted.salt(),
				sell_token: Token::Erc20 { address: CBBTC },
				buy_token: Token::Ether,
				recipient_address: address!("1111111111111111111111111111111111111111"),
				refund_address: address!("2222222222222222222222222222222222222222"),
				expires_at: Utc::now() + ChronoDuration::hours(1),
			})
			.await
			.unwrap()
	}

	fn orchestrator_with(
		store: Arc<MemoryStore>,
		vault: Arc<KeyVault>,
		orderbook: MockOrderbook,
		reader: Arc<dyn ChainReader>,
	) -> Arc<LifecycleOrchestrator> {
		let mut readers: HashMap<SupportedChain, Arc<dyn ChainReader>> = HashMap::new();
		readers.insert(SupportedChain::Base, reader);
		Arc::new(LifecycleOrchestrator::new(
			store,
			vault,
			Arc::new(orderbook),
			Arc::new(SlippageOracle::new(None, Duration::from_secs(1))),
			readers,
		))
	}

	#[tokio::test]
	async fn test_tick_dispatches_only_funded_swaps() {
		let vault = Arc::new(KeyVault::from_hex(TEST_MASTER_KEY).unwrap());
		let store = Arc::new(MemoryStore::new());
		let funded = seed_swap(&store, &vault).await;
		let unfunded = seed_swap(&store, &vault).await;

		let funded_vault = funded.vault_address;
		let mut reader = MockChainReader::new();
		reader
			.expect_permit_nonce()
			.returning(|_| Box::pin(async { Ok(U256::ZERO) }));
		reader.expect_cbbtc_balances().returning(move |vaults| {
			Box::pin(async move {
				Ok(vaults
					.iter()
					.map(|v| {
						if *v == funded_vault {
							U256::from(10_000u64)
						} else {
							U256::ZERO
						}
					})
					.collect())
			})
		});
		let reader: Arc<dyn ChainReader> = Arc::new(reader);

		let mut orderbook = MockOrderbook::new();
		orderbook
			.expect_upload_app_data()
			.times(1)
			.returning(|_, _, _| Box::pin(async { Ok(()) }));
		orderbook.expect_quote().times(1).returning(|_, _, _, _, _| {
			Box::pin(async {
				Ok(Quote {
					quote_id: None,
					sell_amount: U256::from(9_900u64),
					buy_amount: U256::from(123_456u64),
					fee_amount: U256::from(100u64),
					valid_to: 1_700_000_000,
				})
			})
		});
		orderbook.expect_submit_order().times(1).returning(|_, _| {
			Box::pin(async {
				Ok(OrderUid::new(
					alloy_primitives::B256::repeat_byte(0xaa),
					address!("1234567890123456789012345678901234567890"),
					1_700_000_000,
				))
			})
		});

		let orchestrator =
			orchestrator_with(store.clone(), vault, orderbook, reader.clone());
		let poller = DepositPoller::new(
			SupportedChain::Base,
			store.clone(),
			reader,
			orchestrator,
			Duration::from_secs(10),
		);

		let handles = poller.tick().await.unwrap();
		assert_eq!(handles.len(), 1);
		for handle in handles {
			handle.await.unwrap();
		}

		assert_eq!(
			store.by_id(funded.swap_id).await.unwrap().unwrap().status,
			SwapStatus::Executing
		);
		assert_eq!(
			store.by_id(unfunded.swap_id).await.unwrap().unwrap().status,
			SwapStatus::PendingDeposit
		);
	}

	#[tokio::test]
	async fn test_tick_with_no_pending_swaps_skips_chain_read() {
		let store = Arc::new(MemoryStore::new());
		let vault = Arc::new(KeyVault::from_hex(TEST_MASTER_KEY).unwrap());

		let mut reader = MockChainReader::new();
		reader.expect_cbbtc_balances().times(0);
		let reader: Arc<dyn ChainReader> = Arc::new(reader);

		let orchestrator = orchestrator_with(
			store.clone(),
			vault,
			MockOrderbook::new(),
			reader.clone(),
		);
		let poller = DepositPoller::new(
			SupportedChain::Base,
			store,
			reader,
			orchestrator,
			Duration::from_secs(10),
		);

		assert!(poller.tick().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_whole_batch_rpc_failure_propagates() {
		let vault = Arc::new(KeyVault::from_hex(TEST_MASTER_KEY).unwrap());
		let store = Arc::new(MemoryStore::new());
		seed_swap(&store, &vault).await;

		let mut reader = MockChainReader::new();
		reader.expect_cbbtc_balances().returning(|_| {
			Box::pin(async { Err(ChainError::Rpc("provider down".to_string())) })
		});
		let reader: Arc<dyn ChainReader> = Arc::new(reader);

		let orchestrator = orchestrator_with(
			store.clone(),
			vault,
			MockOrderbook::new(),
			reader.clone(),
		);
		let poller = DepositPoller::new(
			SupportedChain::Base,
			store,
			reader,
			orchestrator,
			Duration::from_secs(10),
		);

		assert!(matches!(
			poller.tick().await.unwrap_err(),
			DepositPollError::Chain(_)
		));
	}

	#[tokio::test]
	async fn test_run_stops_on_shutdown() {
		let store = Arc::new(MemoryStore::new());
		let vault = Arc::new(KeyVault::from_hex(TEST_MASTER_KEY).unwrap());
		let reader: Arc<dyn ChainReader> = Arc::new(MockChainReader::new());
		let orchestrator = orchestrator_with(
			store.clone(),
			vault,
			MockOrderbook::new(),
			reader.clone(),
		);
		let poller = DepositPoller::new(
			SupportedChain::Base,
			store,
			reader,
			orchestrator,
			Duration::from_secs(3600),
		);

		let token = CancellationToken::new();
		let shutdown = token.clone();
		let handle = tokio::spawn(async move { poller.run(shutdown).await });

		token.cancel();
		tokio::time::timeout(Duration::from_secs(1), handle)
			.await
			.expect("poller did not observe shutdown")
			.unwrap();
	}
}
