//! Deposit-to-order execution pipeline.
//!
//! Once a deposit poller sees a funded vault it hands the swap here. The
//! orchestrator claims the swap through the status-gated store (so a
//! duplicate dispatch is a no-op), re-derives the vault key, builds the
//! permit pre-hook, takes a fresh executable quote against the actual
//! deposited balance, signs the order, submits it, and persists the UID.
//! Any failure after the claim moves the swap to `failed`; funds stay in
//! the vault for out-of-band recovery.

use crate::metrics;
use crate::permit::{PermitBuilder, PermitError};
use crate::signing::{build_sell_order, OrderSigner, SigningError};
use alloy_primitives::U256;
use std::collections::HashMap;
use std::sync::Arc;
use swap_chain::ChainReader;
use swap_orderbook::{Orderbook, OrderbookError, SlippageOracle};
use swap_store::{StoreError, SwapStore};
use swap_types::{current_timestamp, OrderUid, SupportedChain, Swap};
use swap_vault::{KeyVault, VaultError};
use thiserror::Error;

/// Errors that can occur while executing a funded swap.
///
/// Every variant after `mark_executing` ends up as the swap's
/// `failure_reason`, so messages are written for an operator reading the
/// row later.
#[derive(Debug, Error)]
pub enum ExecutionError {
	#[error("vault derivation failed: {0}")]
	Vault(#[from] VaultError),
	#[error("derived vault address does not match stored vault address")]
	VaultMismatch,
	#[error("no chain reader configured for {0}")]
	UnknownChain(SupportedChain),
	#[error("permit construction failed: {0}")]
	Permit(#[from] PermitError),
	#[error("quote failed: {0}")]
	Quote(#[source] OrderbookError),
	#[error("order submission failed: {0}")]
	Submit(#[from] SigningError),
	#[error("store error: {0}")]
	Store(#[from] StoreError),
}

/// Glues the vault, permit builder, order signer, and store into the
/// state machine transitions of a funded swap.
pub struct LifecycleOrchestrator {
	store: Arc<dyn SwapStore>,
	vault: Arc<KeyVault>,
	orderbook: Arc<dyn Orderbook>,
	slippage: Arc<SlippageOracle>,
	readers: HashMap<SupportedChain, Arc<dyn ChainReader>>,
}

impl LifecycleOrchestrator {
	pub fn new(
		store: Arc<dyn SwapStore>,
		vault: Arc<KeyVault>,
		orderbook: Arc<dyn Orderbook>,
		slippage: Arc<SlippageOracle>,
		readers: HashMap<SupportedChain, Arc<dyn ChainReader>>,
	) -> Self {
		Self {
			store,
			vault,
			orderbook,
			slippage,
			readers,
		}
	}

	/// Drives a funded swap from deposit detection to a submitted order.
	///
	/// Never returns an error: failures are persisted on the swap row and
	/// counted; the poller that spawned this call has already moved on.
	pub async fn execute(&self, swap: Swap, balance: U256) {
		let swap_id = swap.swap_id;

		match self.store.record_deposit(swap_id, None, balance).await {
			Ok(true) => {},
			Ok(false) => {
				// Another dispatch already claimed the row.
				tracing::debug!(%swap_id, "skipping duplicate deposit dispatch");
				return;
			},
			Err(e) => {
				tracing::error!(%swap_id, error = %e, "failed to record deposit");
				return;
			},
		}

		match self.store.mark_executing(swap_id).await {
			Ok(true) => {},
			Ok(false) => {
				tracing::debug!(%swap_id, "swap already executing, skipping");
				return;
			},
			Err(e) => {
				tracing::error!(%swap_id, error = %e, "failed to mark swap executing");
				return;
			},
		}

		tracing::info!(
			%swap_id,
			chain = %swap.chain,
			balance = %balance,
			"deposit detected, executing swap"
		);

		match self.submit_order_for(&swap, balance).await {
			Ok(uid) => {
				tracing::info!(%swap_id, order_uid = %uid, "order submitted");
			},
			Err(e) => {
				metrics::EXECUTION_FAILURES.inc();
				tracing::error!(%swap_id, error = %e, "swap execution failed");
				match self.store.mark_failed(swap_id, &e.to_string()).await {
					Ok(true) => {},
					Ok(false) => {
						tracing::warn!(%swap_id, "could not mark swap failed: row not executing")
					},
					Err(store_err) => {
						tracing::error!(%swap_id, error = %store_err, "failed to persist failure")
					},
				}
			},
		}
	}

	async fn submit_order_for(
		&self,
		swap: &Swap,
		balance: U256,
	) -> Result<OrderUid, ExecutionError> {
		let reader = self
			.readers
			.get(&swap.chain)
			.ok_or(ExecutionError::UnknownChain(swap.chain))?;

		let vault = self.vault.derive(swap.vault_salt)?;
		if vault.address() != swap.vault_address {
			// A different master key is loaded than the one that minted
			// this vault; signing would produce an unfillable order.
			return Err(ExecutionError::VaultMismatch);
		}

		let sell_token = swap.sell_token.orderbook_address();
		let buy_token = swap.buy_token.orderbook_address();

		let permit_builder =
			PermitBuilder::new(swap.chain, reader.clone(), self.slippage.clone());
		let artifacts = permit_builder.build(&vault, sell_token, buy_token).await?;

		// The quote taken at /quote time was advisory; the executable one
		// is against the balance that actually landed.
		let quote = self
			.orderbook
			.quote(swap.chain, sell_token, buy_token, balance, vault.address())
			.await
			.map_err(ExecutionError::Quote)?;

		let order = build_sell_order(
			&quote,
			artifacts.slippage_bps,
			sell_token,
			&swap.buy_token,
			swap.recipient_address,
			artifacts.app_data_hash,
			current_timestamp(),
		);

		let signer = OrderSigner::new(self.orderbook.clone());
		let uid = signer
			.sign_and_submit(swap.chain, &vault, &order, &artifacts.document, quote.quote_id)
			.await?;

		if !self.store.save_order_uid(swap.swap_id, &uid).await? {
			// The row left `executing` while the order was in flight; the
			// settlement sweep owns it now.
			tracing::warn!(swap_id = %swap.swap_id, order_uid = %uid, "order uid not persisted");
		}

		Ok(uid)
	}
}
