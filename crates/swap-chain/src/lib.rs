//! On-chain read access for the swap coordinator.
//!
//! Everything the coordinator needs from a chain is read-only: CBBTC
//! balances of vault addresses (batched through the Multicall3 aggregator)
//! and the EIP-2612 nonce of a vault on the sell token. Transactions are
//! never submitted from here; settlement happens through the orderbook.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use thiserror::Error;

pub mod provider;

/// Re-export implementations
pub mod implementations {
	pub mod multicall;
}

pub use implementations::multicall::MulticallReader;
pub use provider::create_http_provider;

/// Errors that can occur during chain reads.
#[derive(Debug, Error)]
pub enum ChainError {
	/// Provider construction failed (bad URL, transport setup).
	#[error("provider error: {0}")]
	Provider(String),
	/// The RPC call itself failed; the caller skips this tick.
	#[error("rpc error: {0}")]
	Rpc(String),
	/// The RPC response did not decode into the expected shape.
	#[error("decode error: {0}")]
	Decode(String),
}

/// Read-only view of one chain.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait ChainReader: Send + Sync {
	/// CBBTC balance of each vault address, in input order.
	///
	/// A failed cell inside an otherwise successful batch reports as zero;
	/// a whole-batch failure is an error.
	async fn cbbtc_balances(&self, vaults: &[Address]) -> Result<Vec<U256>, ChainError>;

	/// Current EIP-2612 `nonces(owner)` on the sell token.
	async fn permit_nonce(&self, owner: Address) -> Result<U256, ChainError>;
}
