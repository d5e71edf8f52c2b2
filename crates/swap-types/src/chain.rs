//! Supported chains and their per-chain parameters.
//!
//! The coordinator supports a small closed set of EVM chains. Everything
//! that varies per chain (orderbook network slug, deposit polling cadence)
//! hangs off this enum so call sites exhaust the variants.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// A chain the coordinator can watch deposits on and submit orders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedChain {
	/// Ethereum mainnet (chain id 1).
	Ethereum,
	/// Base (chain id 8453).
	Base,
}

impl SupportedChain {
	/// Every supported chain, in deposit-poller startup order.
	pub const ALL: [SupportedChain; 2] = [SupportedChain::Ethereum, SupportedChain::Base];

	/// The numeric EVM chain id.
	pub fn id(&self) -> u64 {
		match self {
			SupportedChain::Ethereum => 1,
			SupportedChain::Base => 8453,
		}
	}

	/// Resolves a numeric chain id, rejecting unsupported chains.
	pub fn from_id(id: u64) -> Option<Self> {
		match id {
			1 => Some(SupportedChain::Ethereum),
			8453 => Some(SupportedChain::Base),
			_ => None,
		}
	}

	/// Network path segment of the orderbook API for this chain.
	pub fn orderbook_slug(&self) -> &'static str {
		match self {
			SupportedChain::Ethereum => "mainnet",
			SupportedChain::Base => "base",
		}
	}

	/// How often the deposit poller sweeps pending vaults on this chain.
	///
	/// Roughly two block times: deposits are final enough after one block
	/// and the aggregator keeps each sweep to a single RPC round trip.
	pub fn polling_interval(&self) -> Duration {
		match self {
			SupportedChain::Ethereum => Duration::from_secs(24),
			SupportedChain::Base => Duration::from_secs(10),
		}
	}

	/// Human-readable chain name for logs.
	pub fn name(&self) -> &'static str {
		match self {
			SupportedChain::Ethereum => "ethereum",
			SupportedChain::Base => "base",
		}
	}
}

impl fmt::Display for SupportedChain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.name())
	}
}

// On the wire a chain is always its numeric id.
impl Serialize for SupportedChain {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(self.id())
	}
}

impl<'de> Deserialize<'de> for SupportedChain {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let id = u64::deserialize(deserializer)?;
		SupportedChain::from_id(id)
			.ok_or_else(|| de::Error::custom(format!("unsupported chain id: {}", id)))
	}
}
