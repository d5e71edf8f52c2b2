//! Per-market slippage oracle.
//!
//! Looks up a slippage tolerance in basis points for a market and caches
//! it in-process for a short TTL. The oracle is advisory: any network or
//! parse error falls back to a conservative default instead of failing the
//! swap.

use alloy_primitives::{Address, U256};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use swap_types::{SupportedChain, DEFAULT_SLIPPAGE_BPS};
use tokio::sync::RwLock;

/// How long a cached market entry stays fresh.
const CACHE_TTL: Duration = Duration::from_secs(30);

/// Applies a slippage tolerance to a buy amount:
/// `buy_amount * (10_000 - bps) / 10_000`, exact integer arithmetic.
pub fn apply_to_buy_amount(buy_amount: U256, bps: u32) -> U256 {
	let denominator = U256::from(10_000u64);
	buy_amount * (denominator - U256::from(bps)) / denominator
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlippageApiResponse {
	slippage_bips: u32,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
	bps: u32,
	fetched_at: Instant,
}

/// Slippage oracle with a 30-second in-process cache.
pub struct SlippageOracle {
	client: reqwest::Client,
	/// Endpoint base; `None` disables lookups and always yields the default.
	endpoint: Option<String>,
	cache: RwLock<HashMap<String, CacheEntry>>,
}

impl SlippageOracle {
	pub fn new(endpoint: Option<String>, timeout: Duration) -> Self {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.expect("reqwest client construction with static options");
		Self {
			client,
			endpoint,
			cache: RwLock::new(HashMap::new()),
		}
	}

	/// Slippage tolerance in basis points for a market.
	///
	/// Cached per lower-cased `(chain, sell, buy)` tuple; never fails —
	/// errors yield [`DEFAULT_SLIPPAGE_BPS`].
	pub async fn slippage_bps(
		&self,
		chain: SupportedChain,
		sell_token: Address,
		buy_token: Address,
	) -> u32 {
		let key = format!("{}:{:#x}:{:#x}", chain.id(), sell_token, buy_token).to_lowercase();

		if let Some(entry) = self.cache.read().await.get(&key) {
			if entry.fetched_at.elapsed() < CACHE_TTL {
				return entry.bps;
			}
		}

		let bps = match self.fetch(chain, sell_token, buy_token).await {
			Ok(bps) => bps,
			Err(reason) => {
				tracing::debug!(market = %key, %reason, "slippage lookup failed, using default");
				DEFAULT_SLIPPAGE_BPS
			},
		};

		// Last writer wins; entries are idempotent per market.
		self.cache.write().await.insert(
			key,
			CacheEntry {
				bps,
				fetched_at: Instant::now(),
			},
		);
		bps
	}

	async fn fetch(
		&self,
		chain: SupportedChain,
		sell_token: Address,
		buy_token: Address,
	) -> Result<u32, String> {
		let endpoint = self.endpoint.as_deref().ok_or("no endpoint configured")?;
		let url = format!(
			"{}/slippage?chainId={}&sellToken={:#x}&buyToken={:#x}",
			endpoint.trim_end_matches('/'),
			chain.id(),
			sell_token,
			buy_token
		);
		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| e.to_string())?;
		if !response.status().is_success() {
			return Err(format!("status {}", response.status()));
		}
		let body: SlippageApiResponse = response.json().await.map_err(|e| e.to_string())?;
		Ok(body.slippage_bips)
	}
}
