//! Environment-based configuration.
//!
//! Everything the binary needs comes from environment variables; there is
//! no configuration file. Missing required variables are fatal at startup.

use std::path::PathBuf;
use std::time::Duration;
use swap_types::SupportedChain;
use thiserror::Error;

/// Errors that can occur while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("missing required environment variable {0}")]
	Missing(&'static str),
	#[error("invalid value for {0}: {1}")]
	Invalid(&'static str, String),
}

/// Optional Grafana Cloud push settings.
///
/// The push exporter itself runs out of process; the service only carries
/// its contract and exposes `/metrics` for scraping.
#[derive(Debug, Clone)]
pub struct GrafanaConfig {
	pub url: String,
	pub username: String,
	pub api_key: String,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
	/// Transactional store connection string.
	pub database_url: String,
	pub eth_rpc_url: String,
	pub base_rpc_url: String,
	/// Path to the 32-byte master key file (64 hex chars, optional 0x).
	pub server_key_path: PathBuf,
	/// HTTP listen port.
	pub port: u16,
	/// How long a fresh swap waits for its deposit.
	pub swap_ttl: Duration,
	/// Timeout applied to outbound HTTP calls.
	pub http_timeout: Duration,
	/// Orderbook API base URL (scheme and host).
	pub orderbook_url: String,
	/// Slippage oracle endpoint; absent means the default tolerance.
	pub slippage_endpoint: Option<String>,
	/// Settlement poller period.
	pub settlement_interval: Duration,
	/// Grace window before an executing swap without an order UID is
	/// written off as a failed submission.
	pub stuck_grace: Duration,
	pub db_max_connections: u32,
	pub grafana: Option<GrafanaConfig>,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
	std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_u64(name: &'static str, value: String) -> Result<u64, ConfigError> {
	value
		.parse()
		.map_err(|_| ConfigError::Invalid(name, value))
}

fn duration_secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
	match optional(name) {
		Some(raw) => Ok(Duration::from_secs(parse_u64(name, raw)?)),
		None => Ok(Duration::from_secs(default)),
	}
}

impl Config {
	/// Reads configuration from the environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		let port = match optional("PORT") {
			Some(raw) => raw
				.parse()
				.map_err(|_| ConfigError::Invalid("PORT", raw))?,
			None => 3000,
		};

		let db_max_connections = match optional("DATABASE_MAX_CONNECTIONS") {
			Some(raw) => parse_u64("DATABASE_MAX_CONNECTIONS", raw)? as u32,
			None => 10,
		};

		let grafana = match (
			optional("GRAFANA_CLOUD_URL"),
			optional("GRAFANA_CLOUD_USERNAME"),
			optional("GRAFANA_CLOUD_API_KEY"),
		) {
			(Some(url), Some(username), Some(api_key)) => Some(GrafanaConfig {
				url,
				username,
				api_key,
			}),
			(None, None, None) => None,
			_ => {
				return Err(ConfigError::Invalid(
					"GRAFANA_CLOUD_URL",
					"GRAFANA_CLOUD_URL, GRAFANA_CLOUD_USERNAME and GRAFANA_CLOUD_API_KEY \
					 must be set together"
						.to_string(),
				));
			},
		};

		Ok(Self {
			database_url: required("DATABASE_URL")?,
			eth_rpc_url: required("ETH_RPC_URL")?,
			base_rpc_url: required("BASE_RPC_URL")?,
			server_key_path: PathBuf::from(required("SERVER_KEY_PATH")?),
			port,
			swap_ttl: duration_secs("SWAP_TTL_SECS", 1800)?,
			http_timeout: duration_secs("HTTP_TIMEOUT_SECS", 30)?,
			orderbook_url: optional("ORDERBOOK_URL")
				.unwrap_or_else(|| "https://api.cow.fi".to_string()),
			slippage_endpoint: optional("SLIPPAGE_ORACLE_URL"),
			settlement_interval: duration_secs("SETTLEMENT_POLL_SECS", 30)?,
			stuck_grace: duration_secs("STUCK_GRACE_SECS", 600)?,
			db_max_connections,
			grafana,
		})
	}

	/// The RPC endpoint configured for a chain.
	pub fn rpc_url(&self, chain: SupportedChain) -> &str {
		match chain {
			SupportedChain::Ethereum => &self.eth_rpc_url,
			SupportedChain::Base => &self.base_rpc_url,
		}
	}
}
