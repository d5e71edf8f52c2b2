//! Swap coordinator service entry point.
//!
//! Boots the full lifecycle engine: loads configuration from the
//! environment, validates the master key, connects the store (applying
//! migrations), wires per-chain readers and the orderbook client into the
//! orchestrator, and runs the deposit pollers, the settlement poller, and
//! the HTTP API until interrupted.

use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use swap_chain::{create_http_provider, ChainReader, MulticallReader};
use swap_core::{DepositPoller, LifecycleOrchestrator, SettlementPoller};
use swap_orderbook::{HttpOrderbook, Orderbook, SlippageOracle};
use swap_service::{server, Config};
use swap_store::{PostgresStore, SwapStore};
use swap_types::{SupportedChain, CBBTC};
use swap_vault::KeyVault;
use tokio_util::sync::CancellationToken;

/// Command-line arguments for the swap coordinator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("starting swap coordinator");

	let config = Config::from_env()?;
	swap_core::metrics::register_metrics();

	let vault = Arc::new(KeyVault::load(&config.server_key_path)?);
	tracing::info!(path = %config.server_key_path.display(), "master key loaded");

	let store: Arc<dyn SwapStore> = Arc::new(
		PostgresStore::connect(&config.database_url, config.db_max_connections).await?,
	);
	store.health_check().await?;
	tracing::info!("store connected, migrations applied");

	match server::audit_stuck_swaps(&*store).await {
		Ok(0) => {},
		Ok(stuck) => tracing::warn!(stuck, "found executing swaps with no order uid"),
		Err(e) => tracing::warn!(error = %e, "startup audit failed"),
	}

	let orderbook: Arc<dyn Orderbook> =
		Arc::new(HttpOrderbook::new(&config.orderbook_url, config.http_timeout)?);
	let slippage = Arc::new(SlippageOracle::new(
		config.slippage_endpoint.clone(),
		config.http_timeout,
	));

	let mut readers: HashMap<SupportedChain, Arc<dyn ChainReader>> = HashMap::new();
	for chain in SupportedChain::ALL {
		let provider = create_http_provider(config.rpc_url(chain))?;
		readers.insert(chain, Arc::new(MulticallReader::new(provider, CBBTC)));
	}

	let orchestrator = Arc::new(LifecycleOrchestrator::new(
		store.clone(),
		vault.clone(),
		orderbook.clone(),
		slippage,
		readers.clone(),
	));

	if config.grafana.is_some() {
		tracing::info!("Grafana Cloud push configured; the exporter runs out of process");
	}

	let shutdown = CancellationToken::new();
	let mut poller_handles = Vec::new();

	for chain in SupportedChain::ALL {
		let poller = DepositPoller::new(
			chain,
			store.clone(),
			readers[&chain].clone(),
			orchestrator.clone(),
			chain.polling_interval(),
		);
		let token = shutdown.clone();
		poller_handles.push(tokio::spawn(async move { poller.run(token).await }));
	}

	let settlement = SettlementPoller::new(
		store.clone(),
		orderbook.clone(),
		config.settlement_interval,
		config.stuck_grace,
	);
	{
		let token = shutdown.clone();
		poller_handles.push(tokio::spawn(async move { settlement.run(token).await }));
	}

	let state = server::AppState {
		store,
		orderbook,
		vault,
		swap_ttl: config.swap_ttl,
	};
	let server_handle = tokio::spawn(server::start_server(
		config.port,
		state,
		shutdown.clone(),
	));

	tokio::signal::ctrl_c().await?;
	tracing::info!("shutdown signal received");
	shutdown.cancel();

	for handle in poller_handles {
		let _ = handle.await;
	}
	server_handle.await??;

	tracing::info!("swap coordinator stopped");
	Ok(())
}
