//! Alloy provider construction.
//!
//! One factory for all HTTP providers so every chain gets the same retry
//! behavior: exponential backoff against rate limits and transient
//! transport errors.

use crate::ChainError;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_client::RpcClient;
use alloy_transport::layers::RetryBackoffLayer;

/// Creates an HTTP provider with retry capabilities.
///
/// Retry behavior: up to 5 attempts, 1000 ms initial backoff, rate
/// limiting budget of 10 compute units per second.
pub fn create_http_provider(rpc_url: &str) -> Result<DynProvider, ChainError> {
	let url = rpc_url
		.parse()
		.map_err(|e| ChainError::Provider(format!("invalid RPC URL {}: {}", rpc_url, e)))?;

	let retry_layer = RetryBackoffLayer::new(
		5,    // max_retry
		1000, // initial backoff in milliseconds
		10,   // compute units per second
	);

	let client = RpcClient::builder().layer(retry_layer).http(url);
	let provider = ProviderBuilder::new().connect_client(client);
	Ok(provider.erased())
}
