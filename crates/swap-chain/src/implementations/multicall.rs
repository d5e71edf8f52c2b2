//! Multicall3-backed chain reader.
//!
//! Bundles per-vault `balanceOf` calls into single `aggregate3` requests.
//! Individual subcalls are allowed to fail (a failed cell reads as zero);
//! only a whole-batch RPC failure propagates to the caller.

use crate::{ChainError, ChainReader};
use alloy_primitives::{Address, U256};
use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use swap_types::MULTICALL3;

sol! {
	/// Multicall3 aggregator, the subset the coordinator uses.
	interface IMulticall3 {
		struct Call3 {
			address target;
			bool allowFailure;
			bytes callData;
		}

		struct Result {
			bool success;
			bytes returnData;
		}

		function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
	}

	/// ERC-20 with the EIP-2612 extension, the subset the coordinator uses.
	interface IERC20Permit {
		function balanceOf(address account) external view returns (uint256);
		function nonces(address owner) external view returns (uint256);
	}
}

/// RPC providers start rejecting aggregate calls well above this size;
/// staying under it keeps each chunk to one request without ever tripping
/// response-size limits.
const BATCH_SIZE: usize = 7_500;

/// Chain reader that batches balance queries through Multicall3.
pub struct MulticallReader {
	provider: DynProvider,
	/// The ERC-20 whose balances are read (CBBTC on this chain).
	token: Address,
}

impl MulticallReader {
	pub fn new(provider: DynProvider, token: Address) -> Self {
		Self { provider, token }
	}

	async fn eth_call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, ChainError> {
		let request = TransactionRequest::default()
			.to(to)
			.input(alloy_primitives::Bytes::from(calldata).into());
		let bytes = self
			.provider
			.call(request)
			.await
			.map_err(|e| ChainError::Rpc(e.to_string()))?;
		Ok(bytes.to_vec())
	}
}

/// Builds the aggregate3 payload for one chunk of vault addresses.
fn encode_balance_calls(token: Address, vaults: &[Address]) -> Vec<IMulticall3::Call3> {
	vaults
		.iter()
		.map(|vault| IMulticall3::Call3 {
			target: token,
			allowFailure: true,
			callData: IERC20Permit::balanceOfCall { account: *vault }
				.abi_encode()
				.into(),
		})
		.collect()
}

/// Decodes one chunk of aggregate3 results into balances, in order.
/// Failed or undecodable cells report as zero.
fn decode_balance_results(results: &[IMulticall3::Result]) -> Vec<U256> {
	results
		.iter()
		.map(|cell| {
			if !cell.success {
				return U256::ZERO;
			}
			IERC20Permit::balanceOfCall::abi_decode_returns(&cell.returnData)
				.unwrap_or(U256::ZERO)
		})
		.collect()
}

#[async_trait]
impl ChainReader for MulticallReader {
	async fn cbbtc_balances(&self, vaults: &[Address]) -> Result<Vec<U256>, ChainError> {
		let mut balances = Vec::with_capacity(vaults.len());

		for chunk in vaults.chunks(BATCH_SIZE) {
			let calls = encode_balance_calls(self.token, chunk);
			let calldata = IMulticall3::aggregate3Call { calls }.abi_encode();
			let raw = self.eth_call(MULTICALL3, calldata).await?;
			let results = IMulticall3::aggregate3Call::abi_decode_returns(&raw)
				.map_err(|e| ChainError::Decode(format!("aggregate3 response: {}", e)))?;
			if results.len() != chunk.len() {
				return Err(ChainError::Decode(format!(
					"aggregate3 returned {} cells for {} calls",
					results.len(),
					chunk.len()
				)));
			}
			balances.extend(decode_balance_results(&results));
		}

		Ok(balances)
	}

	async fn permit_nonce(&self, owner: Address) -> Result<U256, ChainError> {
		let calldata = IERC20Permit::noncesCall { owner }.abi_encode();
		let raw = self.eth_call(self.token, calldata).await?;
		IERC20Permit::noncesCall::abi_decode_returns(&raw)
			.map_err(|e| ChainError::Decode(format!("nonces response: {}", e)))
	}
}
