//! EIP-2612 permit construction.
//!
//! Builds everything a solver needs to ride a gasless approval: the
//! on-chain nonce read, the signed permit under the sell token's domain,
//! the encoded `permit(...)` calldata, and the app-data document bundling
//! it all as a pre-hook.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_signer::SignerSync;
use alloy_sol_types::{sol, SolCall};
use std::sync::Arc;
use swap_chain::{ChainError, ChainReader};
use swap_orderbook::SlippageOracle;
use swap_types::{
	compute_domain_hash, compute_final_digest, hash_struct, AppDataDocument, PermitHook,
	SupportedChain, Word, CBBTC_PERMIT_NAME, CBBTC_PERMIT_VERSION, GPV2_VAULT_RELAYER,
};
use swap_vault::DerivedVault;
use thiserror::Error;

sol! {
	/// EIP-2612 approval entry point on the sell token.
	function permit(
		address owner,
		address spender,
		uint256 value,
		uint256 deadline,
		uint8 v,
		bytes32 r,
		bytes32 s
	) external;
}

/// The EIP-2612 permit type string.
pub const PERMIT_TYPE: &str =
	"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";

/// Errors that can occur while building a permit.
#[derive(Debug, Error)]
pub enum PermitError {
	#[error("chain error: {0}")]
	Chain(#[from] ChainError),
	#[error("signing error: {0}")]
	Signing(String),
}

/// Everything the order needs from the permit stage.
#[derive(Debug, Clone)]
pub struct PermitArtifacts {
	/// The assembled app-data document, including the permit pre-hook.
	pub document: AppDataDocument,
	/// keccak256 of the document's canonical bytes; the order's `appData`.
	pub app_data_hash: B256,
	/// The slippage tolerance baked into the document.
	pub slippage_bps: u32,
}

/// Builds signed permits and the app-data documents that carry them.
pub struct PermitBuilder {
	chain: SupportedChain,
	chain_reader: Arc<dyn ChainReader>,
	slippage: Arc<SlippageOracle>,
}

impl PermitBuilder {
	pub fn new(
		chain: SupportedChain,
		chain_reader: Arc<dyn ChainReader>,
		slippage: Arc<SlippageOracle>,
	) -> Self {
		Self {
			chain,
			chain_reader,
			slippage,
		}
	}

	/// Builds the permit pre-hook and app-data document for a vault.
	///
	/// `sell_token` is the permit domain's verifying contract; `buy_token`
	/// only feeds the slippage lookup.
	pub async fn build(
		&self,
		vault: &DerivedVault,
		sell_token: Address,
		buy_token: Address,
	) -> Result<PermitArtifacts, PermitError> {
		let nonce = self.chain_reader.permit_nonce(vault.address()).await?;

		let digest = permit_digest(self.chain.id(), sell_token, vault.address(), nonce);
		let signature = vault
			.signer()
			.sign_hash_sync(&digest)
			.map_err(|e| PermitError::Signing(e.to_string()))?;
		let sig_bytes = signature.as_bytes();

		let call_data = encode_permit_calldata(
			vault.address(),
			sig_bytes[64],
			B256::from_slice(&sig_bytes[0..32]),
			B256::from_slice(&sig_bytes[32..64]),
		);

		let slippage_bps = self
			.slippage
			.slippage_bps(self.chain, sell_token, buy_token)
			.await;

		let document = AppDataDocument {
			permit_hook: PermitHook::new(sell_token, call_data),
			slippage_bps,
		};
		let app_data_hash = document.hash();

		Ok(PermitArtifacts {
			document,
			app_data_hash,
			slippage_bps,
		})
	}
}

/// EIP-712 struct hash of the unlimited permit for `owner` at `nonce`.
///
/// Value and deadline are both `2^256 - 1`: the approval is single-use in
/// practice (the vault is abandoned after one swap) but must not expire
/// before the solver executes the pre-hook.
pub fn permit_struct_hash(owner: Address, nonce: U256) -> B256 {
	hash_struct(&[
		Word::hash(keccak256(PERMIT_TYPE.as_bytes())),
		Word::address(&owner),
		Word::address(&GPV2_VAULT_RELAYER),
		Word::uint(U256::MAX),
		Word::uint(nonce),
		Word::uint(U256::MAX),
	])
}

/// The digest the vault key signs for the permit.
pub fn permit_digest(chain_id: u64, sell_token: Address, owner: Address, nonce: U256) -> B256 {
	let domain = compute_domain_hash(
		CBBTC_PERMIT_NAME,
		CBBTC_PERMIT_VERSION,
		chain_id,
		&sell_token,
	);
	compute_final_digest(&domain, &permit_struct_hash(owner, nonce))
}

/// ABI-encodes the `permit(owner,spender,value,deadline,v,r,s)` call.
pub fn encode_permit_calldata(owner: Address, v: u8, r: B256, s: B256) -> Bytes {
	permitCall {
		owner,
		spender: GPV2_VAULT_RELAYER,
		value: U256::MAX,
		deadline: U256::MAX,
		v,
		r,
		s,
	}
	.abi_encode()
	.into()
}
