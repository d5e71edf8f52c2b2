//! EIP-712 hashing for the two signing domains the coordinator uses.
//!
//! The CBBTC permit and the GPv2 order hash the same way: a type hash
//! followed by the struct's fields, each packed into one 32-byte word,
//! hashed, and bound to a domain through the `0x1901` prefix. [`Word`]
//! covers exactly the ABI slots those two structs contain - addresses,
//! unsigned integers, bools, `bytes32` values, and strings (which enter
//! a struct hash as their keccak256).

use alloy_primitives::{keccak256, Address, B256, U256};

/// The four-field domain type both CBBTC and the settlement contract use.
pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// One 32-byte word of a struct-hash preimage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word([u8; 32]);

impl Word {
	/// A value that is already 32 bytes: a type hash or a `bytes32` field.
	pub fn hash(value: B256) -> Self {
		Word(value.0)
	}

	/// An `address` field, right-aligned.
	pub fn address(value: &Address) -> Self {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(value.as_slice());
		Word(word)
	}

	/// An unsigned integer field of any width (`uint256`, `uint32`),
	/// big-endian.
	pub fn uint(value: U256) -> Self {
		Word(value.to_be_bytes::<32>())
	}

	/// A `bool` field.
	pub fn flag(value: bool) -> Self {
		let mut word = [0u8; 32];
		word[31] = value as u8;
		Word(word)
	}

	/// A `string` field, which enters the struct hash as its keccak256.
	pub fn string(value: &str) -> Self {
		Word(keccak256(value.as_bytes()).0)
	}
}

/// Hashes a struct: keccak256 over the concatenated words, type hash
/// first, fields in declaration order.
pub fn hash_struct(words: &[Word]) -> B256 {
	let mut preimage = Vec::with_capacity(words.len() * 32);
	for word in words {
		preimage.extend_from_slice(&word.0);
	}
	keccak256(preimage)
}

/// Compute the EIP-712 domain hash for one of the coordinator's domains.
pub fn compute_domain_hash(
	name: &str,
	version: &str,
	chain_id: u64,
	verifying_contract: &Address,
) -> B256 {
	hash_struct(&[
		Word::hash(keccak256(DOMAIN_TYPE.as_bytes())),
		Word::string(name),
		Word::string(version),
		Word::uint(U256::from(chain_id)),
		Word::address(verifying_contract),
	])
}

/// Compute the final EIP-712 digest: `keccak256(0x1901 || domainHash || structHash)`.
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut preimage = [0u8; 66];
	preimage[0] = 0x19;
	preimage[1] = 0x01;
	preimage[2..34].copy_from_slice(domain_hash.as_slice());
	preimage[34..66].copy_from_slice(struct_hash.as_slice());
	keccak256(preimage)
}
