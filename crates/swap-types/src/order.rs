//! GPv2 order model.
//!
//! A sell order as the settlement contract hashes it, plus the 56-byte
//! order UID the orderbook derives from `(digest, owner, validTo)`.

use crate::constants::{GPV2_DOMAIN_NAME, GPV2_DOMAIN_VERSION, GPV2_SETTLEMENT};
use crate::eip712::{compute_domain_hash, compute_final_digest, hash_struct, Word};
use crate::utils::{with_0x_prefix, without_0x_prefix};
use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The settlement contract's order type string. The hash of this string is
/// the struct type hash every order commits to.
pub const ORDER_TYPE: &str = "Order(address sellToken,address buyToken,address receiver,uint256 sellAmount,uint256 buyAmount,uint32 validTo,bytes32 appData,uint256 feeAmount,string kind,bool partiallyFillable,string sellTokenBalance,string buyTokenBalance)";

/// Token balance source/destination. The coordinator only trades plain
/// ERC-20 balances but the wire format names the variant explicitly.
pub const BALANCE_ERC20: &str = "erc20";

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
	/// Sell an exact amount, receive at least `buyAmount`.
	Sell,
	/// Buy an exact amount, pay at most `sellAmount`.
	Buy,
}

impl OrderKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderKind::Sell => "sell",
			OrderKind::Buy => "buy",
		}
	}
}

/// Signature scheme submitted alongside an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningScheme {
	Eip712,
	EthSign,
}

/// A GPv2 sell order as signed under the settlement domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpV2Order {
	pub sell_token: Address,
	pub buy_token: Address,
	pub receiver: Address,
	pub sell_amount: U256,
	pub buy_amount: U256,
	pub valid_to: u32,
	pub app_data: B256,
	pub fee_amount: U256,
	pub kind: OrderKind,
	pub partially_fillable: bool,
}

impl GpV2Order {
	/// EIP-712 struct hash of this order.
	pub fn struct_hash(&self) -> B256 {
		hash_struct(&[
			Word::hash(keccak256(ORDER_TYPE.as_bytes())),
			Word::address(&self.sell_token),
			Word::address(&self.buy_token),
			Word::address(&self.receiver),
			Word::uint(self.sell_amount),
			Word::uint(self.buy_amount),
			Word::uint(U256::from(self.valid_to)),
			Word::hash(self.app_data),
			Word::uint(self.fee_amount),
			Word::string(self.kind.as_str()),
			Word::flag(self.partially_fillable),
			Word::string(BALANCE_ERC20),
			Word::string(BALANCE_ERC20),
		])
	}

	/// The digest the vault key signs: order struct hash under the
	/// settlement contract's domain on `chain_id`.
	pub fn signing_digest(&self, chain_id: u64) -> B256 {
		let domain = compute_domain_hash(
			GPV2_DOMAIN_NAME,
			GPV2_DOMAIN_VERSION,
			chain_id,
			&GPV2_SETTLEMENT,
		);
		compute_final_digest(&domain, &self.struct_hash())
	}
}

/// The 56-byte order identifier the orderbook assigns:
/// `digest(32) || owner(20) || validTo(4)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderUid(pub [u8; 56]);

impl OrderUid {
	/// Packs the three components into a UID.
	pub fn new(digest: B256, owner: Address, valid_to: u32) -> Self {
		let mut bytes = [0u8; 56];
		bytes[0..32].copy_from_slice(digest.as_slice());
		bytes[32..52].copy_from_slice(owner.as_slice());
		bytes[52..56].copy_from_slice(&valid_to.to_be_bytes());
		OrderUid(bytes)
	}

	/// The order digest component.
	pub fn digest(&self) -> B256 {
		B256::from_slice(&self.0[0..32])
	}

	/// The order owner component.
	pub fn owner(&self) -> Address {
		Address::from_slice(&self.0[32..52])
	}

	/// The validTo component.
	pub fn valid_to(&self) -> u32 {
		u32::from_be_bytes(self.0[52..56].try_into().expect("4-byte slice"))
	}
}

impl fmt::Display for OrderUid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

impl fmt::Debug for OrderUid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "OrderUid({})", self)
	}
}

impl FromStr for OrderUid {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let raw = hex::decode(without_0x_prefix(s))
			.map_err(|e| format!("invalid order uid hex: {}", e))?;
		let bytes: [u8; 56] = raw
			.try_into()
			.map_err(|v: Vec<u8>| format!("order uid must be 56 bytes, got {}", v.len()))?;
		Ok(OrderUid(bytes))
	}
}

impl Serialize for OrderUid {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for OrderUid {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		OrderUid::from_str(&with_0x_prefix(&s)).map_err(de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, b256};

	fn sample_order() -> GpV2Order {
		GpV2Order {
			sell_token: address!("cbB7C0000aB88B473b1f5aFd9ef808440eed33Bf"),
			buy_token: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
			receiver: address!("1111111111111111111111111111111111111111"),
			sell_amount: U256::from(10_000u64),
			buy_amount: U256::from(9_950u64),
			valid_to: 1_700_000_000,
			app_data: b256!("00000000000000000000000000000000000000000000000000000000000000aa"),
			fee_amount: U256::ZERO,
			kind: OrderKind::Sell,
			partially_fillable: false,
		}
	}

	#[test]
	fn test_struct_hash_is_deterministic() {
		assert_eq!(sample_order().struct_hash(), sample_order().struct_hash());
	}

	#[test]
	fn test_struct_hash_commits_to_fields() {
		let base = sample_order().struct_hash();

		let mut changed = sample_order();
		changed.buy_amount = U256::from(9_949u64);
		assert_ne!(base, changed.struct_hash());

		let mut changed = sample_order();
		changed.app_data =
			b256!("00000000000000000000000000000000000000000000000000000000000000ab");
		assert_ne!(base, changed.struct_hash());
	}

	#[test]
	fn test_signing_digest_varies_by_chain() {
		let order = sample_order();
		assert_ne!(order.signing_digest(1), order.signing_digest(8453));
	}

	#[test]
	fn test_order_uid_packing() {
		let digest =
			b256!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
		let owner = address!("1234567890123456789012345678901234567890");
		let valid_to = 1_700_000_000u32;

		let uid = OrderUid::new(digest, owner, valid_to);
		assert_eq!(uid.digest(), digest);
		assert_eq!(uid.owner(), owner);
		assert_eq!(uid.valid_to(), valid_to);
	}

	#[test]
	fn test_order_uid_hex_round_trip() {
		let uid = OrderUid::new(
			b256!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
			address!("1234567890123456789012345678901234567890"),
			42,
		);
		let text = uid.to_string();
		assert_eq!(text.len(), 2 + 112);
		assert_eq!(OrderUid::from_str(&text).unwrap(), uid);
	}

	#[test]
	fn test_order_uid_rejects_wrong_length() {
		assert!(OrderUid::from_str("0x1234").is_err());
	}
}
