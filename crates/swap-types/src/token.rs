//! Tagged token descriptor.
//!
//! Request bodies and the persisted swap record both describe tokens as a
//! tagged union: an ERC-20 contract address, or native ether (buy side
//! only). The JSON shape is `{"type":"erc20","address":"0x…"}` or
//! `{"type":"ether"}`; ERC-20 addresses render EIP-55 checksummed.

use crate::constants::NATIVE_ETH_SENTINEL;
use crate::utils::{parse_evm_address, to_checksum};
use alloy_primitives::Address;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A token on one of the supported chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
	/// An ERC-20 contract.
	Erc20 {
		/// The token contract address.
		address: Address,
	},
	/// Native ether.
	Ether,
}

impl Token {
	/// The address this token takes when passed to the orderbook.
	///
	/// Native ether maps to the well-known `0xEeee…EEeE` sentinel.
	pub fn orderbook_address(&self) -> Address {
		match self {
			Token::Erc20 { address } => *address,
			Token::Ether => NATIVE_ETH_SENTINEL,
		}
	}

	/// Whether this descriptor is native ether.
	pub fn is_native(&self) -> bool {
		matches!(self, Token::Ether)
	}

	/// Serializes to the canonical JSON text stored in the swap record.
	pub fn to_json(&self) -> String {
		serde_json::to_string(self).expect("token serialization is infallible")
	}

	/// Parses the JSON text stored in the swap record.
	pub fn from_json(json: &str) -> Result<Self, String> {
		serde_json::from_str(json).map_err(|e| format!("invalid token descriptor: {}", e))
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Erc20 { address } => write!(f, "erc20:{}", to_checksum(address)),
			Token::Ether => write!(f, "ether"),
		}
	}
}

impl Serialize for Token {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Token::Erc20 { address } => {
				let mut s = serializer.serialize_struct("Token", 2)?;
				s.serialize_field("type", "erc20")?;
				s.serialize_field("address", &to_checksum(address))?;
				s.end()
			},
			Token::Ether => {
				let mut s = serializer.serialize_struct("Token", 1)?;
				s.serialize_field("type", "ether")?;
				s.end()
			},
		}
	}
}

impl<'de> Deserialize<'de> for Token {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct TokenVisitor;

		impl<'de> Visitor<'de> for TokenVisitor {
			type Value = Token;

			fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
				f.write_str("a token descriptor object")
			}

			fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Token, A::Error> {
				let mut kind: Option<String> = None;
				let mut address: Option<String> = None;
				while let Some(key) = map.next_key::<String>()? {
					match key.as_str() {
						"type" => kind = Some(map.next_value()?),
						"address" => address = Some(map.next_value()?),
						other => {
							return Err(de::Error::unknown_field(other, &["type", "address"]));
						},
					}
				}
				match kind.as_deref() {
					Some("erc20") => {
						let raw =
							address.ok_or_else(|| de::Error::missing_field("address"))?;
						let parsed = parse_evm_address(&raw).map_err(de::Error::custom)?;
						Ok(Token::Erc20 { address: parsed })
					},
					Some("ether") => Ok(Token::Ether),
					Some(other) => Err(de::Error::custom(format!(
						"unknown token type: {}",
						other
					))),
					None => Err(de::Error::missing_field("type")),
				}
			}
		}

		deserializer.deserialize_map(TokenVisitor)
	}
}
