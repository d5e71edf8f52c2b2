//! App-data document assembly and canonical serialization.
//!
//! The `appData` field of a signed order is the keccak256 of the document's
//! serialized bytes, so serialization is part of the protocol: recursively
//! sorted keys, no inserted whitespace, integers as decimal. The default
//! serializer is never used for hashing; [`canonical_json_string`] is.

use crate::constants::{APP_CODE, APP_DATA_VERSION, PERMIT_HOOK_GAS_LIMIT};
use crate::utils::with_0x_prefix;
use alloy_primitives::{keccak256, Address, Bytes, B256};
use serde_json::{json, Value};

/// The permit pre-hook a solver runs immediately before settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitHook {
	/// The sell token contract the hook calls into.
	pub target: Address,
	/// ABI-encoded `permit(owner,spender,value,deadline,v,r,s)` calldata.
	pub call_data: Bytes,
	/// Gas limit advertised to the solver, decimal string.
	pub gas_limit: String,
}

impl PermitHook {
	pub fn new(target: Address, call_data: Bytes) -> Self {
		Self {
			target,
			call_data,
			gas_limit: PERMIT_HOOK_GAS_LIMIT.to_string(),
		}
	}
}

/// The full app-data document attached to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDataDocument {
	pub permit_hook: PermitHook,
	pub slippage_bps: u32,
}

impl AppDataDocument {
	/// Builds the JSON value in the orderbook's document schema.
	pub fn to_value(&self) -> Value {
		json!({
			"version": APP_DATA_VERSION,
			"appCode": APP_CODE,
			"metadata": {
				"hooks": {
					"pre": [{
						"target": with_0x_prefix(&hex::encode(self.permit_hook.target)),
						"callData": with_0x_prefix(&hex::encode(&self.permit_hook.call_data)),
						"gasLimit": self.permit_hook.gas_limit,
					}],
				},
				"orderClass": { "orderClass": "market" },
				"quote": {
					"slippageBips": self.slippage_bps,
					"smartSlippage": true,
				},
			},
		})
	}

	/// The canonical serialized form whose bytes the hash commits to.
	pub fn canonical_json(&self) -> String {
		canonical_json_string(&self.to_value())
	}

	/// `keccak256` of the canonical UTF-8 bytes; the order's `appData` field.
	pub fn hash(&self) -> B256 {
		keccak256(self.canonical_json().as_bytes())
	}
}

/// Serializes a JSON value deterministically: object keys recursively
/// sorted, no inserted whitespace, numbers rendered as-is (the documents
/// built here only ever contain integers and booleans).
pub fn canonical_json_string(value: &Value) -> String {
	let mut out = String::new();
	write_canonical(value, &mut out);
	out
}

fn write_canonical(value: &Value, out: &mut String) {
	match value {
		Value::Null => out.push_str("null"),
		Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
		Value::Number(n) => out.push_str(&n.to_string()),
		Value::String(s) => {
			out.push_str(&serde_json::to_string(s).expect("string serialization is infallible"))
		},
		Value::Array(items) => {
			out.push('[');
			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				write_canonical(item, out);
			}
			out.push(']');
		},
		Value::Object(map) => {
			let mut keys: Vec<&String> = map.keys().collect();
			keys.sort();
			out.push('{');
			for (i, key) in keys.into_iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				out.push_str(
					&serde_json::to_string(key).expect("string serialization is infallible"),
				);
				out.push(':');
				write_canonical(&map[key], out);
			}
			out.push('}');
		},
	}
}
