//! Address, hex, and time helpers shared across the coordinator.

use alloy_primitives::Address;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Ensures a hex string carries a `0x` prefix.
pub fn with_0x_prefix(hex: &str) -> String {
	if hex.starts_with("0x") || hex.starts_with("0X") {
		hex.to_string()
	} else {
		format!("0x{}", hex)
	}
}

/// Strips a leading `0x`/`0X` prefix if present.
pub fn without_0x_prefix(hex: &str) -> &str {
	hex.strip_prefix("0x")
		.or_else(|| hex.strip_prefix("0X"))
		.unwrap_or(hex)
}

/// Parses an EVM address, enforcing EIP-55 when the input is mixed-case.
///
/// All-lowercase and all-uppercase inputs carry no checksum information and
/// are accepted as-is; mixed-case inputs must be valid EIP-55 or the parse
/// is rejected. The returned address renders checksummed via [`to_checksum`].
pub fn parse_evm_address(input: &str) -> Result<Address, String> {
	let hex = without_0x_prefix(input);
	if hex.len() != 40 {
		return Err(format!("invalid address length: {}", input));
	}
	let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
	let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
	if has_lower && has_upper {
		Address::parse_checksummed(with_0x_prefix(input), None)
			.map_err(|_| format!("invalid EIP-55 checksum: {}", input))
	} else {
		Address::from_str(input).map_err(|e| format!("invalid address {}: {}", input, e))
	}
}

/// Renders an address in EIP-55 checksummed form.
pub fn to_checksum(address: &Address) -> String {
	address.to_checksum(None)
}

/// Current unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock before unix epoch")
		.as_secs()
}

/// Current unix timestamp in milliseconds.
pub fn current_timestamp_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock before unix epoch")
		.as_millis() as u64
}
