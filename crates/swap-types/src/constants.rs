//! Well-known contract addresses and protocol constants.
//!
//! Every address here is deployed at the same location on all supported
//! chains, which is why they are compile-time constants rather than
//! per-chain configuration.

use alloy_primitives::{address, Address};

/// GPv2 settlement contract; verifying contract of the order signing domain.
pub const GPV2_SETTLEMENT: Address = address!("9008D19f58AAbD9eD0D60971565AA8510560ab41");

/// GPv2 vault relayer; the spender granted by the permit pre-hook.
pub const GPV2_VAULT_RELAYER: Address = address!("C92E8bdf79f0507f65a392b0ab4667716BFE0110");

/// Coinbase Wrapped BTC, same address on Ethereum mainnet and Base.
pub const CBBTC: Address = address!("cbB7C0000aB88B473b1f5aFd9ef808440eed33Bf");

/// Multicall3 aggregator used to batch balance reads into one RPC request.
pub const MULTICALL3: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Sentinel address the orderbook understands as native ether on the buy side.
pub const NATIVE_ETH_SENTINEL: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// EIP-2612 domain name of the CBBTC token contract.
pub const CBBTC_PERMIT_NAME: &str = "Coinbase Wrapped BTC";

/// EIP-2612 domain version of the CBBTC token contract.
pub const CBBTC_PERMIT_VERSION: &str = "2";

/// GPv2 settlement EIP-712 domain name.
pub const GPV2_DOMAIN_NAME: &str = "Gnosis Protocol";

/// GPv2 settlement EIP-712 domain version.
pub const GPV2_DOMAIN_VERSION: &str = "v2";

/// `appCode` stamped into every app-data document.
pub const APP_CODE: &str = "cbbtc-swap";

/// App-data document schema version.
pub const APP_DATA_VERSION: &str = "1.1.0";

/// Gas limit advertised for the permit pre-hook, as the orderbook expects it.
pub const PERMIT_HOOK_GAS_LIMIT: &str = "80000";

/// How long a submitted order stays fillable (24 hours).
pub const ORDER_VALIDITY_SECS: u64 = 86_400;

/// Slippage tolerance applied when the oracle is unreachable.
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;
