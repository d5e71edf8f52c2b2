//! Common types for the CBBTC swap coordinator.
//!
//! This crate defines the core data types shared by every component of the
//! coordinator: supported chains, token descriptors, the persisted swap
//! record and its state machine, the GPv2 order model, the app-data
//! document with its canonical serialization, and the HTTP API surface.

/// HTTP API request/response types and the structured API error.
pub mod api;
/// App-data document assembly, canonical JSON, and hashing.
pub mod app_data;
/// Supported chains and their per-chain parameters.
pub mod chain;
/// Well-known contract addresses and protocol constants.
pub mod constants;
/// EIP-712 word packing, domain hashes, and digests.
pub mod eip712;
/// GPv2 order model, struct hashing, and the 56-byte order UID.
pub mod order;
/// Persisted swap record and status enums.
pub mod swap;
/// Tagged token descriptor (ERC-20 or native ether).
pub mod token;
/// Address/hex/time helpers.
pub mod utils;

pub use api::{
	ApiError, CreateSwapRequest, CreateSwapResponse, ErrorResponse, HealthResponse, QuoteRequest,
	QuoteResponse, SwapStatusResponse,
};
pub use app_data::{canonical_json_string, AppDataDocument, PermitHook};
pub use chain::SupportedChain;
pub use constants::*;
pub use eip712::{compute_domain_hash, compute_final_digest, hash_struct, Word};
pub use order::{GpV2Order, OrderKind, OrderUid, SigningScheme};
pub use swap::{NewSwap, OrderStatus, Swap, SwapStatus};
pub use token::Token;
pub use utils::{
	current_timestamp, parse_evm_address, to_checksum, with_0x_prefix, without_0x_prefix,
};
