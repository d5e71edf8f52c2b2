//! Deterministic key-derivation vault.
//!
//! Each swap gets a single-use deposit address whose private key is never
//! stored: it is recomputed on demand as `keccak256(master_key || salt)`.
//! The store persists only salts, so replicating the database to a less
//! trusted host discloses no vault key. The sole long-lived secret is the
//! 32-byte master key, loaded once at startup and held in memory for the
//! process lifetime.

use alloy_primitives::{keccak256, Address, B256};
use alloy_signer_local::PrivateKeySigner;
use rand::RngCore;
use std::path::Path;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// Errors that can occur while loading the master key or deriving vault keys.
#[derive(Debug, Error)]
pub enum VaultError {
	/// The master key file is missing or malformed. Fatal at startup.
	#[error("Configuration error: {0}")]
	Config(String),
	/// The derived scalar was rejected by the curve implementation.
	#[error("Derivation error: {0}")]
	Derivation(String),
}

/// A vault key pair derived for one signing operation.
///
/// The raw scalar lives inside the signer and zeroizes on drop; callers
/// hold this value only for the duration of a signing operation and must
/// never log or persist it.
pub struct DerivedVault {
	address: Address,
	salt: B256,
	signer: PrivateKeySigner,
}

impl DerivedVault {
	/// The vault's deposit address.
	pub fn address(&self) -> Address {
		self.address
	}

	/// The salt this key pair derives from.
	pub fn salt(&self) -> B256 {
		self.salt
	}

	/// The signer backing this vault. Use and drop.
	pub fn signer(&self) -> &PrivateKeySigner {
		&self.signer
	}
}

impl std::fmt::Debug for DerivedVault {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		// Key material must never surface through Debug formatting.
		f.debug_struct("DerivedVault")
			.field("address", &self.address)
			.finish_non_exhaustive()
	}
}

/// Holder of the server master key.
pub struct KeyVault {
	master_key: Zeroizing<[u8; 32]>,
}

impl KeyVault {
	/// Loads and validates the master key from a file.
	///
	/// The file must contain exactly 64 hex characters, with or without a
	/// `0x` prefix; surrounding whitespace is tolerated.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, VaultError> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path).map_err(|e| {
			VaultError::Config(format!("cannot read master key {}: {}", path.display(), e))
		})?;
		Self::from_hex(raw.trim())
	}

	/// Constructs a vault from a hex-encoded master key.
	pub fn from_hex(hex_key: &str) -> Result<Self, VaultError> {
		let stripped = hex_key
			.strip_prefix("0x")
			.or_else(|| hex_key.strip_prefix("0X"))
			.unwrap_or(hex_key);
		if stripped.len() != 64 {
			return Err(VaultError::Config(format!(
				"master key must be 64 hex characters (32 bytes), got {}",
				stripped.len()
			)));
		}
		let decoded = hex::decode(stripped)
			.map_err(|_| VaultError::Config("master key must be valid hexadecimal".to_string()))?;
		let mut key = [0u8; 32];
		key.copy_from_slice(&decoded);
		let mut decoded = decoded;
		decoded.zeroize();
		Ok(Self {
			master_key: Zeroizing::new(key),
		})
	}

	/// Mints a fresh vault: random salt, derived key pair.
	pub fn mint(&self) -> Result<DerivedVault, VaultError> {
		let mut salt = [0u8; 32];
		rand::rngs::OsRng.fill_bytes(&mut salt);
		self.derive(B256::from(salt))
	}

	/// Re-derives the vault key pair for a salt.
	///
	/// Deterministic: the same `(master_key, salt)` always yields the same
	/// address and private key.
	pub fn derive(&self, salt: B256) -> Result<DerivedVault, VaultError> {
		let mut preimage = Zeroizing::new([0u8; 64]);
		preimage[..32].copy_from_slice(self.master_key.as_ref());
		preimage[32..].copy_from_slice(salt.as_slice());
		let private_key = keccak256(preimage.as_ref());

		let signer = PrivateKeySigner::from_bytes(&private_key)
			.map_err(|e| VaultError::Derivation(e.to_string()))?;
		Ok(DerivedVault {
			address: signer.address(),
			salt,
			signer,
		})
	}
}

impl std::fmt::Debug for KeyVault {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeyVault").finish_non_exhaustive()
	}
}
