//! Aggregator key loading, rotation-aware key selection, and signing.
//!
//! The secret key is loaded once into process memory and never leaves it;
//! callers only ever see the public half and detached signatures.

use crate::accounts::OnChainConfig;
use crate::commitment::DS_MESSAGE_LEN;
use crate::error::{CoreError, CoreResult};
use ed25519_dalek::{Signer as _, SigningKey};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::path::Path;

/// The process-local aggregator keypair.
pub struct AggregatorSigner {
    key: SigningKey,
}

impl std::fmt::Debug for AggregatorSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secret material stays out of any Debug/log surface.
        f.debug_struct("AggregatorSigner")
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}

impl AggregatorSigner {
    /// Load a keypair file. Accepted formats:
    /// a JSON array of 64 (secret ‖ public) or 32 (seed) bytes, a bare hex
    /// string of either length, or a labelled envelope `{"secret_key": ...}`.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_file_contents(raw.trim())
    }

    pub fn from_file_contents(raw: &str) -> CoreResult<Self> {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return Self::from_json_value(&value);
        }
        Self::from_hex_str(raw)
    }

    fn from_json_value(value: &Value) -> CoreResult<Self> {
        match value {
            Value::Array(_) => {
                let bytes: Vec<u8> = serde_json::from_value(value.clone())
                    .map_err(|_| CoreError::MalformedKeypair("array entries must be bytes"))?;
                Self::from_secret_bytes(&bytes)
            }
            Value::String(s) => Self::from_hex_str(s),
            Value::Object(map) => {
                let inner = map
                    .get("secret_key")
                    .ok_or(CoreError::MalformedKeypair("envelope lacks secret_key"))?;
                Self::from_json_value(inner)
            }
            _ => Err(CoreError::MalformedKeypair("unsupported keypair format")),
        }
    }

    fn from_hex_str(raw: &str) -> CoreResult<Self> {
        let bytes =
            hex::decode(raw).map_err(|_| CoreError::MalformedKeypair("invalid hex secret"))?;
        Self::from_secret_bytes(&bytes)
    }

    fn from_secret_bytes(bytes: &[u8]) -> CoreResult<Self> {
        match bytes.len() {
            64 => {
                let mut keypair = [0u8; 64];
                keypair.copy_from_slice(bytes);
                let key = SigningKey::from_keypair_bytes(&keypair)
                    .map_err(|_| CoreError::MalformedKeypair("secret and public halves disagree"))?;
                Ok(Self { key })
            }
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(bytes);
                Ok(Self {
                    key: SigningKey::from_bytes(&seed),
                })
            }
            _ => Err(CoreError::MalformedKeypair("secret must be 32 or 64 bytes")),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn public_key_base58(&self) -> String {
        Pubkey::new_from_array(self.public_key()).to_string()
    }

    /// Secret ‖ public, for constructing the fee-payer signer.
    pub fn keypair_bytes(&self) -> [u8; 64] {
        self.key.to_keypair_bytes()
    }

    /// Detached Ed25519 signature over the full 110-byte preimage
    /// (the message itself, not its digest).
    pub fn sign_commitment(&self, preimage: &[u8; DS_MESSAGE_LEN]) -> [u8; 64] {
        self.key.sign(preimage).to_bytes()
    }

    /// Fail unless the loaded key is the allowed aggregator key for `seq`.
    pub fn ensure_allowed(&self, config: &OnChainConfig, seq: u64) -> CoreResult<()> {
        let allowed = allowed_aggregator_key(config, seq);
        if allowed.to_bytes() != self.public_key() {
            return Err(CoreError::AggregatorKeyMismatch {
                allowed: allowed.to_string(),
                loaded: self.public_key_base58(),
            });
        }
        Ok(())
    }
}

/// Rotation is a cliff: at `seq >= activation_seq` the next key takes over
/// with no overlap window.
pub fn allowed_aggregator_key(config: &OnChainConfig, seq: u64) -> Pubkey {
    if seq >= config.activation_seq {
        config.next_aggregator_pubkey
    } else {
        config.aggregator_pubkey
    }
}
