//! The minimal artifact: fingerprint of a proved state-transition window.

use crate::canonical::{canonical_json, Hex32};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum slot window per artifact, enforced again by the verifier program.
pub const MAX_SLOTS_PER_ARTIFACT: u64 = 2048;
/// Maximum canonical artifact size in bytes, mirrored from the verifier.
pub const MAX_ARTIFACT_SIZE_BYTES: usize = 512 * 1024;

/// The four-field minimal descriptor. Immutable once its identifier is
/// minted; the identifier is derived from these fields alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub start_slot: u64,
    pub end_slot: u64,
    pub state_root_before: Hex32,
    pub state_root_after: Hex32,
}

impl Artifact {
    pub fn new(
        start_slot: u64,
        end_slot: u64,
        state_root_before: Hex32,
        state_root_after: Hex32,
    ) -> CoreResult<Self> {
        if end_slot < start_slot {
            return Err(CoreError::InvalidSlotRange {
                start: start_slot,
                end: end_slot,
            });
        }
        let window = end_slot - start_slot + 1;
        if window > MAX_SLOTS_PER_ARTIFACT {
            return Err(CoreError::WindowTooWide {
                got: window,
                max: MAX_SLOTS_PER_ARTIFACT,
            });
        }
        Ok(Self {
            start_slot,
            end_slot,
            state_root_before,
            state_root_after,
        })
    }

    /// Canonical JSON of exactly the four fields, roots as lowercase hex.
    /// This is the byte string that lands on disk and feeds the proof-hash.
    pub fn canonical_bytes(&self) -> CoreResult<Vec<u8>> {
        let bytes = canonical_json(self)?;
        if bytes.len() > MAX_ARTIFACT_SIZE_BYTES {
            return Err(CoreError::ArtifactTooLarge {
                got: bytes.len(),
                max: MAX_ARTIFACT_SIZE_BYTES,
            });
        }
        Ok(bytes)
    }

    /// BLAKE3 of the canonical encoding; the content-addressed identity.
    pub fn proof_hash(&self) -> CoreResult<[u8; 32]> {
        Ok(*blake3::hash(&self.canonical_bytes()?).as_bytes())
    }

    pub fn artifact_id(&self) -> CoreResult<Uuid> {
        Ok(artifact_id_from_proof_hash(&self.proof_hash()?))
    }
}

/// Derive the RFC 4122 v4 identifier from the first 16 bytes of the
/// proof-hash, forcing the version nibble and variant bits.
pub fn artifact_id_from_proof_hash(proof_hash: &[u8; 32]) -> Uuid {
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&proof_hash[..16]);
    uuid::Builder::from_random_bytes(raw).into_uuid()
}
