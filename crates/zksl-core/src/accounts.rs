//! On-ledger account codecs and the anchor instruction payload.
//!
//! Every record owned by the verifier program starts with an 8-byte
//! discriminator, the first 8 bytes of SHA-256 over a fixed label. Integer
//! fields are little-endian fixed width throughout.

use crate::error::{CoreError, CoreResult};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

pub const CONFIG_LABEL: &str = "account:Config";
pub const AGGREGATOR_STATE_LABEL: &str = "account:AggregatorState";
pub const RANGE_STATE_LABEL: &str = "account:RangeState";
pub const PROOF_RECORD_LABEL: &str = "account:ProofRecord";
pub const VALIDATOR_RECORD_LABEL: &str = "account:ValidatorRecord";
pub const ANCHOR_PROOF_IX_LABEL: &str = "global:anchor_proof";

pub const DISCRIMINATOR_LEN: usize = 8;
/// Anchor payload body, §4.4 field order: 16+32+8+8+8+4+32+32+32+8+32.
pub const PROOF_RECORD_BODY_LEN: usize = 212;
/// Discriminator plus body.
pub const ANCHOR_PAYLOAD_LEN: usize = DISCRIMINATOR_LEN + PROOF_RECORD_BODY_LEN;
/// Discriminator, pubkey, escrow, lock_ts, status, num_accepts, 47 reserved.
pub const VALIDATOR_RECORD_LEN: usize = DISCRIMINATOR_LEN + 32 + 32 + 8 + 1 + 8 + 47;

/// First 8 bytes of SHA-256 over the label.
pub fn discriminator(label: &str) -> [u8; 8] {
    let digest = Sha256::digest(label.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Bounds-checked little-endian reader over raw account data.
struct Reader<'a> {
    data: &'a [u8],
    kind: &'static str,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], kind: &'static str, label: &str) -> CoreResult<Self> {
        let mut r = Self { data, kind };
        let disc = r.take(DISCRIMINATOR_LEN)?;
        if disc != discriminator(label) {
            return Err(CoreError::MalformedAccount { kind });
        }
        Ok(r)
    }

    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        if self.data.len() < n {
            return Err(CoreError::MalformedAccount { kind: self.kind });
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    fn bytes32(&mut self) -> CoreResult<[u8; 32]> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.take(32)?);
        Ok(out)
    }

    fn pubkey(&mut self) -> CoreResult<Pubkey> {
        Ok(Pubkey::new_from_array(self.bytes32()?))
    }

    fn u8(&mut self) -> CoreResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> CoreResult<u32> {
        let mut out = [0u8; 4];
        out.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(out))
    }

    fn u64(&mut self) -> CoreResult<u64> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(out))
    }

    fn i64(&mut self) -> CoreResult<i64> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(out))
    }
}

/// The program configuration record. Written only by the administrator
/// through the verifier program; this core reads it and never writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainConfig {
    pub zksl_mint: Pubkey,
    pub admin: Pubkey,
    pub aggregator_pubkey: Pubkey,
    pub next_aggregator_pubkey: Pubkey,
    pub activation_seq: u64,
    pub chain_id: u64,
    pub paused: bool,
}

impl OnChainConfig {
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(data, "Config", CONFIG_LABEL)?;
        Ok(Self {
            zksl_mint: r.pubkey()?,
            admin: r.pubkey()?,
            aggregator_pubkey: r.pubkey()?,
            next_aggregator_pubkey: r.pubkey()?,
            activation_seq: r.u64()?,
            chain_id: r.u64()?,
            paused: r.u8()? != 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorState {
    pub aggregator_pubkey: Pubkey,
    pub last_seq: u64,
}

impl AggregatorState {
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(data, "AggregatorState", AGGREGATOR_STATE_LABEL)?;
        Ok(Self {
            aggregator_pubkey: r.pubkey()?,
            last_seq: r.u64()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeState {
    pub last_end_slot: u64,
}

impl RangeState {
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(data, "RangeState", RANGE_STATE_LABEL)?;
        Ok(Self {
            last_end_slot: r.u64()?,
        })
    }
}

/// The anchored tuple. The same body serves as the anchor instruction
/// payload and as the proof-record account layout read back by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRecord {
    pub artifact_id: Uuid,
    pub proof_hash: [u8; 32],
    pub seq: u64,
    pub start_slot: u64,
    pub end_slot: u64,
    pub artifact_len: u32,
    pub state_root_before: [u8; 32],
    pub state_root_after: [u8; 32],
    pub aggregator_pubkey: Pubkey,
    pub timestamp: i64,
    pub ds_hash: [u8; 32],
}

impl ProofRecord {
    fn encode_body(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.artifact_id.as_bytes());
        out.extend_from_slice(&self.proof_hash);
        out.extend_from_slice(&self.seq.to_le_bytes());
        out.extend_from_slice(&self.start_slot.to_le_bytes());
        out.extend_from_slice(&self.end_slot.to_le_bytes());
        out.extend_from_slice(&self.artifact_len.to_le_bytes());
        out.extend_from_slice(&self.state_root_before);
        out.extend_from_slice(&self.state_root_after);
        out.extend_from_slice(self.aggregator_pubkey.as_ref());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.ds_hash);
    }

    fn decode_body(r: &mut Reader<'_>) -> CoreResult<Self> {
        let mut id = [0u8; 16];
        id.copy_from_slice(r.take(16)?);
        Ok(Self {
            artifact_id: Uuid::from_bytes(id),
            proof_hash: r.bytes32()?,
            seq: r.u64()?,
            start_slot: r.u64()?,
            end_slot: r.u64()?,
            artifact_len: r.u32()?,
            state_root_before: r.bytes32()?,
            state_root_after: r.bytes32()?,
            aggregator_pubkey: r.pubkey()?,
            timestamp: r.i64()?,
            ds_hash: r.bytes32()?,
        })
    }

    /// Instruction data for the anchor call: 220 bytes.
    pub fn to_instruction_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ANCHOR_PAYLOAD_LEN);
        out.extend_from_slice(&discriminator(ANCHOR_PROOF_IX_LABEL));
        self.encode_body(&mut out);
        out
    }

    /// Account form: 220 bytes under the proof-record discriminator.
    pub fn encode_account(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ANCHOR_PAYLOAD_LEN);
        out.extend_from_slice(&discriminator(PROOF_RECORD_LABEL));
        self.encode_body(&mut out);
        out
    }

    pub fn decode_account(data: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(data, "ProofRecord", PROOF_RECORD_LABEL)?;
        Self::decode_body(&mut r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorStatus {
    Active,
    Unlocked,
}

impl ValidatorStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Unlocked => "Unlocked",
        }
    }

    fn from_byte(b: u8) -> CoreResult<Self> {
        match b {
            0 => Ok(Self::Active),
            1 => Ok(Self::Unlocked),
            _ => Err(CoreError::MalformedAccount {
                kind: "ValidatorRecord",
            }),
        }
    }

    const fn as_byte(self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Unlocked => 1,
        }
    }
}

/// A registered participant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorRecord {
    pub validator_pubkey: Pubkey,
    pub escrow: Pubkey,
    pub lock_timestamp: i64,
    pub status: ValidatorStatus,
    pub num_accepts: u64,
}

impl ValidatorRecord {
    pub fn encode_account(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(VALIDATOR_RECORD_LEN);
        out.extend_from_slice(&discriminator(VALIDATOR_RECORD_LABEL));
        out.extend_from_slice(self.validator_pubkey.as_ref());
        out.extend_from_slice(self.escrow.as_ref());
        out.extend_from_slice(&self.lock_timestamp.to_le_bytes());
        out.push(self.status.as_byte());
        out.extend_from_slice(&self.num_accepts.to_le_bytes());
        out.extend_from_slice(&[0u8; 47]);
        out
    }

    pub fn decode_account(data: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(data, "ValidatorRecord", VALIDATOR_RECORD_LABEL)?;
        Ok(Self {
            validator_pubkey: r.pubkey()?,
            escrow: r.pubkey()?,
            lock_timestamp: r.i64()?,
            status: ValidatorStatus::from_byte(r.u8()?)?,
            num_accepts: r.u64()?,
        })
    }
}

/// A decoded program-owned account, classified by discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramAccount {
    Proof(ProofRecord),
    Validator(ValidatorRecord),
    Config(OnChainConfig),
}

/// Classify raw account data by its leading discriminator. Returns `None`
/// for record kinds the indexer does not track (aggregator/range state).
pub fn classify_account(data: &[u8]) -> CoreResult<Option<ProgramAccount>> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(CoreError::MalformedAccount { kind: "unknown" });
    }
    let disc = &data[..DISCRIMINATOR_LEN];
    if disc == discriminator(PROOF_RECORD_LABEL) {
        return Ok(Some(ProgramAccount::Proof(ProofRecord::decode_account(
            data,
        )?)));
    }
    if disc == discriminator(VALIDATOR_RECORD_LABEL) {
        return Ok(Some(ProgramAccount::Validator(
            ValidatorRecord::decode_account(data)?,
        )));
    }
    if disc == discriminator(CONFIG_LABEL) {
        return Ok(Some(ProgramAccount::Config(OnChainConfig::decode(data)?)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proof() -> ProofRecord {
        ProofRecord {
            artifact_id: Uuid::from_bytes([0x11; 16]),
            proof_hash: [0x22; 32],
            seq: 7,
            start_slot: 100,
            end_slot: 199,
            artifact_len: 131,
            state_root_before: [0x33; 32],
            state_root_after: [0x44; 32],
            aggregator_pubkey: Pubkey::new_from_array([0x55; 32]),
            timestamp: 1_700_000_000,
            ds_hash: [0x66; 32],
        }
    }

    #[test]
    fn anchor_payload_is_220_bytes_with_known_discriminator() {
        let data = sample_proof().to_instruction_data();
        assert_eq!(data.len(), ANCHOR_PAYLOAD_LEN);
        assert_eq!(data.len(), 220);
        let expected = Sha256::digest(b"global:anchor_proof");
        assert_eq!(&data[..8], &expected[..8]);
    }

    #[test]
    fn proof_record_round_trips_byte_for_byte() {
        let record = sample_proof();
        let encoded = record.encode_account();
        let decoded = ProofRecord::decode_account(&encoded).expect("decode");
        assert_eq!(decoded, record);
        assert_eq!(decoded.encode_account(), encoded);
    }

    #[test]
    fn validator_record_round_trips_byte_for_byte() {
        let record = ValidatorRecord {
            validator_pubkey: Pubkey::new_from_array([1; 32]),
            escrow: Pubkey::new_from_array([2; 32]),
            lock_timestamp: -5,
            status: ValidatorStatus::Unlocked,
            num_accepts: 42,
        };
        let encoded = record.encode_account();
        assert_eq!(encoded.len(), VALIDATOR_RECORD_LEN);
        assert_eq!(encoded.len(), 136);
        let decoded = ValidatorRecord::decode_account(&encoded).expect("decode");
        assert_eq!(decoded, record);
        assert_eq!(decoded.encode_account(), encoded);
    }

    #[test]
    fn wrong_discriminator_is_rejected() {
        let mut data = sample_proof().encode_account();
        data[0] ^= 0xff;
        assert!(ProofRecord::decode_account(&data).is_err());
    }

    #[test]
    fn truncated_record_is_rejected() {
        let data = sample_proof().encode_account();
        assert!(ProofRecord::decode_account(&data[..data.len() - 1]).is_err());
    }

    #[test]
    fn invalid_validator_status_is_rejected() {
        let mut data = ValidatorRecord {
            validator_pubkey: Pubkey::default(),
            escrow: Pubkey::default(),
            lock_timestamp: 0,
            status: ValidatorStatus::Active,
            num_accepts: 0,
        }
        .encode_account();
        data[DISCRIMINATOR_LEN + 72] = 9;
        assert!(ValidatorRecord::decode_account(&data).is_err());
    }

    #[test]
    fn classification_by_discriminator() {
        let proof = sample_proof().encode_account();
        assert!(matches!(
            classify_account(&proof),
            Ok(Some(ProgramAccount::Proof(_)))
        ));

        let validator = ValidatorRecord {
            validator_pubkey: Pubkey::default(),
            escrow: Pubkey::default(),
            lock_timestamp: 0,
            status: ValidatorStatus::Active,
            num_accepts: 0,
        }
        .encode_account();
        assert!(matches!(
            classify_account(&validator),
            Ok(Some(ProgramAccount::Validator(_)))
        ));

        let mut unknown = vec![0u8; 16];
        unknown[..8].copy_from_slice(&discriminator(RANGE_STATE_LABEL));
        assert!(matches!(classify_account(&unknown), Ok(None)));
    }
}
