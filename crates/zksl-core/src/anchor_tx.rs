//! Anchor transaction assembly: compute budget, Ed25519 preflight
//! verification, and the anchor-proof call, in that order.

use crate::accounts::ProofRecord;
use crate::commitment::DS_MESSAGE_LEN;
use crate::pda;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer as _;
use solana_sdk::transaction::Transaction;
use solana_sdk::{ed25519_program, system_program, sysvar};

/// Compute units requested ahead of the anchor call; the verifier requires
/// an explicit compute-budget instruction in the transaction.
pub const ANCHOR_COMPUTE_UNIT_LIMIT: u32 = 200_000;

/// Offsets of the canonical single-signature Ed25519 instruction layout:
/// two header bytes, seven u16 offsets, then pubkey, signature, message.
const ED25519_DATA_START: usize = 16;
const ED25519_PUBKEY_OFFSET: usize = ED25519_DATA_START;
const ED25519_SIGNATURE_OFFSET: usize = ED25519_PUBKEY_OFFSET + 32;
const ED25519_MESSAGE_OFFSET: usize = ED25519_SIGNATURE_OFFSET + 64;
/// Instruction-index sentinel: all references point into this instruction.
const ED25519_SELF_REFERENCE: u16 = u16::MAX;

/// Build the native-program verification instruction for one detached
/// signature over the 110-byte commitment preimage. The payload is fully
/// self-contained so the verifier can re-read it from the sysvar.
pub fn ed25519_verify_instruction(
    pubkey: &[u8; 32],
    signature: &[u8; 64],
    message: &[u8; DS_MESSAGE_LEN],
) -> Instruction {
    let mut data = Vec::with_capacity(ED25519_MESSAGE_OFFSET + DS_MESSAGE_LEN);
    data.push(1); // num_signatures
    data.push(0); // padding
    data.extend_from_slice(&(ED25519_SIGNATURE_OFFSET as u16).to_le_bytes());
    data.extend_from_slice(&ED25519_SELF_REFERENCE.to_le_bytes());
    data.extend_from_slice(&(ED25519_PUBKEY_OFFSET as u16).to_le_bytes());
    data.extend_from_slice(&ED25519_SELF_REFERENCE.to_le_bytes());
    data.extend_from_slice(&(ED25519_MESSAGE_OFFSET as u16).to_le_bytes());
    data.extend_from_slice(&(DS_MESSAGE_LEN as u16).to_le_bytes());
    data.extend_from_slice(&ED25519_SELF_REFERENCE.to_le_bytes());
    data.extend_from_slice(pubkey);
    data.extend_from_slice(signature);
    data.extend_from_slice(message);

    Instruction {
        program_id: ed25519_program::ID,
        accounts: Vec::new(),
        data,
    }
}

/// The anchor-proof call. Key order matters to the verifier: fee payer,
/// config, aggregator state, range state, proof record, instructions
/// sysvar, system program.
pub fn anchor_instruction(program_id: &Pubkey, payer: &Pubkey, record: &ProofRecord) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(pda::config_address(program_id), false),
        AccountMeta::new(pda::aggregator_state_address(program_id), false),
        AccountMeta::new(pda::range_state_address(program_id), false),
        AccountMeta::new(
            pda::proof_record_address(program_id, &record.proof_hash, record.seq),
            false,
        ),
        AccountMeta::new_readonly(sysvar::instructions::ID, false),
        AccountMeta::new_readonly(system_program::ID, false),
    ];
    Instruction {
        program_id: *program_id,
        accounts,
        data: record.to_instruction_data(),
    }
}

/// Compose and sign the full three-instruction transaction.
pub fn anchor_transaction(
    program_id: &Pubkey,
    payer: &Keypair,
    record: &ProofRecord,
    aggregator_pubkey: &[u8; 32],
    signature: &[u8; 64],
    preimage: &[u8; DS_MESSAGE_LEN],
    recent_blockhash: Hash,
) -> Transaction {
    let instructions = [
        ComputeBudgetInstruction::set_compute_unit_limit(ANCHOR_COMPUTE_UNIT_LIMIT),
        ed25519_verify_instruction(aggregator_pubkey, signature, preimage),
        anchor_instruction(program_id, &payer.pubkey(), record),
    ];
    Transaction::new(
        &[payer],
        Message::new(&instructions, Some(&payer.pubkey())),
        recent_blockhash,
    )
}
