//! The submission orchestrator: next-seq derivation, chain-id and key
//! checks, commitment signing, and the anchor call.

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use solana_sdk::pubkey::Pubkey;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;
use zksl_core::accounts::ProofRecord;
use zksl_core::artifact::{artifact_id_from_proof_hash, Artifact};
use zksl_core::commitment::{commitment_digest, commitment_preimage};

#[derive(Debug, Clone)]
pub struct AnchorOutcome {
    pub aggregator_signature: String,
    pub ds_hash: String,
    pub transaction_id: String,
    pub seq: u64,
}

pub async fn anchor_artifact(state: &AppState, artifact_id: &Uuid) -> ApiResult<AnchorOutcome> {
    let bytes = state
        .artifacts()
        .read(artifact_id)?
        .ok_or(ApiError::NotFound)?;
    let artifact: Artifact = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::AnchorSubmitFailed(format!("stored artifact unreadable: {e}")))?;
    let proof_hash = artifact.proof_hash()?;
    if artifact_id_from_proof_hash(&proof_hash) != *artifact_id {
        return Err(ApiError::AnchorSubmitFailed(
            "stored artifact does not match its identifier".to_string(),
        ));
    }

    let cfg = state.config();
    let view = state.ledger().chain_view(&cfg.program_id).await?;
    if view.config.chain_id != cfg.chain_id {
        return Err(ApiError::ChainIdMismatch {
            local: cfg.chain_id,
            onchain: view.config.chain_id,
        });
    }

    let seq = view.last_seq + 1;
    state.signer().ensure_allowed(&view.config, seq)?;

    let preimage = commitment_preimage(
        cfg.chain_id,
        &cfg.program_id,
        &proof_hash,
        artifact.start_slot,
        artifact.end_slot,
        seq,
    );
    let ds_hash = commitment_digest(&preimage);
    let signature = state.signer().sign_commitment(&preimage);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| ApiError::AnchorSubmitFailed("system clock before epoch".to_string()))?
        .as_secs() as i64;

    let record = ProofRecord {
        artifact_id: *artifact_id,
        proof_hash,
        seq,
        start_slot: artifact.start_slot,
        end_slot: artifact.end_slot,
        artifact_len: bytes.len() as u32,
        state_root_before: *artifact.state_root_before.as_bytes(),
        state_root_after: *artifact.state_root_after.as_bytes(),
        aggregator_pubkey: Pubkey::new_from_array(state.signer().public_key()),
        timestamp,
        ds_hash,
    };

    let transaction_id = state
        .ledger()
        .submit_anchor(&cfg.program_id, &record, &signature, &preimage)
        .await?;

    tracing::info!(
        artifact_id = %artifact_id,
        seq = %seq,
        transaction_id = %transaction_id,
        ds_hash = %hex::encode(ds_hash),
        "anchored proof"
    );

    Ok(AnchorOutcome {
        aggregator_signature: hex::encode(signature),
        ds_hash: hex::encode(ds_hash),
        transaction_id,
        seq,
    })
}
