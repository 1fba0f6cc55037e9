//! The streaming discipline: program account-change subscription over
//! websocket. Validator records upsert immediately; proof records are
//! left to the polling path, which has a verified transaction id.

use crate::error::{IndexerError, IndexerResult};
use futures_util::StreamExt as _;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use zksl_core::accounts::{classify_account, ProgramAccount};
use zksl_store::{Store, ValidatorRow};

/// Run one subscription until the stream ends or errors. The caller
/// reconnects with backoff.
pub async fn run_stream(ws_url: &str, program_id: &Pubkey, store: &Store) -> IndexerResult<()> {
    let client = PubsubClient::new(ws_url)
        .await
        .map_err(|e| IndexerError::Subscription(e.to_string()))?;
    let config = RpcProgramAccountsConfig {
        filters: None,
        account_config: RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            ..RpcAccountInfoConfig::default()
        },
        ..RpcProgramAccountsConfig::default()
    };
    let (mut updates, _unsubscribe) = client
        .program_subscribe(program_id, Some(config))
        .await
        .map_err(|e| IndexerError::Subscription(e.to_string()))?;

    tracing::info!(program_id = %program_id, "account-change subscription established");
    while let Some(update) = updates.next().await {
        let Some(data) = update.value.account.data.decode() else {
            tracing::warn!(pubkey = %update.value.pubkey, "account update with undecodable payload");
            continue;
        };
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        if let Err(err) = handle_account_update(store, &data, now) {
            tracing::warn!(pubkey = %update.value.pubkey, error = %err, "account update skipped");
        }
    }
    Err(IndexerError::Subscription("stream closed".to_string()))
}

/// Decode one account update. Proof records are intentionally not
/// upserted here; the stream lacks a verified transaction id.
pub fn handle_account_update(store: &Store, data: &[u8], now: i64) -> IndexerResult<()> {
    match classify_account(data) {
        Ok(Some(ProgramAccount::Validator(record))) => {
            store.upsert_validator(&ValidatorRow {
                pubkey: record.validator_pubkey.to_string(),
                status: record.status.as_str().to_string(),
                escrow: record.escrow.to_string(),
                lock_ts: record.lock_timestamp,
                unlock_ts: None,
                num_accepts: record.num_accepts,
                last_seen: now,
            })?;
            tracing::info!(
                pubkey = %record.validator_pubkey,
                status = %record.status.as_str(),
                "validator record streamed"
            );
        }
        Ok(Some(ProgramAccount::Proof(record))) => {
            tracing::debug!(seq = %record.seq, "proof record streamed; deferring to polling path");
        }
        Ok(Some(ProgramAccount::Config(config))) => {
            tracing::debug!(chain_id = %config.chain_id, "config record streamed");
        }
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %err, "undecodable streamed account; skipping");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use zksl_core::accounts::{ProofRecord, ValidatorRecord, ValidatorStatus};

    #[test]
    fn validator_updates_upsert_immediately() {
        let store = Store::open_in_memory().expect("store");
        let record = ValidatorRecord {
            validator_pubkey: Pubkey::new_from_array([1; 32]),
            escrow: Pubkey::new_from_array([2; 32]),
            lock_timestamp: 55,
            status: ValidatorStatus::Active,
            num_accepts: 9,
        };
        handle_account_update(&store, &record.encode_account(), 1_000).expect("update");

        let row = store
            .validator_by_pubkey(&record.validator_pubkey.to_string())
            .expect("query")
            .expect("row");
        assert_eq!(row.num_accepts, 9);
        assert_eq!(row.lock_ts, 55);
    }

    #[test]
    fn proof_updates_are_deferred_to_polling() {
        let store = Store::open_in_memory().expect("store");
        let record = ProofRecord {
            artifact_id: Uuid::from_bytes([1; 16]),
            proof_hash: [2; 32],
            seq: 1,
            start_slot: 1,
            end_slot: 2,
            artifact_len: 10,
            state_root_before: [0; 32],
            state_root_after: [0; 32],
            aggregator_pubkey: Pubkey::default(),
            timestamp: 0,
            ds_hash: [0; 32],
        };
        handle_account_update(&store, &record.encode_account(), 1_000).expect("update");
        assert!(store.proof_by_key(&[2; 32], 1).expect("query").is_none());
    }

    #[test]
    fn garbage_is_logged_and_skipped() {
        let store = Store::open_in_memory().expect("store");
        handle_account_update(&store, &[1, 2, 3], 1_000).expect("garbage tolerated");
    }
}
