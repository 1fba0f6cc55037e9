//! The polling discipline: fetch every program-owned account, decode,
//! resolve fresh proof records to verified signatures, and advance the
//! persisted cursor.

use crate::error::IndexerResult;
use crate::ledger_view::LedgerView;
use solana_sdk::pubkey::Pubkey;
use zksl_core::accounts::{classify_account, ProgramAccount, ProofRecord, ValidatorRecord};
use zksl_core::pda;
use zksl_store::{CommitmentLevel, ProofRow, Store, ValidatorRow};

/// One full scan cycle: stamp, fetch, decode, resolve, upsert, advance.
pub async fn run_scan_cycle(
    store: &Store,
    view: &LedgerView,
    program_id: &Pubkey,
    now: i64,
) -> IndexerResult<()> {
    store.stamp_scan(now)?;
    let cursor = store.cursor()?;
    let accounts = view.program_accounts(program_id).await?;

    let mut proofs: Vec<ProofRecord> = Vec::new();
    for (address, data) in &accounts {
        match classify_account(data) {
            Ok(Some(ProgramAccount::Proof(record))) => proofs.push(record),
            Ok(Some(ProgramAccount::Validator(record))) => {
                upsert_validator(store, &record, now)?;
            }
            Ok(Some(ProgramAccount::Config(config))) => {
                tracing::debug!(chain_id = %config.chain_id, paused = %config.paused, "config record observed");
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(address = %address, error = %err, "undecodable program account; skipping");
            }
        }
    }

    let mut max_end_slot = cursor.last_seen_slot;
    let mut last_confirmed_signature: Option<String> = None;

    for record in &proofs {
        if record.end_slot <= cursor.last_seen_slot {
            continue;
        }
        let address = pda::proof_record_address(program_id, &record.proof_hash, record.seq);
        let signature = match view.earliest_signature(&address).await {
            Ok(Some(signature)) => signature,
            Ok(None) => {
                tracing::debug!(address = %address, seq = %record.seq, "no signature for proof record yet");
                continue;
            }
            Err(err) => {
                tracing::warn!(address = %address, error = %err, "signature lookup failed; retrying next cycle");
                continue;
            }
        };
        let level = match view.signature_status(&signature).await {
            Ok(Some(level)) => level,
            Ok(None) => CommitmentLevel::Processed,
            Err(err) => {
                tracing::warn!(txid = %signature, error = %err, "status lookup failed; retrying next cycle");
                continue;
            }
        };
        store.upsert_proof(&proof_row(record, level, Some(signature.clone())))?;
        max_end_slot = max_end_slot.max(record.end_slot);
        tracing::info!(
            seq = %record.seq,
            end_slot = %record.end_slot,
            level = %level.as_str(),
            txid = %signature,
            "indexed proof record"
        );
        if level >= CommitmentLevel::Confirmed {
            last_confirmed_signature = Some(signature);
        }
    }

    store.advance_cursor(max_end_slot, last_confirmed_signature.as_deref())?;
    Ok(())
}

fn upsert_validator(store: &Store, record: &ValidatorRecord, now: i64) -> IndexerResult<()> {
    store.upsert_validator(&ValidatorRow {
        pubkey: record.validator_pubkey.to_string(),
        status: record.status.as_str().to_string(),
        escrow: record.escrow.to_string(),
        lock_ts: record.lock_timestamp,
        unlock_ts: None,
        num_accepts: record.num_accepts,
        last_seen: now,
    })?;
    Ok(())
}

fn proof_row(record: &ProofRecord, level: CommitmentLevel, txid: Option<String>) -> ProofRow {
    ProofRow {
        artifact_id: record.artifact_id.to_string(),
        start_slot: record.start_slot,
        end_slot: record.end_slot,
        proof_hash: record.proof_hash,
        ds_hash: record.ds_hash,
        artifact_len: record.artifact_len,
        state_root_before: record.state_root_before,
        state_root_after: record.state_root_after,
        submitted_by: None,
        aggregator_pubkey: record.aggregator_pubkey.to_string(),
        ts: record.timestamp,
        seq: record.seq,
        commitment_level: level,
        txid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger_view::MockView;
    use uuid::Uuid;
    use zksl_core::accounts::ValidatorStatus;

    fn proof_record(seq: u64, end_slot: u64) -> ProofRecord {
        ProofRecord {
            artifact_id: Uuid::from_bytes([seq as u8; 16]),
            proof_hash: [seq as u8; 32],
            seq,
            start_slot: end_slot.saturating_sub(9),
            end_slot,
            artifact_len: 42,
            state_root_before: [1; 32],
            state_root_after: [2; 32],
            aggregator_pubkey: Pubkey::new_from_array([3; 32]),
            timestamp: 1_000,
            ds_hash: [4; 32],
        }
    }

    fn program_id() -> Pubkey {
        Pubkey::new_from_array([9; 32])
    }

    #[tokio::test]
    async fn scan_indexes_fresh_proofs_with_signatures() {
        let store = Store::open_in_memory().expect("store");
        let record = proof_record(1, 100);
        let address = pda::proof_record_address(&program_id(), &record.proof_hash, 1);

        let mut mock = MockView::default();
        mock.accounts
            .push((address, record.encode_account()));
        mock.signatures.insert(address, "sig-1".to_string());
        mock.statuses
            .insert("sig-1".to_string(), CommitmentLevel::Confirmed);

        run_scan_cycle(&store, &mock.into_view(), &program_id(), 500)
            .await
            .expect("scan");

        let row = store
            .proof_by_key(&record.proof_hash, 1)
            .expect("query")
            .expect("row");
        assert_eq!(row.commitment_level, CommitmentLevel::Confirmed);
        assert_eq!(row.txid.as_deref(), Some("sig-1"));

        let cursor = store.cursor().expect("cursor");
        assert_eq!(cursor.last_seen_slot, 100);
        assert_eq!(cursor.last_signature.as_deref(), Some("sig-1"));
        assert_eq!(cursor.last_scan_ts, Some(500));
    }

    #[tokio::test]
    async fn proofs_behind_the_cursor_are_not_re_resolved() {
        let store = Store::open_in_memory().expect("store");
        store.advance_cursor(100, None).expect("cursor");

        let record = proof_record(1, 100);
        let address = pda::proof_record_address(&program_id(), &record.proof_hash, 1);
        let mut mock = MockView::default();
        mock.accounts.push((address, record.encode_account()));
        mock.signatures.insert(address, "sig-1".to_string());

        run_scan_cycle(&store, &mock.into_view(), &program_id(), 500)
            .await
            .expect("scan");
        assert!(store
            .proof_by_key(&record.proof_hash, 1)
            .expect("query")
            .is_none());
    }

    #[tokio::test]
    async fn unresolved_signatures_hold_the_cursor_for_a_retry() {
        let store = Store::open_in_memory().expect("store");
        let record = proof_record(2, 250);
        let address = pda::proof_record_address(&program_id(), &record.proof_hash, 2);
        let mut mock = MockView::default();
        mock.accounts.push((address, record.encode_account()));
        // No signature fixture: the node has not surfaced a write yet.

        run_scan_cycle(&store, &mock.into_view(), &program_id(), 500)
            .await
            .expect("scan");
        assert!(store
            .proof_by_key(&record.proof_hash, 2)
            .expect("query")
            .is_none());
        // The cursor must not move past the unresolved record, so the
        // next cycle picks it up again.
        assert_eq!(store.cursor().expect("cursor").last_seen_slot, 0);
    }

    #[tokio::test]
    async fn validators_and_garbage_are_handled_in_one_pass() {
        let store = Store::open_in_memory().expect("store");
        let validator = ValidatorRecord {
            validator_pubkey: Pubkey::new_from_array([5; 32]),
            escrow: Pubkey::new_from_array([6; 32]),
            lock_timestamp: 123,
            status: ValidatorStatus::Active,
            num_accepts: 2,
        };
        let mut mock = MockView::default();
        mock.accounts
            .push((Pubkey::new_from_array([8; 32]), validator.encode_account()));
        mock.accounts
            .push((Pubkey::new_from_array([7; 32]), vec![0xde, 0xad]));

        run_scan_cycle(&store, &mock.into_view(), &program_id(), 700)
            .await
            .expect("scan survives garbage");

        let row = store
            .validator_by_pubkey(&validator.validator_pubkey.to_string())
            .expect("query")
            .expect("row");
        assert_eq!(row.status, "Active");
        assert_eq!(row.last_seen, 700);
    }
}
