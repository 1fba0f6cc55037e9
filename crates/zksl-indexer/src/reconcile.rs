//! Reconciliation: walk pending rows oldest-first, re-query their
//! signatures, bump commitment levels, and purge rows the ledger has
//! forgotten.
//!
//! ```text
//!     (absent)
//!        │  polling discovers + signature resolved
//!        ▼
//!    processed (0) ── confirmed ──▶ confirmed (1)
//!        │                             │ finalized
//!        │ dropped >60s                 ▼
//!        ▼                         finalized (2) ── terminal
//!      purged
//! ```

use crate::error::IndexerResult;
use crate::ledger_view::LedgerView;
use crate::{DROP_AFTER, RECONCILE_BATCH};
use zksl_store::Store;

pub async fn run_reconcile_cycle(store: &Store, view: &LedgerView, now: i64) -> IndexerResult<()> {
    let pending = store.pending_proofs(RECONCILE_BATCH)?;
    for row in pending {
        let status = match &row.txid {
            Some(txid) => match view.signature_status(txid).await {
                Ok(status) => status,
                Err(err) => {
                    tracing::warn!(txid = %txid, error = %err, "status re-query failed; retrying next cycle");
                    continue;
                }
            },
            None => None,
        };
        match status {
            Some(level) if level > row.commitment_level => {
                store.set_commitment_level(&row.proof_hash, row.seq, level)?;
                tracing::info!(
                    seq = %row.seq,
                    level = %level.as_str(),
                    "commitment level advanced"
                );
            }
            Some(_) => {}
            None => {
                let age = now.saturating_sub(row.ts);
                if age > DROP_AFTER.as_secs() as i64 {
                    store.delete_proof(&row.proof_hash, row.seq)?;
                    tracing::warn!(
                        seq = %row.seq,
                        age_secs = %age,
                        "purged proof with no ledger record; transaction presumed dropped"
                    );
                }
            }
        }
    }
    store.stamp_reconciled(now)?;
    Ok(())
}
