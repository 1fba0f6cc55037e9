//! The indexer's read-only view of the ledger, with an in-memory variant
//! for tests.

use crate::error::{IndexerError, IndexerResult};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::TransactionConfirmationStatus;
use std::collections::HashMap;
use std::str::FromStr;
use zksl_store::CommitmentLevel;

pub enum LedgerView {
    Rpc(RpcView),
    Mock(MockView),
}

impl LedgerView {
    /// All program-owned accounts with their raw data.
    pub async fn program_accounts(
        &self,
        program_id: &Pubkey,
    ) -> IndexerResult<Vec<(Pubkey, Vec<u8>)>> {
        match self {
            Self::Rpc(rpc) => rpc.program_accounts(program_id).await,
            Self::Mock(mock) => Ok(mock.accounts.clone()),
        }
    }

    /// The earliest transaction signature that wrote `address`, if any.
    pub async fn earliest_signature(&self, address: &Pubkey) -> IndexerResult<Option<String>> {
        match self {
            Self::Rpc(rpc) => rpc.earliest_signature(address).await,
            Self::Mock(mock) => Ok(mock.signatures.get(address).cloned()),
        }
    }

    /// The ledger's confirmation status for a signature; `None` means the
    /// ledger has no record of it.
    pub async fn signature_status(&self, txid: &str) -> IndexerResult<Option<CommitmentLevel>> {
        match self {
            Self::Rpc(rpc) => rpc.signature_status(txid).await,
            Self::Mock(mock) => Ok(mock.statuses.get(txid).copied()),
        }
    }
}

pub struct RpcView {
    rpc: RpcClient,
}

impl RpcView {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
        }
    }

    async fn program_accounts(&self, program_id: &Pubkey) -> IndexerResult<Vec<(Pubkey, Vec<u8>)>> {
        let accounts = self
            .rpc
            .get_program_accounts(program_id)
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?;
        Ok(accounts
            .into_iter()
            .map(|(pubkey, account)| (pubkey, account.data))
            .collect())
    }

    async fn earliest_signature(&self, address: &Pubkey) -> IndexerResult<Option<String>> {
        // Newest-first from the node; the tail entry is the earliest write.
        let signatures = self
            .rpc
            .get_signatures_for_address(address)
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?;
        Ok(signatures.last().map(|s| s.signature.clone()))
    }

    async fn signature_status(&self, txid: &str) -> IndexerResult<Option<CommitmentLevel>> {
        let Ok(signature) = Signature::from_str(txid) else {
            tracing::debug!(txid = %txid, "unparseable signature; treating as unknown");
            return Ok(None);
        };
        let statuses = self
            .rpc
            .get_signature_statuses(&[signature])
            .await
            .map_err(|e| IndexerError::Rpc(e.to_string()))?;
        let Some(status) = statuses.value.into_iter().next().flatten() else {
            return Ok(None);
        };
        Ok(Some(match status.confirmation_status {
            Some(TransactionConfirmationStatus::Finalized) => CommitmentLevel::Finalized,
            Some(TransactionConfirmationStatus::Confirmed) => CommitmentLevel::Confirmed,
            Some(TransactionConfirmationStatus::Processed) | None => CommitmentLevel::Processed,
        }))
    }
}

/// Fixture-backed view for cycle tests.
#[derive(Default)]
pub struct MockView {
    pub accounts: Vec<(Pubkey, Vec<u8>)>,
    pub signatures: HashMap<Pubkey, String>,
    pub statuses: HashMap<String, CommitmentLevel>,
}

impl MockView {
    pub fn into_view(self) -> LedgerView {
        LedgerView::Mock(self)
    }
}
