//! Ledger access for the submitter: a real RPC-backed path and a local
//! mode that never contacts a node. Next-seq reads and transaction builds
//! are deliberately not atomic across concurrent requests; the verifier's
//! monotonicity check is the authority and local losers simply retry.

use crate::error::{map_verifier_error, ApiError, ApiResult, VerifierError};
use parking_lot::Mutex;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::InstructionError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::TransactionError;
use zksl_core::accounts::{AggregatorState, OnChainConfig, ProofRecord};
use zksl_core::anchor_tx::anchor_transaction;
use zksl_core::commitment::DS_MESSAGE_LEN;
use zksl_core::pda;

/// The on-ledger context a submission is built against.
#[derive(Debug, Clone)]
pub struct ChainView {
    pub config: OnChainConfig,
    pub last_seq: u64,
}

pub enum Ledger {
    Rpc(RpcLedger),
    Local(LocalLedger),
}

impl Ledger {
    pub async fn chain_view(&self, program_id: &Pubkey) -> ApiResult<ChainView> {
        match self {
            Self::Rpc(rpc) => rpc.chain_view(program_id).await,
            Self::Local(local) => Ok(local.chain_view()),
        }
    }

    pub async fn submit_anchor(
        &self,
        program_id: &Pubkey,
        record: &ProofRecord,
        signature: &[u8; 64],
        preimage: &[u8; DS_MESSAGE_LEN],
    ) -> ApiResult<String> {
        match self {
            Self::Rpc(rpc) => rpc.submit_anchor(program_id, record, signature, preimage).await,
            Self::Local(local) => local.submit_anchor(record),
        }
    }
}

pub struct RpcLedger {
    rpc: RpcClient,
    payer: Keypair,
}

impl RpcLedger {
    pub fn new(rpc_url: String, payer: Keypair) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
            payer,
        }
    }

    async fn chain_view(&self, program_id: &Pubkey) -> ApiResult<ChainView> {
        let config_addr = pda::config_address(program_id);
        let config_account = self
            .rpc
            .get_account_with_commitment(&config_addr, CommitmentConfig::confirmed())
            .await
            .map_err(|_| ApiError::ConfigNotFound)?
            .value
            .ok_or(ApiError::ConfigNotFound)?;
        let config =
            OnChainConfig::decode(&config_account.data).map_err(|_| ApiError::ConfigNotFound)?;

        let state_addr = pda::aggregator_state_address(program_id);
        let state_account = self
            .rpc
            .get_account_with_commitment(&state_addr, CommitmentConfig::confirmed())
            .await
            .map_err(|_| ApiError::FetchLastSeqFailed)?
            .value;
        let last_seq = match state_account {
            Some(account) => {
                AggregatorState::decode(&account.data)
                    .map_err(|_| ApiError::FetchLastSeqFailed)?
                    .last_seq
            }
            None => 0,
        };

        Ok(ChainView { config, last_seq })
    }

    async fn submit_anchor(
        &self,
        program_id: &Pubkey,
        record: &ProofRecord,
        signature: &[u8; 64],
        preimage: &[u8; DS_MESSAGE_LEN],
    ) -> ApiResult<String> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| ApiError::AnchorSubmitFailed(format!("blockhash: {e}")))?;
        let tx = anchor_transaction(
            program_id,
            &self.payer,
            record,
            &record.aggregator_pubkey.to_bytes(),
            signature,
            preimage,
            blockhash,
        );
        match self.rpc.send_transaction(&tx).await {
            Ok(txid) => Ok(txid.to_string()),
            Err(err) => {
                let custom = err.get_transaction_error().and_then(|te| match te {
                    TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
                        Some(code)
                    }
                    _ => None,
                });
                Err(map_verifier_error(custom, &err.to_string()))
            }
        }
    }
}

/// Local mode: a process-local sequence counter and synthesized
/// transaction ids. The monotonicity rule is mirrored so local runs fail
/// the same way the verifier would.
pub struct LocalLedger {
    chain_id: u64,
    aggregator_pubkey: Pubkey,
    last_seq: Mutex<u64>,
}

impl LocalLedger {
    pub fn new(chain_id: u64, aggregator_pubkey: Pubkey) -> Self {
        Self {
            chain_id,
            aggregator_pubkey,
            last_seq: Mutex::new(0),
        }
    }

    fn chain_view(&self) -> ChainView {
        ChainView {
            config: OnChainConfig {
                zksl_mint: Pubkey::default(),
                admin: Pubkey::default(),
                aggregator_pubkey: self.aggregator_pubkey,
                next_aggregator_pubkey: self.aggregator_pubkey,
                activation_seq: u64::MAX,
                chain_id: self.chain_id,
                paused: false,
            },
            last_seq: *self.last_seq.lock(),
        }
    }

    fn submit_anchor(&self, record: &ProofRecord) -> ApiResult<String> {
        let mut last_seq = self.last_seq.lock();
        if record.seq != *last_seq + 1 {
            return Err(ApiError::Verifier(VerifierError::NonMonotonicSeq));
        }
        *last_seq = record.seq;
        Ok(format!("LOCAL-{}", hex::encode(&record.ds_hash[..16])))
    }
}
