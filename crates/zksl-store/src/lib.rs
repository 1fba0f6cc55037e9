// Copyright (c) 2026 zkSL Labs and zkSealevel Contributors
// SPDX-License-Identifier: Apache-2.0

//! zksl-store
//!
//! The relational store that the indexer writes and the submitter reads.
//! Primary-key conflict handling is the authoritative ordering device:
//! proofs are keyed by `(proof_hash, seq)` and re-inserts update only the
//! commitment level; validators are keyed by pubkey and re-inserts update
//! status, accept counter, and last-seen timestamp.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid commitment level {0}")]
    InvalidCommitmentLevel(i64),

    #[error("invalid validator status `{0}`")]
    InvalidValidatorStatus(String),
}

/// Ledger-assigned finality grade. `Finalized` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommitmentLevel {
    Processed = 0,
    Confirmed = 1,
    Finalized = 2,
}

impl CommitmentLevel {
    pub const fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(v: i64) -> StoreResult<Self> {
        match v {
            0 => Ok(Self::Processed),
            1 => Ok(Self::Confirmed),
            2 => Ok(Self::Finalized),
            other => Err(StoreError::InvalidCommitmentLevel(other)),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRow {
    pub artifact_id: String,
    pub start_slot: u64,
    pub end_slot: u64,
    pub proof_hash: [u8; 32],
    pub ds_hash: [u8; 32],
    pub artifact_len: u32,
    pub state_root_before: [u8; 32],
    pub state_root_after: [u8; 32],
    pub submitted_by: Option<String>,
    pub aggregator_pubkey: String,
    pub ts: i64,
    pub seq: u64,
    pub commitment_level: CommitmentLevel,
    pub txid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRow {
    pub pubkey: String,
    pub status: String,
    pub escrow: String,
    pub lock_ts: i64,
    pub unlock_ts: Option<i64>,
    pub num_accepts: u64,
    pub last_seen: i64,
}

/// The single cursor row that survives indexer restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexerCursor {
    pub last_scan_ts: Option<i64>,
    pub last_seen_slot: u64,
    pub last_signature: Option<String>,
    pub last_reconciled_ts: Option<i64>,
}

/// A row still below finality, as selected for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingProof {
    pub proof_hash: [u8; 32],
    pub seq: u64,
    pub txid: Option<String>,
    pub ts: i64,
    pub commitment_level: CommitmentLevel,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Insert or refresh a proof. A re-insert of an existing
    /// `(proof_hash, seq)` updates only the commitment level.
    ///
    /// The refresh path is an explicit UPDATE rather than an upsert
    /// clause: the table carries further UNIQUE columns (artifact_id,
    /// txid) and SQLite refuses `ON CONFLICT` resolution for uniqueness
    /// violations outside the conflict target, even from the same row.
    pub fn upsert_proof(&self, row: &ProofRow) -> StoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE proofs SET commitment_level = ?3 WHERE proof_hash = ?1 AND seq = ?2",
            params![
                row.proof_hash.as_slice(),
                row.seq as i64,
                row.commitment_level.as_i64(),
            ],
        )?;
        if updated > 0 {
            return Ok(());
        }
        self.conn.execute(
            "INSERT INTO proofs(
                proof_hash, seq, artifact_id, start_slot, end_slot, ds_hash,
                artifact_len, state_root_before, state_root_after,
                submitted_by, aggregator_pubkey, ts, commitment_level, txid
             ) VALUES(?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                row.proof_hash.as_slice(),
                row.seq as i64,
                row.artifact_id,
                row.start_slot as i64,
                row.end_slot as i64,
                row.ds_hash.as_slice(),
                row.artifact_len,
                row.state_root_before.as_slice(),
                row.state_root_after.as_slice(),
                row.submitted_by,
                row.aggregator_pubkey,
                row.ts,
                row.commitment_level.as_i64(),
                row.txid,
            ],
        )?;
        Ok(())
    }

    pub fn proof_by_artifact_id(&self, artifact_id: &str) -> StoreResult<Option<ProofRow>> {
        self.conn
            .query_row(
                &format!("{PROOF_SELECT} WHERE artifact_id = ?1"),
                params![artifact_id],
                proof_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn proof_by_key(&self, proof_hash: &[u8; 32], seq: u64) -> StoreResult<Option<ProofRow>> {
        self.conn
            .query_row(
                &format!("{PROOF_SELECT} WHERE proof_hash = ?1 AND seq = ?2"),
                params![proof_hash.as_slice(), seq as i64],
                proof_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Rows below `finalized`, oldest first, bounded for one cycle.
    pub fn pending_proofs(&self, limit: usize) -> StoreResult<Vec<PendingProof>> {
        let mut stmt = self.conn.prepare(
            "SELECT proof_hash, seq, txid, ts, commitment_level FROM proofs
             WHERE commitment_level < 2 ORDER BY ts ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |r| {
            let hash: Vec<u8> = r.get(0)?;
            let seq: i64 = r.get(1)?;
            let txid: Option<String> = r.get(2)?;
            let ts: i64 = r.get(3)?;
            let level: i64 = r.get(4)?;
            Ok((hash, seq, txid, ts, level))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (hash, seq, txid, ts, level) = row?;
            out.push(PendingProof {
                proof_hash: blob32(&hash)?,
                seq: seq as u64,
                txid,
                ts,
                commitment_level: CommitmentLevel::from_i64(level)?,
            });
        }
        Ok(out)
    }

    pub fn set_commitment_level(
        &self,
        proof_hash: &[u8; 32],
        seq: u64,
        level: CommitmentLevel,
    ) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE proofs SET commitment_level = ?3 WHERE proof_hash = ?1 AND seq = ?2",
            params![proof_hash.as_slice(), seq as i64, level.as_i64()],
        )?;
        Ok(())
    }

    /// Remove a row whose transaction the ledger no longer knows.
    pub fn delete_proof(&self, proof_hash: &[u8; 32], seq: u64) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM proofs WHERE proof_hash = ?1 AND seq = ?2",
            params![proof_hash.as_slice(), seq as i64],
        )?;
        Ok(())
    }

    /// Insert or refresh a validator. Re-inserts keep the original lock
    /// timestamp and update status, accept counter, and last-seen.
    pub fn upsert_validator(&self, row: &ValidatorRow) -> StoreResult<()> {
        if row.status != "Active" && row.status != "Unlocked" {
            return Err(StoreError::InvalidValidatorStatus(row.status.clone()));
        }
        self.conn.execute(
            "INSERT INTO validators(pubkey, status, escrow, lock_ts, unlock_ts, num_accepts, last_seen)
             VALUES(?1,?2,?3,?4,?5,?6,?7)
             ON CONFLICT(pubkey) DO UPDATE SET
                status = excluded.status,
                unlock_ts = excluded.unlock_ts,
                num_accepts = excluded.num_accepts,
                last_seen = excluded.last_seen",
            params![
                row.pubkey,
                row.status,
                row.escrow,
                row.lock_ts,
                row.unlock_ts,
                row.num_accepts as i64,
                row.last_seen,
            ],
        )?;
        Ok(())
    }

    pub fn validator_by_pubkey(&self, pubkey: &str) -> StoreResult<Option<ValidatorRow>> {
        self.conn
            .query_row(
                "SELECT pubkey, status, escrow, lock_ts, unlock_ts, num_accepts, last_seen
                 FROM validators WHERE pubkey = ?1",
                params![pubkey],
                |r| {
                    Ok(ValidatorRow {
                        pubkey: r.get(0)?,
                        status: r.get(1)?,
                        escrow: r.get(2)?,
                        lock_ts: r.get(3)?,
                        unlock_ts: r.get(4)?,
                        num_accepts: r.get::<_, i64>(5)? as u64,
                        last_seen: r.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn cursor(&self) -> StoreResult<IndexerCursor> {
        let row = self
            .conn
            .query_row(
                "SELECT last_scan_ts, last_seen_slot, last_signature, last_reconciled_ts
                 FROM indexer_state WHERE id = 1",
                [],
                |r| {
                    Ok(IndexerCursor {
                        last_scan_ts: r.get(0)?,
                        last_seen_slot: r.get::<_, i64>(1)? as u64,
                        last_signature: r.get(2)?,
                        last_reconciled_ts: r.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row.unwrap_or_default())
    }

    pub fn stamp_scan(&self, ts: i64) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO indexer_state(id, last_scan_ts) VALUES(1, ?1)
             ON CONFLICT(id) DO UPDATE SET last_scan_ts = excluded.last_scan_ts",
            params![ts],
        )?;
        Ok(())
    }

    pub fn stamp_reconciled(&self, ts: i64) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO indexer_state(id, last_reconciled_ts) VALUES(1, ?1)
             ON CONFLICT(id) DO UPDATE SET last_reconciled_ts = excluded.last_reconciled_ts",
            params![ts],
        )?;
        Ok(())
    }

    pub fn advance_cursor(
        &self,
        last_seen_slot: u64,
        last_signature: Option<&str>,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO indexer_state(id, last_seen_slot, last_signature)
             VALUES(1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                last_seen_slot = MAX(indexer_state.last_seen_slot, excluded.last_seen_slot),
                last_signature = COALESCE(excluded.last_signature, indexer_state.last_signature)",
            params![last_seen_slot as i64, last_signature],
        )?;
        Ok(())
    }
}

const PROOF_SELECT: &str = "SELECT proof_hash, seq, artifact_id, start_slot, end_slot, ds_hash,
        artifact_len, state_root_before, state_root_after, submitted_by,
        aggregator_pubkey, ts, commitment_level, txid FROM proofs";

fn proof_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<ProofRow> {
    let hash: Vec<u8> = r.get(0)?;
    let ds: Vec<u8> = r.get(5)?;
    let before: Vec<u8> = r.get(7)?;
    let after: Vec<u8> = r.get(8)?;
    let level: i64 = r.get(12)?;
    Ok(ProofRow {
        proof_hash: blob32(&hash).map_err(|_| rusqlite::Error::InvalidQuery)?,
        seq: r.get::<_, i64>(1)? as u64,
        artifact_id: r.get(2)?,
        start_slot: r.get::<_, i64>(3)? as u64,
        end_slot: r.get::<_, i64>(4)? as u64,
        ds_hash: blob32(&ds).map_err(|_| rusqlite::Error::InvalidQuery)?,
        artifact_len: r.get(6)?,
        state_root_before: blob32(&before).map_err(|_| rusqlite::Error::InvalidQuery)?,
        state_root_after: blob32(&after).map_err(|_| rusqlite::Error::InvalidQuery)?,
        submitted_by: r.get(9)?,
        aggregator_pubkey: r.get(10)?,
        ts: r.get(11)?,
        commitment_level: CommitmentLevel::from_i64(level)
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        txid: r.get(13)?,
    })
}

fn blob32(v: &[u8]) -> StoreResult<[u8; 32]> {
    let mut out = [0u8; 32];
    if v.len() != 32 {
        return Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
    }
    out.copy_from_slice(v);
    Ok(out)
}

fn apply_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;
         CREATE TABLE IF NOT EXISTS proofs(
            proof_hash BLOB NOT NULL,
            seq INTEGER NOT NULL,
            artifact_id TEXT NOT NULL UNIQUE,
            start_slot INTEGER NOT NULL,
            end_slot INTEGER NOT NULL,
            ds_hash BLOB NOT NULL,
            artifact_len INTEGER NOT NULL CHECK(artifact_len BETWEEN 0 AND 524288),
            state_root_before BLOB NOT NULL,
            state_root_after BLOB NOT NULL,
            submitted_by TEXT,
            aggregator_pubkey TEXT NOT NULL,
            ts INTEGER NOT NULL,
            commitment_level INTEGER NOT NULL CHECK(commitment_level IN (0,1,2)),
            txid TEXT UNIQUE,
            PRIMARY KEY(proof_hash, seq)
         );
         CREATE INDEX IF NOT EXISTS proofs_pending_idx ON proofs(commitment_level, ts);
         CREATE INDEX IF NOT EXISTS proofs_end_slot_idx ON proofs(end_slot);
         CREATE TABLE IF NOT EXISTS validators(
            pubkey TEXT PRIMARY KEY,
            status TEXT NOT NULL CHECK(status IN ('Active','Unlocked')),
            escrow TEXT NOT NULL,
            lock_ts INTEGER NOT NULL,
            unlock_ts INTEGER,
            num_accepts INTEGER NOT NULL,
            last_seen INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS indexer_state(
            id INTEGER PRIMARY KEY CHECK(id = 1),
            last_scan_ts INTEGER,
            last_seen_slot INTEGER NOT NULL DEFAULT 0,
            last_signature TEXT,
            last_reconciled_ts INTEGER
         );",
    )?;
    Ok(())
}
