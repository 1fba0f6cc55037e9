//! zksl-indexer
//!
//! Reads verifier-program accounts back into the relational store through
//! two cooperating disciplines: a websocket stream for validator records
//! and a 20-second polling scan that resolves proof records to verified
//! transaction signatures, then reconciles transient commitment levels to
//! finality. Decode failures and transient RPC errors are logged and
//! skipped, never fatal.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod error;
pub mod ledger_view;
pub mod reconcile;
pub mod scan;
pub mod stream;

pub use crate::error::{IndexerError, IndexerResult};

use std::time::Duration;

/// Polling cadence; the first scan runs immediately on startup.
pub const POLL_INTERVAL: Duration = Duration::from_secs(20);
/// Upper bound on rows touched per reconciliation cycle.
pub const RECONCILE_BATCH: usize = 100;
/// A pending row whose transaction the ledger no longer knows is purged
/// once it is older than this.
pub const DROP_AFTER: Duration = Duration::from_secs(60);
