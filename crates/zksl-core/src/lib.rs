// Copyright (c) 2026 zkSL Labs and zkSealevel Contributors
// SPDX-License-Identifier: Apache-2.0

//! zksl-core
//!
//! The deterministic protocol layer of the zkSealevel off-chain coordination
//! service. Everything in this crate must produce bit-identical output across
//! independent builds, or the on-chain verifier rejects the submission:
//!
//! - canonical JSON encoding and content-addressed artifact identity
//! - the 110-byte domain-separated commitment preimage and its BLAKE3 digest
//! - aggregator key loading, rotation-aware key selection, and Ed25519 signing
//! - on-ledger account codecs and the 220-byte anchor instruction payload
//! - program-derived address derivation shared with the indexer

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod accounts;
pub mod anchor_tx;
pub mod artifact;
pub mod canonical;
pub mod commitment;
pub mod error;
pub mod pda;
pub mod signer;

pub use crate::error::{CoreError, CoreResult};
