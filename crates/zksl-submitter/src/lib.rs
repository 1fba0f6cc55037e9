//! zksl-submitter
//!
//! The submitter daemon: HTTP ingress, idempotent artifact minting, and
//! the anchor submission pipeline against the ledger.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod anchor;
pub mod artifact_store;
pub mod auth;
pub mod config;
pub mod error;
pub mod idempotency;
pub mod ledger;
pub mod rate_limit;
pub mod server;

pub use crate::error::{ApiError, ApiResult};
