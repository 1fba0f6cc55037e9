// Copyright (c) 2026 zkSL Labs and zkSealevel Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use clap::Parser;
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;
use zksl_indexer::ledger_view::{LedgerView, RpcView};
use zksl_indexer::reconcile::run_reconcile_cycle;
use zksl_indexer::scan::run_scan_cycle;
use zksl_indexer::stream::run_stream;
use zksl_indexer::POLL_INTERVAL;
use zksl_store::Store;

const STREAM_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "zksl-indexer")]
#[command(about = "zkSealevel ledger indexer and reconciliation engine")]
struct Args {
    /// Overrides LOG_LEVEL from the environment.
    #[arg(long)]
    log: Option<String>,
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            args.log
                .or_else(|| env("LOG_LEVEL"))
                .unwrap_or_else(|| "info".to_string()),
        ))
        .init();

    let rpc_url = env("RPC_URL").unwrap_or_else(|| "http://127.0.0.1:8899".to_string());
    let ws_url = env("WS_URL").unwrap_or_else(|| {
        rpc_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1)
    });
    let program_id: Pubkey = env("PROGRAM_ID")
        .ok_or("PROGRAM_ID is required")?
        .parse()
        .map_err(|_| "PROGRAM_ID is not a base58 public key")?;
    let database_url = env("DATABASE_URL").unwrap_or_else(|| "./data/zksl.sqlite".to_string());
    let database_path = PathBuf::from(
        database_url
            .strip_prefix("sqlite://")
            .unwrap_or(&database_url),
    );

    tracing::info!(
        program_id = %program_id,
        rpc_url = %rpc_url,
        ws_url = %ws_url,
        database = %database_path.display(),
        "starting zkSealevel indexer"
    );

    // The two disciplines share nothing in memory; each owns a store
    // connection and synchronizes through the database.
    let scan_store = Store::open(&database_path)?;
    let stream_store = Store::open(&database_path)?;
    let view = LedgerView::Rpc(RpcView::new(rpc_url));

    let scan_loop = async {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        loop {
            ticker.tick().await;
            let now = unix_now();
            if let Err(err) = run_scan_cycle(&scan_store, &view, &program_id, now).await {
                tracing::warn!(error = %err, "scan cycle failed; retrying next cycle");
            }
            if let Err(err) = run_reconcile_cycle(&scan_store, &view, now).await {
                tracing::warn!(error = %err, "reconcile cycle failed; retrying next cycle");
            }
        }
    };

    let stream_loop = async {
        loop {
            if let Err(err) = run_stream(&ws_url, &program_id, &stream_store).await {
                tracing::warn!(error = %err, "subscription lost; reconnecting");
            }
            tokio::time::sleep(STREAM_RETRY_DELAY).await;
        }
    };

    tokio::select! {
        _ = scan_loop => {}
        _ = stream_loop => {}
    }
    Ok(())
}
