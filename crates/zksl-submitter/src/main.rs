// Copyright (c) 2026 zkSL Labs and zkSealevel Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use clap::Parser;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use std::net::SocketAddr;
use std::path::Component;
use tracing_subscriber::EnvFilter;
use zksl_core::signer::AggregatorSigner;
use zksl_store::Store;
use zksl_submitter::config::Config;
use zksl_submitter::ledger::{Ledger, LocalLedger, RpcLedger};
use zksl_submitter::server::{router, AppState};

#[derive(Debug, Parser)]
#[command(name = "zksl-submitter")]
#[command(about = "zkSealevel proof anchoring submitter")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Overrides LOG_LEVEL from the environment.
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cfg = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            args.log.clone().unwrap_or_else(|| cfg.log_level.clone()),
        ))
        .init();

    if cfg
        .aggregator_keypair_path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err("aggregator keypair path must not contain parent components".into());
    }
    let signer = AggregatorSigner::load(&cfg.aggregator_keypair_path)?;

    let ledger = if cfg.local_mode {
        tracing::warn!("LOCAL_MODE is set; anchors never reach the ledger");
        Ledger::Local(LocalLedger::new(
            cfg.chain_id,
            Pubkey::new_from_array(signer.public_key()),
        ))
    } else {
        let payer = Keypair::try_from(signer.keypair_bytes().as_slice())
            .map_err(|_| "aggregator keypair is not usable as a fee payer")?;
        Ledger::Rpc(RpcLedger::new(cfg.rpc_url.clone(), payer))
    };

    let store = Store::open(&cfg.database_path)?;
    let addr: SocketAddr = args.listen.parse()?;

    tracing::info!(
        %addr,
        program_id = %cfg.program_id,
        chain_id = %cfg.chain_id,
        local_mode = %cfg.local_mode,
        artifact_dir = %cfg.artifact_dir.display(),
        auth_enabled = %(!cfg.api_keys.is_empty()),
        "starting zkSealevel submitter"
    );

    let state = AppState::new(cfg, signer, ledger, store)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
