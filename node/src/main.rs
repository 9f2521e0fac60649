// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # QReceipt Node
//!
//! Entry point for the `qreceipt-node` binary. Parses CLI arguments and
//! dispatches to one of five subcommands:
//!
//! - `run`: open the ledger, serve the HTTP/WS API and metrics, seal on a timer
//! - `keygen`: generate a wallet or sealer keypair
//! - `sign`: sign a prepared transaction (client helper)
//! - `verify`: check a receipt offline
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;

use qreceipt_protocol::config::{LedgerConfig, PROTOCOL_VERSION};
use qreceipt_protocol::crypto::{
    default_scheme, scheme_by_name, PublicKeyBytes, SecretKeyBytes, SignatureScheme,
};
use qreceipt_protocol::ledger::{Ledger, SealerKey};
use qreceipt_protocol::receipt::{
    verify_json, verify_with_sealer, FailureReason, Receipt, Verification,
};
use qreceipt_protocol::storage::LedgerDb;
use qreceipt_protocol::transaction::{PreparedTransaction, SubmittedTransaction};

use cli::{Commands, QReceiptCli};
use metrics::NodeMetrics;

/// Broadcast channel capacity for live event streaming.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Sealer secret key file inside the data directory.
const SEALER_KEY_FILE: &str = "sealer.key";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = QReceiptCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen(args) => keygen(args),
        Commands::Sign(args) => sign_prepared(args),
        Commands::Verify(args) => verify_receipt(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the ledger service: API server, metrics endpoint and seal timer.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "qreceipt_node=info,qreceipt_protocol=info,tower_http=info",
        args.log_format,
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        seal_threshold = args.seal_threshold,
        seal_interval_secs = args.seal_interval_secs,
        data_dir = %args.data_dir.display(),
        "starting qreceipt-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = LedgerDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    // --- Ledger ---
    let sealer = load_sealer(args.sealer_key.as_deref(), &args.data_dir)?;
    let config = LedgerConfig {
        seal_threshold: args.seal_threshold,
        seal_interval: Duration::from_secs(args.seal_interval_secs),
    };
    let ledger = Arc::new(Ledger::open(db, config, sealer).context("failed to open ledger")?);

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to create metrics registry")?);
    node_metrics.observe_status(&ledger.status());

    // --- Application state ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            PROTOCOL_VERSION
        ),
        ledger: Arc::clone(&ledger),
        metrics: Arc::clone(&node_metrics),
        event_tx,
    };

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("metrics server listening on {}", metrics_addr);

    // --- Seal timer ---
    let seal_loop = (args.seal_interval_secs > 0).then(|| {
        let state = app_state.clone();
        let period = ledger.config().seal_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                match api::seal_now(&state) {
                    Ok(Some(block)) => {
                        tracing::debug!(index = block.index(), "timer seal");
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "timer seal failed, retrying next tick");
                    }
                }
            }
        })
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "API server error");
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "metrics server error");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Some(handle) = seal_loop {
        handle.abort();
    }
    // Pending transactions are already durable; they reload on next start.
    let status = ledger.status();
    tracing::info!(
        height = status.height,
        pending = status.pending,
        "qreceipt-node stopped"
    );
    Ok(())
}

/// Sealer key from the flag/env, else `sealer.key` in the data directory,
/// else a fresh key written there with owner-only permissions.
fn load_sealer(explicit: Option<&str>, data_dir: &Path) -> Result<SealerKey> {
    let algorithm = default_scheme().name();

    if let Some(hex_key) = explicit {
        let secret = SecretKeyBytes::from_hex(hex_key).context("invalid sealer key")?;
        return SealerKey::from_secret(algorithm, secret).context("sealer key rejected");
    }

    let key_path = data_dir.join(SEALER_KEY_FILE);
    if key_path.exists() {
        let contents = std::fs::read_to_string(&key_path)
            .with_context(|| format!("failed to read {}", key_path.display()))?;
        let secret = SecretKeyBytes::from_hex(contents.trim())
            .with_context(|| format!("invalid sealer key in {}", key_path.display()))?;
        let sealer = SealerKey::from_secret(algorithm, secret).context("sealer key rejected")?;
        tracing::info!(public_key = %sealer.public_key(), "sealer key loaded");
        return Ok(sealer);
    }

    let keys = default_scheme().generate_keypair();
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(&key_path)
        .with_context(|| format!("failed to create {}", key_path.display()))?;
    file.write_all(keys.secret_key.to_hex().as_bytes())
        .with_context(|| format!("failed to write sealer key to {}", key_path.display()))?;
    let sealer = SealerKey::from_secret(algorithm, keys.secret_key).context("sealer key rejected")?;
    tracing::info!(
        public_key = %sealer.public_key(),
        key_path = %key_path.display(),
        "sealer key generated"
    );
    Ok(sealer)
}

#[derive(Serialize)]
struct KeygenOutput {
    algorithm: &'static str,
    public_key: String,
    secret_key: String,
}

fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let scheme = scheme_by_name(&args.algorithm)?;
    let keys = scheme.generate_keypair();
    let out = KeygenOutput {
        algorithm: scheme.name(),
        public_key: keys.public_key.to_hex(),
        secret_key: keys.secret_key.to_hex(),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Reads a path, or stdin for `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Signs the payload of a `/tx/prepare` response and prints the body for
/// `/tx/submit`.
fn sign_prepared(args: cli::SignArgs) -> Result<()> {
    let raw = read_input(&args.prepared)?;
    let prepared: PreparedTransaction =
        serde_json::from_str(&raw).context("input is not a prepared transaction")?;
    if prepared.payload.hash() != prepared.payload_hash {
        bail!("payload_hash does not match payload");
    }

    let scheme = scheme_by_name(&args.algorithm)?;
    let secret = SecretKeyBytes::from_hex(&args.secret_key).context("invalid secret key")?;
    let public_key = scheme.public_key_of(&secret)?;
    let signature = scheme.sign(&secret, &prepared.signing_bytes())?;

    let submitted = SubmittedTransaction {
        prepared,
        signature,
        public_key,
    };
    println!("{}", serde_json::to_string_pretty(&submitted)?);
    Ok(())
}

/// Prints the verdict as JSON; exits non-zero when the receipt is invalid.
fn verify_receipt(args: cli::VerifyArgs) -> Result<()> {
    let raw = read_input(&args.receipt)?;
    let verdict = match args.sealer.as_deref() {
        None => verify_json(&raw),
        Some(hex_key) => {
            let sealer = PublicKeyBytes::from_hex(hex_key).context("invalid sealer key")?;
            match Receipt::from_json(&raw) {
                Ok(receipt) => verify_with_sealer(&receipt, &sealer),
                Err(_) => Verification::fail(FailureReason::MalformedReceipt),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    if !verdict.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn print_version() {
    println!("qreceipt-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
