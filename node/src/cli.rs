//! # CLI Interface
//!
//! Command-line structure for `qreceipt-node`, built with `clap` derive.
//! Every `run` option has an environment fallback so the service can be
//! configured entirely from a container environment.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use qreceipt_protocol::config::{
    DEFAULT_API_PORT, DEFAULT_METRICS_PORT, DEFAULT_SEAL_INTERVAL, DEFAULT_SEAL_THRESHOLD,
};

use crate::logging::LogFormat;

/// QReceipt sealing service.
///
/// Accepts signed transfers, seals them into Merkle-committed blocks and
/// issues receipts that verify offline. Also bundles the client-side
/// helpers: key generation, signing and receipt verification.
#[derive(Parser, Debug)]
#[command(
    name = "qreceipt-node",
    about = "QReceipt proof-of-settlement ledger",
    version,
    propagate_version = true
)]
pub struct QReceiptCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger service.
    Run(RunArgs),
    /// Generate a keypair and print it as JSON.
    Keygen(KeygenArgs),
    /// Sign a prepared transaction, printing the submit body.
    Sign(SignArgs),
    /// Check a receipt file offline.
    Verify(VerifyArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the sled database. Created if missing.
    #[arg(long, short = 'd', env = "QRECEIPT_DATA_DIR", default_value = "./qreceipt-data")]
    pub data_dir: PathBuf,

    /// Port for the HTTP and WebSocket API.
    #[arg(long, env = "QRECEIPT_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "QRECEIPT_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Seal as soon as this many transactions are pending. 0 disables.
    #[arg(long, env = "QRECEIPT_SEAL_THRESHOLD", default_value_t = DEFAULT_SEAL_THRESHOLD)]
    pub seal_threshold: usize,

    /// Seconds between timer-driven seals. 0 disables the timer.
    #[arg(long, env = "QRECEIPT_SEAL_INTERVAL_SECS", default_value_t = DEFAULT_SEAL_INTERVAL.as_secs())]
    pub seal_interval_secs: u64,

    /// Hex-encoded sealer secret key.
    ///
    /// When omitted, the node loads `sealer.key` from the data directory,
    /// generating it on first start.
    #[arg(long, env = "QRECEIPT_SEALER_KEY", hide_env_values = true)]
    pub sealer_key: Option<String>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "QRECEIPT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Signature scheme to generate for.
    #[arg(long, default_value = "ed25519")]
    pub algorithm: String,
}

/// Arguments for the `sign` subcommand.
#[derive(Parser, Debug)]
pub struct SignArgs {
    /// File with the JSON returned by `POST /tx/prepare`. `-` reads stdin.
    #[arg(long, short = 'f')]
    pub prepared: PathBuf,

    /// Hex-encoded secret key of the sending wallet.
    #[arg(long, env = "QRECEIPT_WALLET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Signature scheme of the sending wallet.
    #[arg(long, default_value = "ed25519")]
    pub algorithm: String,
}

/// Arguments for the `verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Receipt JSON file. `-` reads stdin.
    pub receipt: PathBuf,

    /// Hex public key of the trusted sealer. Also checks the header signature.
    #[arg(long)]
    pub sealer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        QReceiptCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = QReceiptCli::try_parse_from(["qreceipt-node", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.api_port, DEFAULT_API_PORT);
        assert_eq!(args.seal_threshold, DEFAULT_SEAL_THRESHOLD);
        assert_eq!(args.log_format, LogFormat::Pretty);
    }

    #[test]
    fn verify_takes_optional_sealer() {
        let cli =
            QReceiptCli::try_parse_from(["qreceipt-node", "verify", "r.json", "--sealer", "ab"])
                .unwrap();
        let Commands::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert_eq!(args.receipt, PathBuf::from("r.json"));
        assert_eq!(args.sealer.as_deref(), Some("ab"));
    }
}
