//! # Protocol Configuration & Constants
//!
//! Every magic number in QReceipt lives here. Anything that ends up inside
//! a hash or a signature (domain tags, encoding versions) is part of the
//! receipt wire contract: independent verifiers hard-code the same values,
//! so changing one of them invalidates every receipt issued before.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string of the receipt protocol.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Prefix of the canonical transaction payload. The `v1` suffix is bumped
/// if the field list or separator ever changes.
pub const CANONICAL_TX_PREFIX: &str = "qreceipt/tx/v1";

/// Prefix of the canonical block header bytes signed by the sealer.
pub const CANONICAL_BLOCK_PREFIX: &str = "qreceipt/block/v1";

/// Field separator used by both canonical encodings. None of the allowed
/// field character sets contain it.
pub const CANONICAL_SEPARATOR: char = '|';

/// BLAKE3 derive-key context for transaction IDs.
pub const TX_ID_CONTEXT: &str = "qreceipt tx-id v1";

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Hash output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Payload Limits
// ---------------------------------------------------------------------------

/// Maximum wallet identifier length.
pub const MAX_WALLET_ID_LENGTH: usize = 64;

/// Currency codes are 3 to 8 uppercase letters or digits ("USD", "MXN", "USDC").
pub const MIN_CURRENCY_LENGTH: usize = 3;

/// See [`MIN_CURRENCY_LENGTH`].
pub const MAX_CURRENCY_LENGTH: usize = 8;

/// Default currency when a prepare request does not name one.
pub const DEFAULT_CURRENCY: &str = "MXN";

/// Maximum length of the optional user label attached to a wallet.
pub const MAX_USER_ID_LENGTH: usize = 128;

// ---------------------------------------------------------------------------
// Sealing
// ---------------------------------------------------------------------------

/// Pending transactions that trigger an immediate seal.
pub const DEFAULT_SEAL_THRESHOLD: usize = 3;

/// Cadence of the time-based seal trigger.
pub const DEFAULT_SEAL_INTERVAL: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_API_PORT: u16 = 8000;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 8001;

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Runtime knobs for the ledger and its sealer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Seal as soon as this many transactions are pending. Zero disables
    /// the count trigger (only the cadence and manual seals remain).
    pub seal_threshold: usize,

    /// Period of the cadence trigger driven by the node.
    pub seal_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            seal_threshold: DEFAULT_SEAL_THRESHOLD,
            seal_interval: DEFAULT_SEAL_INTERVAL,
        }
    }
}

impl LedgerConfig {
    /// Returns `true` when a pool of `pending` transactions should be sealed
    /// right away.
    pub fn threshold_reached(&self, pending: usize) -> bool {
        self.seal_threshold > 0 && pending >= self.seal_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_prefixes_are_distinct() {
        assert_ne!(CANONICAL_TX_PREFIX, CANONICAL_BLOCK_PREFIX);
        assert!(!CANONICAL_TX_PREFIX.contains(CANONICAL_SEPARATOR));
        assert!(!CANONICAL_BLOCK_PREFIX.contains(CANONICAL_SEPARATOR));
    }

    #[test]
    fn test_currency_bounds_sanity() {
        assert!(MIN_CURRENCY_LENGTH <= DEFAULT_CURRENCY.len());
        assert!(DEFAULT_CURRENCY.len() <= MAX_CURRENCY_LENGTH);
    }

    #[test]
    fn test_default_config_matches_constants() {
        let config = LedgerConfig::default();
        assert_eq!(config.seal_threshold, 3);
        assert_eq!(config.seal_interval, DEFAULT_SEAL_INTERVAL);
    }

    #[test]
    fn test_threshold_reached() {
        let config = LedgerConfig::default();
        assert!(!config.threshold_reached(2));
        assert!(config.threshold_reached(3));
        assert!(config.threshold_reached(4));
    }

    #[test]
    fn test_zero_threshold_disables_count_trigger() {
        let config = LedgerConfig {
            seal_threshold: 0,
            ..LedgerConfig::default()
        };
        assert!(!config.threshold_reached(0));
        assert!(!config.threshold_reached(1_000));
    }

    #[test]
    fn test_ports_are_distinct() {
        assert_ne!(DEFAULT_API_PORT, DEFAULT_METRICS_PORT);
    }
}
