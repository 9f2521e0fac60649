//! Structural payload checks.
//!
//! Cheap, pure checks that run before anything touches the ledger state or
//! a signature. They also guarantee that no field can contain the canonical
//! separator, which is what keeps the canonical encoding unambiguous.

use thiserror::Error;

use super::types::TransactionPayload;
use crate::config::{MAX_CURRENCY_LENGTH, MAX_WALLET_ID_LENGTH, MIN_CURRENCY_LENGTH};

/// A payload that cannot be accepted regardless of ledger state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("invalid {field} wallet id {value:?}: expected 1-64 chars of [A-Za-z0-9_-]")]
    InvalidWalletId { field: &'static str, value: String },

    #[error("amount must be > 0")]
    ZeroAmount,

    #[error("invalid currency {0:?}: expected 3-8 uppercase letters or digits")]
    InvalidCurrency(String),

    #[error("sender and receiver must differ: both are {0}")]
    SelfTransfer(String),
}

/// 1–64 chars of `[A-Za-z0-9_-]`.
pub fn is_valid_wallet_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_WALLET_ID_LENGTH
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// 3–8 chars of `[A-Z0-9]`.
pub fn is_valid_currency(code: &str) -> bool {
    (MIN_CURRENCY_LENGTH..=MAX_CURRENCY_LENGTH).contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Validate every field of `payload`. Returns the first failure.
pub fn validate_payload(payload: &TransactionPayload) -> Result<(), PayloadError> {
    if !is_valid_wallet_id(&payload.from_wallet) {
        return Err(PayloadError::InvalidWalletId {
            field: "sender",
            value: payload.from_wallet.clone(),
        });
    }
    if !is_valid_wallet_id(&payload.to_wallet) {
        return Err(PayloadError::InvalidWalletId {
            field: "receiver",
            value: payload.to_wallet.clone(),
        });
    }
    if payload.from_wallet == payload.to_wallet {
        return Err(PayloadError::SelfTransfer(payload.from_wallet.clone()));
    }
    if payload.amount == 0 {
        return Err(PayloadError::ZeroAmount);
    }
    if !is_valid_currency(&payload.currency) {
        return Err(PayloadError::InvalidCurrency(payload.currency.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> TransactionPayload {
        TransactionPayload {
            from_wallet: "wallet_a-1".into(),
            to_wallet: "wallet_b-2".into(),
            amount: 1,
            currency: "USDC".into(),
            nonce: 0,
            timestamp: 0,
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        assert_eq!(validate_payload(&valid()), Ok(()));
    }

    #[test]
    fn test_wallet_id_rules() {
        assert!(is_valid_wallet_id("a"));
        assert!(is_valid_wallet_id(&"x".repeat(64)));
        assert!(is_valid_wallet_id("3f2b1c9e-7d4a-4b8e-9f00-1a2b3c4d5e6f"));
        assert!(!is_valid_wallet_id(""));
        assert!(!is_valid_wallet_id(&"x".repeat(65)));
        assert!(!is_valid_wallet_id("has|pipe"));
        assert!(!is_valid_wallet_id("has space"));
        assert!(!is_valid_wallet_id("ñ"));
    }

    #[test]
    fn test_currency_rules() {
        assert!(is_valid_currency("USD"));
        assert!(is_valid_currency("MXN"));
        assert!(is_valid_currency("USDC"));
        assert!(is_valid_currency("T0KEN123"));
        assert!(!is_valid_currency("US"));
        assert!(!is_valid_currency("usd"));
        assert!(!is_valid_currency("TOOLONGXX"));
        assert!(!is_valid_currency("U|D"));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let mut p = valid();
        p.amount = 0;
        assert_eq!(validate_payload(&p), Err(PayloadError::ZeroAmount));
    }

    #[test]
    fn test_self_transfer_rejected() {
        let mut p = valid();
        p.to_wallet = p.from_wallet.clone();
        assert_eq!(
            validate_payload(&p),
            Err(PayloadError::SelfTransfer("wallet_a-1".into()))
        );
    }

    #[test]
    fn test_bad_receiver_reported_as_receiver() {
        let mut p = valid();
        p.to_wallet = "bad|id".into();
        assert!(matches!(
            validate_payload(&p),
            Err(PayloadError::InvalidWalletId { field: "receiver", .. })
        ));
    }
}
