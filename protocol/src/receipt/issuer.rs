//! Receipt assembly.
//!
//! Pure copying. The sealer already computed and stored every proof; the
//! issuer only checks that the pieces belong together and moves them into
//! the wire shape. No hashing, no signing, no writes, so a receipt can be
//! regenerated any number of times and always comes out identical.

use crate::ledger::error::{LedgerError, LedgerResult};
use crate::storage::block::BlockHeader;
use crate::transaction::TransactionRecord;

use super::Receipt;

/// Build the receipt of a confirmed `record` sealed under `header`.
pub fn issue_receipt(record: &TransactionRecord, header: &BlockHeader) -> LedgerResult<Receipt> {
    if !record.is_confirmed() {
        return Err(LedgerError::NotConfirmed(record.tx_id.clone()));
    }
    if record.block_index != Some(header.index) {
        return Err(LedgerError::Internal(format!(
            "transaction {} belongs to block {:?}, not {}",
            record.tx_id, record.block_index, header.index
        )));
    }
    let merkle_proof = record.merkle_proof.clone().ok_or_else(|| {
        LedgerError::Internal(format!("confirmed transaction {} has no proof", record.tx_id))
    })?;

    Ok(Receipt {
        tx: record.payload.clone(),
        algorithm: record.algorithm.clone(),
        signature: record.signature.clone(),
        public_key: record.public_key.clone(),
        block_header: header.clone(),
        merkle_proof,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{PublicKeyBytes, SignatureBytes};
    use crate::transaction::{TransactionPayload, TransactionStatus};

    fn header(index: u64) -> BlockHeader {
        BlockHeader {
            index,
            sealed_at: 1,
            merkle_root: [0u8; 32],
            sealer_public_key: PublicKeyBytes::new(vec![1u8; 32]),
            sealer_signature: SignatureBytes::new(vec![2u8; 64]),
        }
    }

    fn record() -> TransactionRecord {
        let payload = TransactionPayload {
            from_wallet: "w1".into(),
            to_wallet: "w2".into(),
            amount: 1,
            currency: "USD".into(),
            nonce: 0,
            timestamp: 0,
        };
        TransactionRecord {
            tx_id: payload.tx_id(),
            sequence: 0,
            payload_hash: payload.hash(),
            payload,
            signature: SignatureBytes::new(vec![3u8; 64]),
            public_key: PublicKeyBytes::new(vec![4u8; 32]),
            algorithm: "ed25519".into(),
            status: TransactionStatus::Pending,
            block_index: None,
            merkle_proof: None,
            submitted_at: 0,
        }
    }

    #[test]
    fn test_pending_record_is_not_confirmed() {
        assert!(matches!(
            issue_receipt(&record(), &header(0)),
            Err(LedgerError::NotConfirmed(_))
        ));
    }

    #[test]
    fn test_wrong_block_is_internal() {
        let confirmed = record().confirmed(1, vec![]);
        assert!(matches!(
            issue_receipt(&confirmed, &header(0)),
            Err(LedgerError::Internal(_))
        ));
    }

    #[test]
    fn test_issue_copies_stored_fields() {
        let confirmed = record().confirmed(0, vec![]);
        let receipt = issue_receipt(&confirmed, &header(0)).unwrap();
        assert_eq!(receipt.tx, confirmed.payload);
        assert_eq!(receipt.signature, confirmed.signature);
        assert_eq!(receipt.public_key, confirmed.public_key);
        assert_eq!(receipt.block_header, header(0));
        assert_eq!(receipt.tx_id(), confirmed.tx_id);

        let again = issue_receipt(&confirmed, &header(0)).unwrap();
        assert_eq!(receipt, again);
    }
}
