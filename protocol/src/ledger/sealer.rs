//! # Block Sealer
//!
//! Turns a drained batch of pending records into a sealed block.
//!
//! ## State Machine
//!
//! ```text
//!   transactions:   Pending ──────────────────────────▶ Confirmed
//!                                   │
//!   block:          Building ──sign header──▶ Sealed
//!                   (in memory)               (persisted, immutable)
//! ```
//!
//! [`seal_batch`] is the Building stage: it is pure. It hashes each record
//! in order, builds the tree, signs the header and produces the confirmed
//! copies of the records with their proofs attached, all without touching
//! the ledger. Only when the result has been written to storage in one
//! batch does anything become Sealed. If any step fails, the caller still
//! holds the untouched drained batch and puts it back.

use std::fmt;

use super::error::{LedgerError, LedgerResult};
use crate::crypto::hash::Digest;
use crate::crypto::keys::{PublicKeyBytes, SecretKeyBytes};
use crate::crypto::signer::{default_scheme, scheme_by_name, SignatureScheme, SignerError};
use crate::merkle::{MerkleError, MerkleTree};
use crate::storage::block::{Block, BlockHeader};
use crate::transaction::TransactionRecord;

// ---------------------------------------------------------------------------
// SealerKey
// ---------------------------------------------------------------------------

/// The service key that signs block headers.
pub struct SealerKey {
    scheme: &'static dyn SignatureScheme,
    public_key: PublicKeyBytes,
    secret_key: SecretKeyBytes,
}

impl fmt::Debug for SealerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealerKey")
            .field("scheme", &self.scheme.name())
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl SealerKey {
    /// Fresh key from the default scheme. Every restart gets a new identity,
    /// so production nodes should load a fixed key instead.
    pub fn generate() -> Self {
        let scheme = default_scheme();
        let kp = scheme.generate_keypair();
        Self {
            scheme,
            public_key: kp.public_key,
            secret_key: kp.secret_key,
        }
    }

    /// Load from an existing secret key.
    pub fn from_secret(algorithm: &str, secret_key: SecretKeyBytes) -> Result<Self, SignerError> {
        let scheme = scheme_by_name(algorithm)?;
        let public_key = scheme.public_key_of(&secret_key)?;
        Ok(Self {
            scheme,
            public_key,
            secret_key,
        })
    }

    pub fn public_key(&self) -> &PublicKeyBytes {
        &self.public_key
    }

    pub fn algorithm(&self) -> &'static str {
        self.scheme.name()
    }

    fn sign_header(
        &self,
        index: u64,
        sealed_at: u64,
        merkle_root: Digest,
    ) -> Result<BlockHeader, SignerError> {
        BlockHeader::signed(
            index,
            sealed_at,
            merkle_root,
            self.scheme,
            &self.secret_key,
            self.public_key.clone(),
        )
    }
}

// ---------------------------------------------------------------------------
// Sealing
// ---------------------------------------------------------------------------

/// A block in the Building stage, ready to be committed.
#[derive(Debug, Clone)]
pub struct SealedBatch {
    pub block: Block,
    /// The drained records, in leaf order, moved to Confirmed with proofs.
    pub confirmed: Vec<TransactionRecord>,
}

/// Leaf hashes of `records`, recomputed from their payloads.
pub fn leaf_hashes(records: &[TransactionRecord]) -> Vec<Digest> {
    records.iter().map(|r| r.payload.hash()).collect()
}

/// Build block `index` over `batch`. Pure: nothing outside the return value
/// is modified.
pub fn seal_batch(
    batch: &[TransactionRecord],
    index: u64,
    sealed_at: u64,
    key: &SealerKey,
) -> LedgerResult<SealedBatch> {
    if batch.is_empty() {
        return Err(MerkleError::EmptyTree.into());
    }

    let tree = MerkleTree::build(&leaf_hashes(batch))?;
    let header = key.sign_header(index, sealed_at, tree.root())?;

    let confirmed = batch
        .iter()
        .enumerate()
        .map(|(i, record)| Ok(record.confirmed(index, tree.proof(i)?)))
        .collect::<Result<Vec<_>, MerkleError>>()?;

    let block = Block {
        header,
        transaction_ids: batch.iter().map(|r| r.tx_id.clone()).collect(),
    };

    Ok(SealedBatch { block, confirmed })
}

/// Rebuild a block's root from the records it names and compare.
pub fn root_matches(block: &Block, records: &[TransactionRecord]) -> LedgerResult<bool> {
    if records.len() != block.transaction_ids.len()
        || records
            .iter()
            .zip(&block.transaction_ids)
            .any(|(r, id)| &r.tx_id != id)
    {
        return Err(LedgerError::Internal(format!(
            "records do not match block {} transaction ids",
            block.index()
        )));
    }
    let root = MerkleTree::build(&leaf_hashes(records))?.root();
    Ok(root == block.header.merkle_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::SignatureBytes;
    use crate::crypto::signer::ED25519;
    use crate::merkle::verify_proof;
    use crate::transaction::{TransactionPayload, TransactionStatus};

    fn pending(nonce: u64) -> TransactionRecord {
        let payload = TransactionPayload {
            from_wallet: "w1".into(),
            to_wallet: "w2".into(),
            amount: 100 + nonce,
            currency: "USD".into(),
            nonce,
            timestamp: 1_700_000_000,
        };
        TransactionRecord {
            tx_id: payload.tx_id(),
            sequence: nonce,
            payload_hash: payload.hash(),
            payload,
            signature: SignatureBytes::new(vec![0u8; 64]),
            public_key: PublicKeyBytes::new(vec![0u8; 32]),
            algorithm: ED25519.into(),
            status: TransactionStatus::Pending,
            block_index: None,
            merkle_proof: None,
            submitted_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_seal_three_records() {
        let key = SealerKey::generate();
        let batch: Vec<_> = (0..3).map(pending).collect();
        let sealed = seal_batch(&batch, 0, 1_700_000_010, &key).unwrap();

        assert_eq!(sealed.block.index(), 0);
        assert_eq!(sealed.block.tx_count(), 3);
        assert!(sealed.block.header.verify_signature(default_scheme()));
        assert_eq!(&sealed.block.header.sealer_public_key, key.public_key());

        for (i, record) in sealed.confirmed.iter().enumerate() {
            assert!(record.is_confirmed());
            assert_eq!(record.block_index, Some(0));
            assert_eq!(record.tx_id, batch[i].tx_id);
            let proof = record.merkle_proof.as_ref().unwrap();
            assert_eq!(proof.len(), 2);
            assert!(verify_proof(&record.payload_hash, proof, &sealed.block.header.merkle_root));
        }

        assert!(root_matches(&sealed.block, &batch).unwrap());
    }

    #[test]
    fn test_single_record_root_is_leaf() {
        let key = SealerKey::generate();
        let batch = vec![pending(0)];
        let sealed = seal_batch(&batch, 4, 0, &key).unwrap();
        assert_eq!(sealed.block.header.merkle_root, batch[0].payload_hash);
        assert_eq!(sealed.confirmed[0].merkle_proof, Some(vec![]));
    }

    #[test]
    fn test_empty_batch_is_refused() {
        let key = SealerKey::generate();
        assert!(matches!(
            seal_batch(&[], 0, 0, &key),
            Err(LedgerError::Internal(_))
        ));
    }

    #[test]
    fn test_batch_is_left_untouched() {
        let key = SealerKey::generate();
        let batch: Vec<_> = (0..2).map(pending).collect();
        let before = batch.clone();
        let _ = seal_batch(&batch, 0, 0, &key).unwrap();
        assert_eq!(batch, before);
    }

    #[test]
    fn test_root_mismatch_detected() {
        let key = SealerKey::generate();
        let batch: Vec<_> = (0..2).map(pending).collect();
        let mut sealed = seal_batch(&batch, 0, 0, &key).unwrap();
        sealed.block.header.merkle_root[0] ^= 1;
        assert!(!root_matches(&sealed.block, &batch).unwrap());

        let reordered = vec![batch[1].clone(), batch[0].clone()];
        assert!(root_matches(&sealed.block, &reordered).is_err());
    }

    #[test]
    fn test_sealer_key_from_secret() {
        let original = SealerKey::generate();
        let loaded =
            SealerKey::from_secret("ed25519", original.secret_key.clone()).unwrap();
        assert_eq!(loaded.public_key(), original.public_key());
        assert_eq!(loaded.algorithm(), ED25519);

        let bad = SealerKey::from_secret("ed25519", SecretKeyBytes::new(vec![1u8; 3]));
        assert!(bad.is_err());

        let debug = format!("{:?}", original);
        assert!(!debug.contains(&original.secret_key.to_hex()));
    }
}
