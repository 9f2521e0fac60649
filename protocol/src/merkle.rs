//! # Merkle Tree Builder
//!
//! A binary SHA-256 Merkle tree over the ordered leaf hashes of one block.
//!
//! ```text
//!                 root = H(n01 || n22)
//!                /                    \
//!       n01 = H(a || b)         n22 = H(c || c)    <- odd node paired with itself
//!        /         \              /
//!       a           b            c                 <- leaves, in pool order
//! ```
//!
//! ## Rules
//!
//! These are part of the receipt contract. An independent verifier has to
//! implement exactly the same thing, so they never change silently:
//!
//! 1. Leaves are taken in the order given (pool insertion order).
//! 2. Each level combines adjacent pairs as `SHA-256(left || right)` over
//!    the raw 32-byte values.
//! 3. An odd trailing node at any level is paired with **itself**
//!    (duplicate-promote), not carried up unchanged.
//! 4. A single leaf is its own root, with an empty proof.
//! 5. Zero leaves is an error. There are no empty blocks.
//!
//! ## Proofs
//!
//! A proof is the list of siblings met while walking from a leaf to the
//! root, bottom-up. Each step says which side the sibling is on:
//! [`Direction::Right`] means `H(current || sibling)`, [`Direction::Left`]
//! means `H(sibling || current)`. For a duplicated node the sibling is the
//! node itself, on the right.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hash::{hash_pair, hex_digest, Digest};

/// Errors from building trees or extracting proofs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree over zero leaves")]
    EmptyTree,

    #[error("leaf index {index} out of range for a tree of {leaves} leaves")]
    IndexOutOfRange { index: usize, leaves: usize },
}

/// Which side of the current node the sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

/// One step of an inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub direction: Direction,
    #[serde(with = "hex_digest")]
    pub sibling_hash: Digest,
}

impl ProofStep {
    /// Fold this step into the running hash.
    pub fn apply(&self, current: &Digest) -> Digest {
        match self.direction {
            Direction::Right => hash_pair(current, &self.sibling_hash),
            Direction::Left => hash_pair(&self.sibling_hash, current),
        }
    }
}

/// Ordered inclusion proof, leaf level first.
pub type MerkleProof = Vec<ProofStep>;

// ---------------------------------------------------------------------------
// MerkleTree
// ---------------------------------------------------------------------------

/// A fully materialized tree. `levels[0]` holds the leaves, the last level
/// holds exactly one node: the root.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build the tree over `leaves`, in order. O(n) time and space.
    pub fn build(leaves: &[Digest]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let mut levels = vec![leaves.to_vec()];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<Digest> = current
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    let right = pair.get(1).unwrap_or(left);
                    hash_pair(left, right)
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    pub fn root(&self) -> Digest {
        // `build` guarantees a non-empty top level.
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of levels above the leaves; also the length of every proof.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        if index >= self.leaf_count() {
            return Err(MerkleError::IndexOutOfRange {
                index,
                leaves: self.leaf_count(),
            });
        }

        let mut steps = Vec::with_capacity(self.depth());
        let mut i = index;
        for level in &self.levels[..self.depth()] {
            let step = if i % 2 == 0 {
                ProofStep {
                    direction: Direction::Right,
                    // No right neighbour: the node was paired with itself.
                    sibling_hash: *level.get(i + 1).unwrap_or(&level[i]),
                }
            } else {
                ProofStep {
                    direction: Direction::Left,
                    sibling_hash: level[i - 1],
                }
            };
            steps.push(step);
            i /= 2;
        }
        Ok(steps)
    }

    /// Proofs for every leaf, in leaf order.
    pub fn proofs(&self) -> Vec<MerkleProof> {
        (0..self.leaf_count())
            .filter_map(|i| self.proof(i).ok())
            .collect()
    }
}

/// Convenience: root of `leaves` without keeping the tree around.
pub fn compute_root(leaves: &[Digest]) -> Result<Digest, MerkleError> {
    MerkleTree::build(leaves).map(|tree| tree.root())
}

/// Fold `proof` over `leaf`, bottom-up, yielding the candidate root.
pub fn replay(leaf: &Digest, proof: &[ProofStep]) -> Digest {
    proof.iter().fold(*leaf, |current, step| step.apply(&current))
}

/// `true` iff `proof` takes `leaf` to `root`.
pub fn verify_proof(leaf: &Digest, proof: &[ProofStep], root: &Digest) -> bool {
    replay(leaf, proof) == *root
}
