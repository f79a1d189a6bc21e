//! # Binary Merkle Trees and Inclusion Proofs
//!
//! Claims are anchored by committing their leaf hashes into a binary
//! Merkle tree and publishing the root. A sibling path then proves any one
//! leaf was in the batch.
//!
//! ## Algorithm
//!
//! - Leaves are 32-byte SHA-256 digests, used as-is.
//! - Parent: `SHA256(left || right)`.
//! - A trailing odd node at any level is promoted to the next level
//!   unchanged (not duplicated), so it contributes no proof step there.
//! - A proof lists the sibling at each level, bottom-up, with the side the
//!   sibling sits on. Verification folds the leaf through the path and
//!   compares the result to the expected root.
//!
//! Hashes on the wire are 64 lowercase hex characters. An `sha256:` or
//! `0x` prefix is accepted on input.
//!
//! A proof that folds to the wrong root is `Ok(false)`. A proof that
//! cannot be folded at all (unknown side tag, bad hex) is
//! [`AnchorError::MalformedProof`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use verity_core::encoding::{from_hex_array, to_hex};

use crate::error::AnchorError;

/// Parent hash of two child nodes.
pub fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Parse a 32-byte hash from its wire form.
pub fn parse_hash(s: &str) -> Result<[u8; 32], AnchorError> {
    let trimmed = s.trim();
    let hex = trimmed
        .strip_prefix("sha256:")
        .or_else(|| trimmed.strip_prefix("0x"))
        .unwrap_or(trimmed);
    from_hex_array::<32>(hex)
        .map_err(|e| AnchorError::MalformedProof(format!("hash {s:?}: {e}")))
}

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Sibling is the left child: `parent = H(sibling || current)`.
    Left,
    /// Sibling is the right child: `parent = H(current || sibling)`.
    Right,
}

impl Side {
    /// Wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse a wire tag. Anything but `left`/`right` is malformed.
    pub fn parse(tag: &str) -> Result<Self, AnchorError> {
        match tag {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(AnchorError::MalformedProof(format!(
                "unknown position tag {other:?}; expected \"left\" or \"right\""
            ))),
        }
    }
}

/// One step of a sibling path, in wire form.
///
/// Fields are strings so that a proof received from outside can be held
/// and inspected before it is validated; [`verify_inclusion`] parses them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MerkleStep {
    /// Sibling node hash, 64 hex characters.
    pub sibling_hash: String,
    /// `"left"` or `"right"`.
    pub position: String,
}

impl MerkleStep {
    /// Build a step from a raw sibling hash.
    pub fn new(sibling: &[u8; 32], side: Side) -> Self {
        Self {
            sibling_hash: to_hex(sibling),
            position: side.as_str().to_string(),
        }
    }

    /// Parse both fields.
    pub fn parse(&self) -> Result<([u8; 32], Side), AnchorError> {
        Ok((parse_hash(&self.sibling_hash)?, Side::parse(&self.position)?))
    }
}

/// Fold `leaf` through `proof`, returning the implied root.
pub fn fold_proof(leaf: &[u8; 32], proof: &[MerkleStep]) -> Result<[u8; 32], AnchorError> {
    proof.iter().try_fold(*leaf, |current, step| {
        let (sibling, side) = step.parse()?;
        Ok(match side {
            Side::Left => node_hash(&sibling, &current),
            Side::Right => node_hash(&current, &sibling),
        })
    })
}

/// Verify that `leaf_hash` is included under `expected_root`.
///
/// An empty proof succeeds only when the leaf is the root (single-leaf
/// tree).
///
/// # Errors
///
/// [`AnchorError::MalformedProof`] if the leaf, the root, or any step is
/// not well-formed.
pub fn verify_inclusion(
    leaf_hash: &str,
    proof: &[MerkleStep],
    expected_root: &str,
) -> Result<bool, AnchorError> {
    let leaf = parse_hash(leaf_hash)?;
    let root = parse_hash(expected_root)?;
    let computed = fold_proof(&leaf, proof)?;
    Ok(bool::from(computed.ct_eq(&root)))
}

/// A binary Merkle tree over a fixed batch of leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    // levels[0] = leaves, last level = [root].
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build the tree.
    ///
    /// # Errors
    ///
    /// [`AnchorError::EmptyTree`] if `leaves` is empty.
    pub fn from_leaves(leaves: &[[u8; 32]]) -> Result<Self, AnchorError> {
        if leaves.is_empty() {
            return Err(AnchorError::EmptyTree);
        }
        let mut levels = vec![leaves.to_vec()];
        while let Some(level) = levels.last().filter(|l| l.len() > 1) {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut nodes = level.iter();
            while let Some(left) = nodes.next() {
                next.push(match nodes.next() {
                    Some(right) => node_hash(left, right),
                    None => *left,
                });
            }
            levels.push(next);
        }
        Ok(Self { levels })
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// Always false; an empty tree cannot be built.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The leaf at `index`.
    pub fn leaf(&self, index: usize) -> Option<&[u8; 32]> {
        self.levels[0].get(index)
    }

    /// The root hash.
    pub fn root(&self) -> [u8; 32] {
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or_default()
    }

    /// The root as lowercase hex.
    pub fn root_hex(&self) -> String {
        to_hex(&self.root())
    }

    /// Sibling path for the leaf at `index`, bottom-up.
    pub fn proof(&self, index: usize) -> Result<Vec<MerkleStep>, AnchorError> {
        if index >= self.len() {
            return Err(AnchorError::LeafOutOfRange {
                index,
                size: self.len(),
            });
        }
        let mut steps = Vec::new();
        let mut pos = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = pos ^ 1;
            if let Some(hash) = level.get(sibling) {
                let side = if sibling < pos { Side::Left } else { Side::Right };
                steps.push(MerkleStep::new(hash, side));
            }
            pos /= 2;
        }
        Ok(steps)
    }
}
