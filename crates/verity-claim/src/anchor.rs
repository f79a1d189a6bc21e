//! # Batch Anchoring
//!
//! Signed claims are collected into an [`AnchorBatch`], committed into a
//! binary Merkle tree over their [`anchor leaves`](Claim::anchor_leaf), and
//! sealed. Sealing returns each claim with a [`MerkleAnchor`] appended to
//! its proof, plus the root to publish externally.
//!
//! Anchors do not touch the signable payload, so an anchored claim still
//! verifies under its original signature.

use verity_core::encoding::to_hex;
use verity_crypto::{parse_hash, verify_inclusion, MerkleTree};

use crate::claim::{Claim, MerkleAnchor, ANCHOR_TYPE};
use crate::error::ClaimError;

/// Signed claims awaiting a batch root.
#[derive(Debug, Default)]
pub struct AnchorBatch {
    batch_id: Option<String>,
    claims: Vec<Claim>,
    leaves: Vec<[u8; 32]>,
}

/// Result of sealing a batch.
#[derive(Debug, Clone)]
pub struct SealedBatch {
    /// Batch identifier recorded in every anchor.
    pub batch_id: String,
    /// Root hash, lowercase hex. This is what gets published.
    pub root: String,
    /// The input claims, each with its anchor appended, in push order.
    pub claims: Vec<Claim>,
}

impl AnchorBatch {
    /// An empty batch whose id is derived from the root at seal time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit batch id.
    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    /// Add a claim. Returns its leaf index.
    ///
    /// # Errors
    ///
    /// [`ClaimError::NotSigned`] if the claim carries no proof.
    pub fn push(&mut self, claim: Claim) -> Result<usize, ClaimError> {
        if !claim.is_signed() {
            return Err(ClaimError::NotSigned(claim.claim_id().to_string()));
        }
        self.leaves.push(claim.anchor_leaf()?);
        self.claims.push(claim);
        Ok(self.claims.len() - 1)
    }

    /// Number of claims in the batch.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Build the tree and anchor every claim.
    ///
    /// `transaction_receipt` references the external publication of the
    /// root, when it is already known.
    ///
    /// # Errors
    ///
    /// [`ClaimError::Anchor`] if the batch is empty.
    pub fn seal(self, transaction_receipt: Option<&str>) -> Result<SealedBatch, ClaimError> {
        let tree = MerkleTree::from_leaves(&self.leaves)?;
        let root = tree.root_hex();
        let batch_id = self
            .batch_id
            .unwrap_or_else(|| format!("batch_{}", &root[..16]));

        let mut claims = Vec::with_capacity(self.claims.len());
        for (index, (claim, leaf)) in self.claims.iter().zip(&self.leaves).enumerate() {
            let anchor = MerkleAnchor {
                anchor_type: ANCHOR_TYPE.to_string(),
                batch_id: batch_id.clone(),
                merkle_proof: tree.proof(index)?,
                leaf_index: index as u64,
                leaf_hash: to_hex(leaf),
                transaction_receipt: transaction_receipt.map(str::to_string),
            };
            claims.push(claim.with_anchor(anchor)?);
        }
        tracing::info!(
            batch_id = %batch_id,
            root = %root,
            size = claims.len(),
            "sealed anchor batch"
        );
        Ok(SealedBatch {
            batch_id,
            root,
            claims,
        })
    }
}

/// Check that `anchor` places `claim` under `root`.
///
/// The anchor's recorded leaf must be the claim's own leaf; an anchor
/// lifted from another claim returns `Ok(false)`.
///
/// # Errors
///
/// [`ClaimError::Anchor`] with a malformed-proof error if the root, leaf
/// or any step cannot be parsed.
pub fn verify_claim_anchor(
    claim: &Claim,
    anchor: &MerkleAnchor,
    root: &str,
) -> Result<bool, ClaimError> {
    let recorded = parse_hash(&anchor.leaf_hash)?;
    let included = verify_inclusion(&anchor.leaf_hash, &anchor.merkle_proof, root)?;
    Ok(included && recorded == claim.anchor_leaf()?)
}
