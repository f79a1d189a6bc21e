//! # verity-claim — Provenance Claims
//!
//! - **Model** (`claim.rs`): [`Claim`], [`Proof`], [`MerkleAnchor`].
//! - **Builder** (`builder.rs`): [`ClaimBuilder`] assembles claims
//!   deterministically and derives their ids through [`ClaimIdScheme`].
//! - **Signer** (`signer.rs`): [`ClaimSigner`] signs through any
//!   `SigningKeyPair` and verifies against documents resolved by a
//!   `DidResolver`, failing closed.
//! - **Anchoring** (`anchor.rs`): [`AnchorBatch`] commits signed claims to
//!   a Merkle root; [`verify_claim_anchor`] checks inclusion.
//!
//! ## Crate Policy
//!
//! - Claims are immutable values. Proofs, anchors and verification URLs are
//!   attached by returning new claims.
//! - A failed verification is a [`ClaimVerification`] with a message, not
//!   an error.

pub mod anchor;
pub mod builder;
pub mod claim;
pub mod error;
pub mod signer;

pub use anchor::{verify_claim_anchor, AnchorBatch, SealedBatch};
pub use builder::{derive_claim_id, ClaimBuilder, ClaimIdScheme};
pub use claim::{
    validate_content_hash, Claim, ContentType, Issuer, MerkleAnchor, Proof, ANCHOR_TYPE,
    DEFAULT_CONTEXT, DEFAULT_TYPES,
};
pub use error::ClaimError;
pub use signer::{ClaimSigner, ClaimVerification};
