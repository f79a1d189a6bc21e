//! # verity-crypto — Cryptographic Primitives
//!
//! - **Signing keys** (`keys.rs`): the [`SigningKeyPair`] capability trait and
//!   [`KeyAlgorithm`], which maps verification-method and proof type names to
//!   a concrete scheme. Pipeline code depends only on the trait.
//! - **Ed25519** (`ed25519.rs`) and **secp256k1 ECDSA** (`secp256k1.rs`):
//!   the two implementations.
//! - **Merkle** (`merkle.rs`): binary Merkle trees, sibling-path proofs, and
//!   inclusion verification against a published root.
//!
//! ## Crate Policy
//!
//! - Depends only on `verity-core` internally.
//! - Signing and verification accept `&CanonicalBytes`, never raw slices.
//! - Private keys are never serialized and never appear in `Debug` output.
//! - No mocking of cryptographic operations in tests.

pub mod ed25519;
pub mod error;
pub mod keys;
pub mod merkle;
pub mod secp256k1;

pub use ed25519::Ed25519KeyPair;
pub use error::{AnchorError, CryptoError};
pub use keys::{verify_signature, KeyAlgorithm, SigningKeyPair};
pub use merkle::{node_hash, parse_hash, verify_inclusion, MerkleStep, MerkleTree, Side};
pub use secp256k1::Secp256k1KeyPair;
