//! # verity-core — Foundational Types for the Provenance Pipeline
//!
//! This crate is the leaf of the Verity workspace. It defines the value
//! types every other crate speaks in, and the error taxonomy they all
//! convert into.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every digest and every signature in the
//!    pipeline is computed over `CanonicalBytes`, and the only constructor
//!    runs the JCS pipeline. Two implementations that agree on the JSON
//!    value agree on the bytes.
//!
//! 2. **Validated identifiers.** `Did` and `ContentAddress` are newtypes
//!    with validating constructors and validating `Deserialize` impls. A
//!    malformed DID or CID cannot exist as a value.
//!
//! 3. **UTC-only timestamps.** `Timestamp` renders `YYYY-MM-DDTHH:MM:SSZ`
//!    and nothing else, so claim identifiers and signing inputs never
//!    depend on a local offset.
//!
//! 4. **Outcomes are values, failures are errors.** `VerityError` covers
//!    bad input and broken invariants. "Not found", "revoked" and
//!    "signature invalid" are reported through status enums by the crates
//!    that own those outcomes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `verity-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod address;
pub mod canonical;
pub mod did;
pub mod encoding;
pub mod error;
pub mod temporal;

pub use address::{sha256_bytes, ContentAddress, DigestAlgorithm};
pub use canonical::CanonicalBytes;
pub use did::{Did, DidMethodRegistry, DidUrl};
pub use error::{CanonicalizationError, ErrorKind, ValidationError, VerityError};
pub use temporal::Timestamp;
