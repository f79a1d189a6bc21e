//! # verity-cas — Content-Addressed Document Store
//!
//! Documents (DID documents, signed claims) are stored under the SHA-256 of
//! their canonical bytes. The same JSON value always lands under the same
//! address, so writes are idempotent and never overwrite.
//!
//! ## Layers
//!
//! - [`StorageBackend`] (`backend.rs`): the byte-level engine, a flat
//!   key/value space with `get`, `put_if_absent`, `delete`. Two
//!   implementations: [`MemoryBackend`] and [`FsBackend`] (`fs.rs`).
//! - [`ContentStore`] (`store.rs`): canonicalizes, addresses, dedups, and
//!   re-verifies on read. Implements [`CasClient`], the interface the DID
//!   registry and resolver depend on.
//!
//! ## Integrity Invariant
//!
//! Every read recomputes the digest of the stored bytes and compares it in
//! constant time against the requested address. A mismatch is an
//! [`CasError::Integrity`] error, never a silent success.

pub mod backend;
pub mod error;
pub mod fs;
pub mod store;

pub use backend::{MemoryBackend, StorageBackend};
pub use error::{CasError, StorageError};
pub use fs::FsBackend;
pub use store::{CasClient, ContentStore, RetrieveResult, StoreReceipt, DEFAULT_CONTENT_TYPE};
