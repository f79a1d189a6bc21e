//! # verity-did — DID Documents, Registry, and Resolution
//!
//! - **Documents** (`document.rs`): [`DidDocument`], [`VerificationMethod`],
//!   [`ServiceEndpoint`]. Stored in the CAS; immutable once stored.
//! - **Registry** (`registry.rs`): [`DidRegistry`], the single source of
//!   truth for which document is current for a DID. Per-DID locking,
//!   append-only history, terminal revocation. Exposed through the
//!   [`RegistryClient`] trait.
//! - **Resolver** (`resolver.rs`, `cache.rs`): [`DidResolver`] combines the
//!   registry with an ordered list of content sources behind a TTL cache,
//!   and reports every outcome as a [`ResolutionResult`].
//!
//! ## Crate Policy
//!
//! - The registry and resolver depend on `CasClient` and `RegistryClient`
//!   trait objects, never on concrete stores.
//! - Resolution never returns `Err`; failures are statuses with messages.

pub mod cache;
pub mod document;
pub mod error;
pub mod registry;
pub mod resolver;

pub use cache::{CachedResolution, ResolutionCache, DEFAULT_CACHE_TTL};
pub use document::{DidDocument, ServiceEndpoint, VerificationMethod};
pub use error::RegistryError;
pub use registry::{
    registration_payload, sign_registration, DidRegistry, LookupStatus, RegistryClient,
    RegistryLookup, RegistryRecord, RegistryState, VersionEntry, REGISTRY_SOURCE,
};
pub use resolver::{
    DidResolver, ProofEntry, ResolutionMetadata, ResolutionResult, ResolutionStatus,
    ResolveOptions, CACHE_SOURCE,
};
