#![deny(missing_docs)]

//! # verity-pipeline — Provenance Pipeline Service
//!
//! Wires the Verity crates together for a host process:
//!
//! - **Configuration** (`config.rs`): [`VerityConfig`] from YAML plus
//!   `VERITY_*` environment overrides.
//! - **Telemetry** (`telemetry.rs`): [`init_tracing`] installs a
//!   `tracing-subscriber` formatter.
//! - **Service** (`service.rs`): [`ProvenanceService`] exposes register,
//!   resolve, store, retrieve, full resolution, claim signing and
//!   verification, anchoring, revocation and issuer provisioning.
//!
//! The service is transport-agnostic. Hosts pass configuration in; nothing
//! here reads process-wide state except [`VerityConfig::apply_env_overrides`].

pub mod config;
pub mod service;
pub mod telemetry;

pub use config::{
    ClaimConfig, ConfigError, ResolverConfig, ServiceEndpointConfig, StorageConfig, StorageKind,
    VerityConfig,
};
pub use service::{
    ClaimRequest, OperationStatus, ProvenanceService, ProvisionedIssuer, UpdateResponse,
    CLAIM_CONTENT_TYPE, ISSUER_KEY_FRAGMENT, VERIFICATION_SERVICE_TYPE,
};
pub use telemetry::{init_tracing, LogFormat};
