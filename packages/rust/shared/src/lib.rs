//! Shared types, error model, and configuration for frbsync.
//!
//! This crate is the foundation depended on by all other frbsync crates.
//! It provides:
//! - [`FrbSyncError`] — the unified error type
//! - Domain types ([`CandidateRecord`], [`CatalogRecord`], [`CatalogValue`], [`MergeMode`])
//! - Configuration ([`AppConfig`], [`SyncConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogConfig, DefaultsConfig, MatchingConfig, SyncConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{FrbSyncError, Result};
pub use types::{
    CandidateRecord, CatalogRecord, CatalogValue, DEFAULT_MATCH_RADIUS_ARCSEC, HostConfidence,
    MergeMode, RedshiftType, canonical_name, name_variants,
};
