//! Shared types, error model, and configuration for lead-refresh.
//!
//! This crate is the foundation depended on by all other lead-refresh crates.
//! It provides:
//! - [`RefreshError`] — the unified error type
//! - Domain types ([`InputRecord`], [`CrmLead`], [`LeadUpdate`], [`UpdateStatus`])
//! - Configuration ([`AppConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, Credentials, CrmConfig, CustomFields, InputConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{RefreshError, Result};
pub use types::{CrmLead, InputRecord, LeadUpdate, RecordReport, UpdateStatus};
