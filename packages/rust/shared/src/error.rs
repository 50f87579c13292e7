//! Error types for lead-refresh.
//!
//! Library crates use [`RefreshError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all lead-refresh operations.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The lead list could not be read or is missing a required column.
    #[error("input error: {message}")]
    Input { message: String },

    /// The company profile URL does not match the expected pattern.
    #[error("Wrong url format: {url}")]
    MalformedUrl { url: String },

    /// The cached basic profile does not carry a usable secondary identifier.
    #[error("malformed cached profile: {message}")]
    MalformedProfile { message: String },

    /// The scrapers cache returned an error or an unreadable document.
    #[error("Scraper cache error : {message}")]
    CacheLookup { message: String },

    /// Searching the CRM for a lead failed.
    #[error("CRM lookup error: {0}")]
    CrmLookup(String),

    /// A partial lead update was rejected by the CRM.
    #[error("CRM update error: {0}")]
    CrmUpdate(String),

    /// A cached value could not be turned into an update payload.
    #[error("mapping error: {message}")]
    Mapping { message: String },

    /// Network-level error unrelated to a specific service call.
    #[error("network error: {0}")]
    Network(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RefreshError>;

impl RefreshError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an input error from any displayable message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    /// Create a malformed-URL error for the given profile URL.
    pub fn malformed_url(url: impl Into<String>) -> Self {
        Self::MalformedUrl { url: url.into() }
    }

    /// Create a malformed-profile error from any displayable message.
    pub fn malformed_profile(msg: impl Into<String>) -> Self {
        Self::MalformedProfile {
            message: msg.into(),
        }
    }

    /// Create a cache lookup error from any displayable message.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::CacheLookup {
            message: msg.into(),
        }
    }

    /// Create a mapping error from any displayable message.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
