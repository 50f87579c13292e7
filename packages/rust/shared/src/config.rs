//! Application configuration for lead-refresh.
//!
//! User config lives at `~/.lead-refresh/lead-refresh.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file: it only names the env vars holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RefreshError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "lead-refresh.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".lead-refresh";

// ---------------------------------------------------------------------------
// Config structs (matching lead-refresh.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Lead list settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Scrapers cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// CRM settings.
    #[serde(default)]
    pub crm: CrmConfig,
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Path of the CSV lead list.
    #[serde(default = "default_input_path")]
    pub path: String,

    /// Header of the column holding the company profile URL.
    #[serde(default = "default_url_column")]
    pub url_column: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            url_column: default_url_column(),
        }
    }
}

fn default_input_path() -> String {
    "./leads.csv".into()
}
fn default_url_column() -> String {
    "companyLinkedinUrl".into()
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Base URL of the scrapers cache service.
    #[serde(default = "default_cache_base_url")]
    pub base_url: String,

    /// Name of the env var holding the cache token.
    #[serde(default = "default_cache_token_env")]
    pub token_env: String,

    /// Scraper tag of the basic company profile.
    #[serde(default = "default_basic_scraper")]
    pub basic_scraper: String,

    /// Scraper tag of the extended company profile.
    #[serde(default = "default_extended_scraper")]
    pub extended_scraper: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_url: default_cache_base_url(),
            token_env: default_cache_token_env(),
            basic_scraper: default_basic_scraper(),
            extended_scraper: default_extended_scraper(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_cache_base_url() -> String {
    "https://scrapers-cache.herokuapp.com".into()
}
fn default_cache_token_env() -> String {
    "CACHE_TOKEN".into()
}
fn default_basic_scraper() -> String {
    "linkedinCompany".into()
}
fn default_extended_scraper() -> String {
    "salesNavigatorCompany".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[crm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Base URL of the CRM REST API.
    #[serde(default = "default_crm_base_url")]
    pub base_url: String,

    /// Name of the env var holding the CRM API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Search field holding the company profile URL on each lead.
    #[serde(default = "default_profile_url_field")]
    pub profile_url_field: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Custom field identifiers.
    #[serde(default)]
    pub custom_fields: CustomFields,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: default_crm_base_url(),
            api_key_env: default_api_key_env(),
            profile_url_field: default_profile_url_field(),
            timeout_secs: default_timeout_secs(),
            custom_fields: CustomFields::default(),
        }
    }
}

fn default_crm_base_url() -> String {
    "https://api.close.com/api/v1".into()
}
fn default_api_key_env() -> String {
    "CLOSEIO_APIKEY".into()
}
fn default_profile_url_field() -> String {
    "linkedin_company".into()
}

/// `[crm.custom_fields]` section — opaque, pre-provisioned custom field ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFields {
    /// Employee count.
    #[serde(default = "default_fte_field")]
    pub fte: String,
    /// Last funding round amount.
    #[serde(default = "default_funding_amount_field")]
    pub funding_amount: String,
    /// Last funding round announcement date.
    #[serde(default = "default_funding_date_field")]
    pub funding_date: String,
    /// Last funding round type label.
    #[serde(default = "default_funding_type_field")]
    pub funding_type: String,
    /// Industry label.
    #[serde(default = "default_industry_field")]
    pub industry: String,
}

impl Default for CustomFields {
    fn default() -> Self {
        Self {
            fte: default_fte_field(),
            funding_amount: default_funding_amount_field(),
            funding_date: default_funding_date_field(),
            funding_type: default_funding_type_field(),
            industry: default_industry_field(),
        }
    }
}

impl CustomFields {
    /// Update key for a custom field id (`custom.<id>`).
    pub fn key(id: &str) -> String {
        format!("custom.{id}")
    }
}

fn default_fte_field() -> String {
    "lcf_CpqzI0t50mc3P052ZlAy9YAx2iC2ofOPDUNUHPHCcrG".into()
}
fn default_funding_amount_field() -> String {
    "lcf_9Z3LDpeub9fpLx6G7r9g2EGw0yTzAcH39giBGTWkZRk".into()
}
fn default_funding_date_field() -> String {
    "lcf_h0rUN4DUjTKmNgyTvX6ViHyW7K0oSel4kQuNKaPnj4z".into()
}
fn default_funding_type_field() -> String {
    "lcf_5X1PGJB0YSCBO9wVW833wFnVHz59PvnnWD0pfjmwdxh".into()
}
fn default_industry_field() -> String {
    "lcf_rbpfN3AmrbcLW9OjmSFEXc6qfYt5OXXBwiuhvGX8JsZ".into()
}

// ---------------------------------------------------------------------------
// Credentials (runtime, resolved once from the environment)
// ---------------------------------------------------------------------------

/// Secrets resolved once at startup and injected into the service clients.
#[derive(Clone)]
pub struct Credentials {
    /// CRM API key, sent as the basic-auth username.
    pub crm_api_key: String,
    /// Scrapers cache token, sent verbatim after `Basic `.
    pub cache_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("crm_api_key", &"<redacted>")
            .field("cache_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read both secrets from the env vars named in `config`.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            crm_api_key: read_secret(&config.crm.api_key_env, "CRM API key")?,
            cache_token: read_secret(&config.cache.token_env, "scrapers cache token")?,
        })
    }
}

fn read_secret(var_name: &str, what: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(RefreshError::config(format!(
            "{what} not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.lead-refresh/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| RefreshError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.lead-refresh/lead-refresh.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RefreshError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| RefreshError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RefreshError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RefreshError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RefreshError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that both service base URLs parse as absolute http(s) URLs.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    for (name, raw) in [
        ("cache.base_url", &config.cache.base_url),
        ("crm.base_url", &config.crm.base_url),
    ] {
        let url = Url::parse(raw)
            .map_err(|e| RefreshError::config(format!("{name} '{raw}' is not a valid URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RefreshError::config(format!(
                "{name} '{raw}' must use http or https"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("companyLinkedinUrl"));
        assert!(toml_str.contains("CLOSEIO_APIKEY"));
        assert!(toml_str.contains("CACHE_TOKEN"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[cache]
base_url = "http://localhost:4000"

[crm.custom_fields]
fte = "lcf_test_fte"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.cache.base_url, "http://localhost:4000");
        assert_eq!(config.cache.basic_scraper, "linkedinCompany");
        assert_eq!(config.crm.custom_fields.fte, "lcf_test_fte");
        assert_eq!(
            config.crm.custom_fields.industry,
            "lcf_rbpfN3AmrbcLW9OjmSFEXc6qfYt5OXXBwiuhvGX8JsZ"
        );
        assert_eq!(config.input.url_column, "companyLinkedinUrl");
    }

    #[test]
    fn custom_field_key_is_prefixed() {
        assert_eq!(CustomFields::key("lcf_abc"), "custom.lcf_abc");
    }

    #[test]
    fn invalid_base_url_rejected() {
        let mut config = AppConfig::default();
        config.crm.base_url = "not a url".into();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("crm.base_url"));

        config.crm.base_url = "ftp://api.example.com".into();
        assert!(validate_config(&config).is_err());

        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn missing_secret_reported() {
        let mut config = AppConfig::default();
        // Use unique env var names to avoid interfering with other tests
        config.crm.api_key_env = "LR_TEST_NONEXISTENT_KEY_12345".into();
        config.cache.token_env = "LR_TEST_NONEXISTENT_TOKEN_12345".into();
        let result = Credentials::from_env(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("LR_TEST_NONEXISTENT_KEY_12345")
        );
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials {
            crm_api_key: "api_secret".into(),
            cache_token: "token_secret".into(),
        };
        let printed = format!("{creds:?}");
        assert!(!printed.contains("api_secret"));
        assert!(!printed.contains("token_secret"));
    }
}
