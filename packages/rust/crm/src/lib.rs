//! Close CRM REST client: lead search by profile URL and partial lead updates.
//!
//! Leads are never created here. The search side is deliberately forgiving
//! (a failed lookup reads as "no lead"), the update side reports every failure
//! so callers can record it per field group.

use std::time::Duration;

use leadrefresh_shared::{CrmConfig, CrmLead, LeadUpdate, RefreshError, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

/// User-Agent string for CRM requests.
const USER_AGENT: &str = concat!("lead-refresh/", env!("CARGO_PKG_VERSION"));

/// Lead search response body.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<CrmLead>,
}

/// Error body returned by the CRM API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "field-errors")]
    field_errors: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// CrmClient
// ---------------------------------------------------------------------------

/// Authenticated client for the CRM lead endpoints.
#[derive(Clone)]
pub struct CrmClient {
    client: Client,
    base_url: Url,
    api_key: String,
    profile_url_field: String,
}

impl CrmClient {
    /// Create a client from the `[crm]` config section and the resolved API key.
    pub fn new(config: &CrmConfig, api_key: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            RefreshError::config(format!("invalid crm base_url '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RefreshError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            profile_url_field: config.profile_url_field.clone(),
        })
    }

    /// Find the lead whose profile-URL field equals `profile_url`.
    ///
    /// Lookup failures are logged and read as "no lead".
    pub async fn find_by_profile_url(&self, profile_url: &str) -> Option<CrmLead> {
        match self.try_find_by_profile_url(profile_url).await {
            Ok(lead) => lead,
            Err(e) => {
                warn!(url = profile_url, error = %e, "lead lookup failed");
                None
            }
        }
    }

    /// Strict variant of [`find_by_profile_url`](Self::find_by_profile_url).
    #[instrument(skip_all, fields(url = %profile_url))]
    pub async fn try_find_by_profile_url(&self, profile_url: &str) -> Result<Option<CrmLead>> {
        let url = self.endpoint(&["lead", ""])?;
        let query = format!("{}:\"{profile_url}\"", self.profile_url_field);

        let response = self
            .client
            .get(url)
            .basic_auth(&self.api_key, Some(""))
            .query(&[("query", query.as_str())])
            .send()
            .await
            .map_err(|e| RefreshError::CrmLookup(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::CrmLookup(describe_failure(status, &body)));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::CrmLookup(format!("invalid search response: {e}")))?;

        if body.data.len() > 1 {
            debug!(matches = body.data.len(), "several leads match, using the first");
        }
        Ok(body.data.into_iter().next())
    }

    /// Push a partial update to one lead.
    #[instrument(skip_all, fields(lead_id = %lead_id, fields = update.len()))]
    pub async fn update_lead(&self, lead_id: &str, update: &LeadUpdate) -> Result<()> {
        let url = self.endpoint(&["lead", lead_id, ""])?;

        let response = self
            .client
            .put(url)
            .basic_auth(&self.api_key, Some(""))
            .json(update)
            .send()
            .await
            .map_err(|e| RefreshError::CrmUpdate(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::CrmUpdate(describe_failure(status, &body)));
        }

        debug!("lead updated");
        Ok(())
    }

    /// Base URL extended with `segments`; a trailing `""` keeps the trailing slash.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RefreshError::config(format!("crm base_url cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Human-readable failure from a non-2xx status and its body.
fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(error), ..
        }) => format!("HTTP {status}: {error}"),
        Ok(ErrorBody {
            field_errors: Some(fields),
            ..
        }) => format!("HTTP {status}: {fields}"),
        _ => format!("HTTP {status}"),
    }
}
