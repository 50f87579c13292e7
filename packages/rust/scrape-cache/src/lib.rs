//! Scrapers cache client and company profile resolution.
//!
//! Scraped company pages are not fetched live: a separate cache service keeps
//! the latest scraper output keyed by `(scraperTag, historyTag)`. Resolving a
//! company takes two sequential lookups, since the key of the extended profile
//! is read out of the basic one.

mod profile;

use std::time::Duration;

use leadrefresh_shared::{CacheConfig, RefreshError, Result};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

pub use profile::{
    AnnouncedOn, BasicProfile, BasicProfileData, ExtendedProfile, FundingData, FundingRound,
    IncludedEntity, Location, MoneyAmount, ProfileKey, ResolvedCompany, primary_tag,
};

/// User-Agent string for cache requests.
const USER_AGENT: &str = concat!("lead-refresh/", env!("CARGO_PKG_VERSION"));

/// Successful cache response body.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Error body returned by the cache service.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// CacheClient
// ---------------------------------------------------------------------------

/// Client for the scrapers cache service.
#[derive(Clone)]
pub struct CacheClient {
    client: Client,
    base_url: Url,
    token: String,
    basic_scraper: String,
    extended_scraper: String,
}

impl CacheClient {
    /// Create a client from the `[cache]` config section and the resolved token.
    pub fn new(config: &CacheConfig, token: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            RefreshError::config(format!("invalid cache base_url '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RefreshError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
            basic_scraper: config.basic_scraper.clone(),
            extended_scraper: config.extended_scraper.clone(),
        })
    }

    /// Resolve both cached profiles for a company profile URL.
    ///
    /// 1. Extract the company slug from the URL
    /// 2. Fetch the basic profile keyed by the slug
    /// 3. Read the normalized company id out of the basic profile
    /// 4. Fetch the extended profile keyed by that id
    #[instrument(skip_all, fields(url = %profile_url))]
    pub async fn resolve(&self, profile_url: &str) -> Result<ResolvedCompany> {
        let primary_tag = primary_tag(profile_url)?;
        debug!(%primary_tag, "fetching basic profile");
        let basic_profile: BasicProfile = self.fetch(&self.basic_scraper, &primary_tag).await?;

        let secondary_tag = basic_profile.secondary_tag()?;
        debug!(%secondary_tag, "fetching extended profile");
        let extended_profile: ExtendedProfile =
            self.fetch(&self.extended_scraper, &secondary_tag).await?;

        info!(
            %primary_tag,
            %secondary_tag,
            included = basic_profile.included.len(),
            "company profile resolved"
        );

        Ok(ResolvedCompany {
            key: ProfileKey {
                primary_tag,
                secondary_tag,
            },
            basic_profile,
            extended_profile,
        })
    }

    /// Fetch one cached document and decode its `data` member.
    pub async fn fetch<T: DeserializeOwned>(&self, scraper_tag: &str, history_tag: &str) -> Result<T> {
        let url = self.document_url(scraper_tag, history_tag)?;

        let response = self
            .client
            .get(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Basic {}", self.token))
            .send()
            .await
            .map_err(|e| RefreshError::cache(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("{url}: HTTP {status}"));
            return Err(RefreshError::cache(message));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| RefreshError::cache(format!("{url}: invalid document: {e}")))?;
        Ok(envelope.data)
    }

    /// `{base}/scrapers/{scraper_tag}/{history_tag}`, each tag as one encoded segment.
    fn document_url(&self, scraper_tag: &str, history_tag: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RefreshError::config(format!("cache base_url cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["scrapers", scraper_tag, history_tag]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CacheClient {
        let config = CacheConfig {
            base_url: server.uri(),
            ..CacheConfig::default()
        };
        CacheClient::new(&config, "cache-token").unwrap()
    }

    async fn mount_basic(server: &MockServer, slug: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/scrapers/linkedinCompany/{slug}")))
            .and(header("authorization", "Basic cache-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": body })))
            .mount(server)
            .await;
    }

    #[test]
    fn document_url_encodes_segments() {
        let config = CacheConfig {
            base_url: "https://cache.example.com/api/".into(),
            ..CacheConfig::default()
        };
        let client = CacheClient::new(&config, "t").unwrap();
        let url = client.document_url("linkedinCompany", "acme corp").unwrap();
        assert_eq!(
            url.as_str(),
            "https://cache.example.com/api/scrapers/linkedinCompany/acme%20corp"
        );
    }

    #[tokio::test]
    async fn resolve_fetches_both_profiles_in_order() {
        let server = MockServer::start().await;

        mount_basic(
            &server,
            "acme",
            json!({
                "data": { "*elements": ["urn:li:fs_normalized_company:4242"] },
                "included": [ { "confirmedLocations": [
                    { "line1": "1 Main St", "city": "Lyon", "country": "FR" }
                ] } ]
            }),
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/scrapers/salesNavigatorCompany/4242"))
            .and(header("authorization", "Basic cache-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "employeeCount": 50, "website": "https://acme.test" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let resolved = client
            .resolve("https://www.linkedin.com/company/acme/")
            .await
            .unwrap();

        assert_eq!(resolved.key.primary_tag, "acme");
        assert_eq!(resolved.key.secondary_tag, "4242");
        assert_eq!(resolved.extended_profile.employee_count, Some(50));
        assert_eq!(resolved.basic_profile.confirmed_locations().unwrap().len(), 1);
    }

    #[test]
    fn document_url_encodes_decoded_slug_once() {
        let config = CacheConfig {
            base_url: "https://cache.example.com".into(),
            ..CacheConfig::default()
        };
        let client = CacheClient::new(&config, "t").unwrap();
        let profile_url = "https://www.linkedin.com/company/soci%C3%A9t%C3%A9-g%C3%A9n%C3%A9rale/";
        let tag = profile::primary_tag(profile_url).unwrap();
        let url = client.document_url("linkedinCompany", &tag).unwrap();
        assert_eq!(
            url.as_str(),
            "https://cache.example.com/scrapers/linkedinCompany/soci%C3%A9t%C3%A9-g%C3%A9n%C3%A9rale"
        );
    }

    #[tokio::test]
    async fn resolve_requests_encoded_slug_as_sent_by_the_profile() {
        let server = MockServer::start().await;
        mount_basic(
            &server,
            "soci%C3%A9t%C3%A9",
            json!({ "data": { "*elements": ["urn:li:fs_normalized_company:7"] } }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/scrapers/salesNavigatorCompany/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let resolved = client_for(&server)
            .resolve("https://www.linkedin.com/company/soci%C3%A9t%C3%A9")
            .await
            .unwrap();
        assert_eq!(resolved.key.primary_tag, "société");
        assert_eq!(resolved.key.secondary_tag, "7");
    }

    #[tokio::test]
    async fn malformed_url_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .resolve("https://example.com/not-a-company")
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::MalformedUrl { .. }));
    }

    #[tokio::test]
    async fn cache_error_carries_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scrapers/linkedinCompany/ghost"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "History not found" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .resolve("https://www.linkedin.com/company/ghost")
            .await
            .unwrap_err();
        match err {
            RefreshError::CacheLookup { message } => assert_eq!(message, "History not found"),
            other => panic!("expected CacheLookup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cache_error_without_body_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .resolve("https://www.linkedin.com/company/acme")
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::CacheLookup { .. }));
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn missing_secondary_tag_stops_before_second_call() {
        let server = MockServer::start().await;
        mount_basic(&server, "acme", json!({ "data": { "*elements": [] } })).await;

        Mock::given(method("GET"))
            .and(path("/scrapers/salesNavigatorCompany/4242"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .resolve("https://linkedin.com/company/acme")
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::MalformedProfile { .. }));
    }
}
