//! Typed views over the cached scrape documents.
//!
//! The cache stores raw scraper output. We only read a handful of nested
//! paths, each modelled as an optional field. Entities whose shape does not
//! match are treated as absent rather than failing the whole document.

use std::borrow::Cow;
use std::sync::LazyLock;

use leadrefresh_shared::{RefreshError, Result};
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Company slug following `/company/`, with or without a leading `www.`.
static COMPANY_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"linkedin\.com/company/([^/?#]+)").expect("company url regex")
});

/// Normalized company id inside a `urn:li:fs_normalized_company:<id>` urn.
static NORMALIZED_COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"urn:li:fs_normalized_company:(.+)").expect("normalized company regex")
});

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Cache lookup keys for one company.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileKey {
    /// Company slug taken from the profile URL.
    pub primary_tag: String,
    /// Normalized company id taken from the basic profile.
    pub secondary_tag: String,
}

/// Extract the company slug from a profile URL.
///
/// Percent-encoded slugs are decoded, since the cache request re-encodes the
/// tag as a path segment. Slugs that do not decode to UTF-8 are kept as is.
pub fn primary_tag(profile_url: &str) -> Result<String> {
    COMPANY_URL_RE
        .captures(profile_url.trim())
        .map(|caps| decode_slug(&caps[1]))
        .filter(|tag| !tag.is_empty())
        .ok_or_else(|| RefreshError::malformed_url(profile_url))
}

fn decode_slug(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

// ---------------------------------------------------------------------------
// Basic profile
// ---------------------------------------------------------------------------

/// The `linkedinCompany` document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BasicProfile {
    #[serde(default)]
    pub data: BasicProfileData,
    #[serde(default)]
    pub included: Vec<IncludedEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BasicProfileData {
    /// Urns of the top-level elements; the first one names the company.
    #[serde(rename = "*elements", default, deserialize_with = "lenient_vec")]
    pub elements: Vec<String>,
}

/// One entry of the `included` side-loaded entity list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedEntity {
    #[serde(default, deserialize_with = "lenient_vec_opt")]
    pub confirmed_locations: Option<Vec<Location>>,
    #[serde(default, deserialize_with = "lenient")]
    pub funding_data: Option<FundingData>,
}

impl IncludedEntity {
    pub fn has_confirmed_locations(&self) -> bool {
        self.confirmed_locations.is_some()
    }

    pub fn has_funding_data(&self) -> bool {
        self.funding_data.is_some()
    }
}

/// A confirmed office location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub geographic_area: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingData {
    #[serde(default, deserialize_with = "lenient")]
    pub last_funding_round: Option<FundingRound>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRound {
    #[serde(default)]
    pub announced_on: Option<AnnouncedOn>,
    #[serde(default, deserialize_with = "lenient")]
    pub money_raised: Option<MoneyAmount>,
    #[serde(default)]
    pub funding_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AnnouncedOn {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub day: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyAmount {
    /// Raw amount as scraped (usually a decimal string).
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

impl BasicProfile {
    /// Normalized company id from the first element urn.
    pub fn secondary_tag(&self) -> Result<String> {
        let first = self.data.elements.first().ok_or_else(|| {
            RefreshError::malformed_profile("basic profile has no *elements entry")
        })?;
        NORMALIZED_COMPANY_RE
            .captures(first)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| {
                RefreshError::malformed_profile(format!(
                    "first element '{first}' is not a normalized company urn"
                ))
            })
    }

    /// Confirmed locations of the first entity that carries them.
    pub fn confirmed_locations(&self) -> Option<&[Location]> {
        self.included
            .iter()
            .find(|entity| entity.has_confirmed_locations())
            .and_then(|entity| entity.confirmed_locations.as_deref())
    }

    /// Funding data of the first entity that carries it.
    pub fn funding_data(&self) -> Option<&FundingData> {
        self.included
            .iter()
            .find(|entity| entity.has_funding_data())
            .and_then(|entity| entity.funding_data.as_ref())
    }

    /// Last funding round, when funding data is present and the round is not null.
    pub fn last_funding_round(&self) -> Option<&FundingRound> {
        self.funding_data()
            .and_then(|funding| funding.last_funding_round.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Extended profile
// ---------------------------------------------------------------------------

/// The `salesNavigatorCompany` document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedProfile {
    #[serde(default, deserialize_with = "lenient")]
    pub employee_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub website: Option<String>,
}

// ---------------------------------------------------------------------------
// ResolvedCompany
// ---------------------------------------------------------------------------

/// Both cached documents for one company, held for one record's processing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedCompany {
    pub key: ProfileKey,
    pub basic_profile: BasicProfile,
    pub extended_profile: ExtendedProfile,
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

/// Deserialize `T`, mapping null or a mismatched shape to `None`.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            tracing::debug!(%value, error = %e, "ignored value with unexpected shape");
            Ok(None)
        }
    }
}

/// Deserialize a list, keeping only the elements that match `T`.
fn lenient_vec_opt<'de, D, T>(deserializer: D) -> std::result::Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(None);
    };
    let total = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if kept.len() < total {
        tracing::debug!(dropped = total - kept.len(), "ignored malformed list entries");
    }
    Ok(Some(kept))
}

fn lenient_vec<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient_vec_opt(deserializer)?.unwrap_or_default())
}
