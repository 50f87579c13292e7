//! Core domain types shared by the resolver, the CRM client and the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// InputRecord
// ---------------------------------------------------------------------------

/// One row of the lead list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Public company profile URL, the join key between cache and CRM.
    pub company_profile_url: String,
}

impl InputRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            company_profile_url: url.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CrmLead
// ---------------------------------------------------------------------------

/// A lead as returned by the CRM search endpoint. Only the fields we read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmLead {
    /// CRM-internal lead identifier.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

// ---------------------------------------------------------------------------
// LeadUpdate
// ---------------------------------------------------------------------------

/// Partial-update payload: CRM field name → new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LeadUpdate(Map<String, Value>);

impl LeadUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field, replacing any previous value for the same key.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the fields this update sets.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// UpdateStatus / RecordReport
// ---------------------------------------------------------------------------

/// Which optional field groups were successfully pushed for one lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub fte: bool,
    pub locations: bool,
    pub funding: bool,
    pub description: bool,
    pub website: bool,
    pub industry: bool,
}

impl UpdateStatus {
    /// Number of field groups that were updated.
    pub fn updated_count(&self) -> usize {
        [
            self.fte,
            self.locations,
            self.funding,
            self.description,
            self.website,
            self.industry,
        ]
        .into_iter()
        .filter(|flag| *flag)
        .count()
    }
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}

/// Outcome of processing one record that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordReport {
    /// A lead was found; the status says which groups were pushed.
    Updated(UpdateStatus),
    /// No lead carries this profile URL; nothing was pushed.
    LeadNotFound,
    /// Updates were planned but not sent.
    DryRun { planned: usize },
}

impl std::fmt::Display for RecordReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Updated(status) => write!(f, "{status}"),
            Self::LeadNotFound => f.write_str("lead not found"),
            Self::DryRun { planned } => write!(f, "dry run, {planned} update(s) planned"),
        }
    }
}
