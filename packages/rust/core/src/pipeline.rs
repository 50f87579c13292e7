//! Per-record pipeline: profile URL → cached profiles → CRM lead → updates.

use tracing::{info, instrument, warn};

use leadrefresh_crm::CrmClient;
use leadrefresh_scrape_cache::{CacheClient, ResolvedCompany};
use leadrefresh_shared::{AppConfig, Credentials, CustomFields, RecordReport, Result};

use crate::update::{self, PlannedUpdate};

/// The service clients and field mapping needed to refresh one lead.
#[derive(Clone)]
pub struct Pipeline {
    cache: CacheClient,
    crm: CrmClient,
    fields: CustomFields,
    dry_run: bool,
}

impl Pipeline {
    /// Build both service clients from config and the resolved secrets.
    pub fn new(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            cache: CacheClient::new(&config.cache, credentials.cache_token.clone())?,
            crm: CrmClient::new(&config.crm, credentials.crm_api_key.clone())?,
            fields: config.crm.custom_fields.clone(),
            dry_run: false,
        })
    }

    /// Locate leads and plan updates without sending them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Refresh the lead matching one company profile URL.
    ///
    /// Fails when the URL is malformed or the cache lookup fails. A missing
    /// lead is not a failure: nothing is sent and `LeadNotFound` is reported.
    #[instrument(skip_all, fields(url = %profile_url))]
    pub async fn process(&self, profile_url: &str) -> Result<RecordReport> {
        let resolved = self.cache.resolve(profile_url).await?;

        let Some(lead) = self.crm.find_by_profile_url(profile_url).await else {
            warn!("no CRM lead matches this profile, skipping updates");
            return Ok(RecordReport::LeadNotFound);
        };

        if self.dry_run {
            let plan = update::plan_updates(&resolved, &self.fields);
            log_plan(&lead.id, &plan);
            return Ok(RecordReport::DryRun {
                planned: plan.iter().filter(|p| p.payload.is_ok()).count(),
            });
        }

        let status = update::apply_updates(&self.crm, &self.fields, &resolved, &lead).await;
        Ok(RecordReport::Updated(status))
    }

    /// Resolve a profile and plan its updates without touching the CRM.
    pub async fn inspect(&self, profile_url: &str) -> Result<(ResolvedCompany, Vec<PlannedUpdate>)> {
        let resolved = self.cache.resolve(profile_url).await?;
        let plan = update::plan_updates(&resolved, &self.fields);
        Ok((resolved, plan))
    }
}

fn log_plan(lead_id: &str, plan: &[PlannedUpdate]) {
    for planned in plan {
        match &planned.payload {
            Ok(update) => {
                let fields: Vec<&str> = update.fields().collect();
                info!(lead_id, group = %planned.group, ?fields, "dry run: would update");
            }
            Err(e) => warn!(lead_id, group = %planned.group, error = %e, "dry run: cannot map"),
        }
    }
}
