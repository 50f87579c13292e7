//! Per-lead update orchestration.
//!
//! Decides which field groups the resolved profile can fill, maps each one to
//! a partial update, and pushes them one call at a time. A failing group is
//! logged and left unflagged; it never stops the groups after it.

use tracing::{info, instrument, warn};

use leadrefresh_crm::CrmClient;
use leadrefresh_scrape_cache::ResolvedCompany;
use leadrefresh_shared::{CrmLead, CustomFields, LeadUpdate, Result, UpdateStatus};

use crate::mapping;

// ---------------------------------------------------------------------------
// Field groups
// ---------------------------------------------------------------------------

/// One independently updated group of lead fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Fte,
    Locations,
    Funding,
    Description,
    Industry,
    Website,
}

impl FieldGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fte => "fte",
            Self::Locations => "locations",
            Self::Funding => "funding",
            Self::Description => "description",
            Self::Industry => "industry",
            Self::Website => "website",
        }
    }

    /// Flip this group's flag in `status`.
    fn mark(self, status: &mut UpdateStatus) {
        match self {
            Self::Fte => status.fte = true,
            Self::Locations => status.locations = true,
            Self::Funding => status.funding = true,
            Self::Description => status.description = true,
            Self::Industry => status.industry = true,
            Self::Website => status.website = true,
        }
    }
}

impl std::fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// An update the profile supports, ready to send unless its mapping failed.
#[derive(Debug)]
pub struct PlannedUpdate {
    pub group: FieldGroup,
    pub payload: Result<LeadUpdate>,
}

impl PlannedUpdate {
    fn new(group: FieldGroup, payload: Result<LeadUpdate>) -> Self {
        Self { group, payload }
    }
}

/// Plan one update per field group present in the resolved profile.
///
/// Order: fte, locations, funding, description, industry, website.
pub fn plan_updates(resolved: &ResolvedCompany, fields: &CustomFields) -> Vec<PlannedUpdate> {
    let basic = &resolved.basic_profile;
    let extended = &resolved.extended_profile;
    let mut plan = Vec::new();

    if let Some(count) = extended.employee_count.filter(|count| *count > 0) {
        plan.push(PlannedUpdate::new(
            FieldGroup::Fte,
            Ok(mapping::fte_update(count, fields)),
        ));
    }

    if let Some(locations) = basic.confirmed_locations().filter(|l| !l.is_empty()) {
        plan.push(PlannedUpdate::new(
            FieldGroup::Locations,
            Ok(mapping::address_update(locations)),
        ));
    }

    if let Some(round) = basic.last_funding_round() {
        plan.push(PlannedUpdate::new(
            FieldGroup::Funding,
            mapping::funding_update(round, fields),
        ));
    }

    if let Some(description) = non_empty(&extended.description) {
        plan.push(PlannedUpdate::new(
            FieldGroup::Description,
            Ok(mapping::field_update("description", description)),
        ));
    }

    if let Some(industry) = non_empty(&extended.industry) {
        plan.push(PlannedUpdate::new(
            FieldGroup::Industry,
            Ok(mapping::field_update(
                &CustomFields::key(&fields.industry),
                industry,
            )),
        ));
    }

    if let Some(website) = non_empty(&extended.website) {
        plan.push(PlannedUpdate::new(
            FieldGroup::Website,
            Ok(mapping::field_update("url", website)),
        ));
    }

    plan
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Applying
// ---------------------------------------------------------------------------

/// Plan and push every supported field group for `lead`.
#[instrument(skip_all, fields(lead_id = %lead.id))]
pub async fn apply_updates(
    crm: &CrmClient,
    fields: &CustomFields,
    resolved: &ResolvedCompany,
    lead: &CrmLead,
) -> UpdateStatus {
    let plan = plan_updates(resolved, fields);
    apply_plan(crm, lead, plan).await
}

/// Push planned updates one at a time, flagging each group that succeeds.
pub async fn apply_plan(crm: &CrmClient, lead: &CrmLead, plan: Vec<PlannedUpdate>) -> UpdateStatus {
    let mut status = UpdateStatus::default();

    for PlannedUpdate { group, payload } in plan {
        let result = match payload {
            Ok(update) => crm.update_lead(&lead.id, &update).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => group.mark(&mut status),
            Err(e) => warn!(%group, error = %e, "could not update field group"),
        }
    }

    info!(updated = status.updated_count(), "lead updates applied");
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadrefresh_scrape_cache::{
        AnnouncedOn, BasicProfile, ExtendedProfile, FundingData, FundingRound, IncludedEntity,
        Location,
    };
    use leadrefresh_shared::CrmConfig;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn location() -> Location {
        Location {
            line1: "1 Main St".into(),
            line2: None,
            city: "Lyon".into(),
            geographic_area: None,
            postal_code: None,
            country: "FR".into(),
        }
    }

    fn funding_entity(round: Option<FundingRound>) -> IncludedEntity {
        IncludedEntity {
            confirmed_locations: None,
            funding_data: Some(FundingData {
                last_funding_round: round,
            }),
        }
    }

    fn full_company() -> ResolvedCompany {
        ResolvedCompany {
            basic_profile: BasicProfile {
                included: vec![
                    IncludedEntity {
                        confirmed_locations: Some(vec![location()]),
                        funding_data: None,
                    },
                    funding_entity(Some(FundingRound {
                        announced_on: Some(AnnouncedOn {
                            year: Some(2020),
                            month: Some(1),
                            day: Some(15),
                        }),
                        money_raised: None,
                        funding_type: "SERIES_UNKNOWN".into(),
                    })),
                ],
                ..Default::default()
            },
            extended_profile: ExtendedProfile {
                employee_count: Some(120),
                description: Some("We make widgets".into()),
                industry: Some("Manufacturing".into()),
                website: Some("https://acme.test".into()),
            },
            ..Default::default()
        }
    }

    fn lead() -> CrmLead {
        CrmLead {
            id: "lead_1".into(),
            display_name: None,
        }
    }

    fn crm_for(server: &MockServer) -> CrmClient {
        let config = CrmConfig {
            base_url: server.uri(),
            ..CrmConfig::default()
        };
        CrmClient::new(&config, "key").unwrap()
    }

    fn groups(plan: &[PlannedUpdate]) -> Vec<FieldGroup> {
        plan.iter().map(|p| p.group).collect()
    }

    #[test]
    fn plan_covers_every_present_group_in_order() {
        let plan = plan_updates(&full_company(), &CustomFields::default());
        assert_eq!(
            groups(&plan),
            vec![
                FieldGroup::Fte,
                FieldGroup::Locations,
                FieldGroup::Funding,
                FieldGroup::Description,
                FieldGroup::Industry,
                FieldGroup::Website,
            ]
        );
        assert!(plan.iter().all(|p| p.payload.is_ok()));
    }

    #[test]
    fn plan_skips_absent_and_empty_values() {
        let mut company = ResolvedCompany::default();
        company.extended_profile = ExtendedProfile {
            employee_count: Some(0),
            description: Some(String::new()),
            industry: None,
            website: Some(String::new()),
        };
        company.basic_profile.included = vec![
            IncludedEntity {
                confirmed_locations: Some(vec![]),
                funding_data: None,
            },
            funding_entity(None),
        ];
        assert!(plan_updates(&company, &CustomFields::default()).is_empty());
    }

    #[test]
    fn industry_goes_to_custom_field() {
        let fields = CustomFields::default();
        let plan = plan_updates(&full_company(), &fields);
        let industry = plan
            .iter()
            .find(|p| p.group == FieldGroup::Industry)
            .unwrap();
        let payload = industry.payload.as_ref().unwrap();
        assert_eq!(
            payload.get(&CustomFields::key(&fields.industry)),
            Some(&json!("Manufacturing"))
        );
    }

    #[tokio::test]
    async fn fte_and_locations_only_makes_two_calls() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/lead/lead_1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "lead_1" })))
            .expect(2)
            .mount(&server)
            .await;

        let mut company = ResolvedCompany::default();
        company.extended_profile.employee_count = Some(50);
        company.basic_profile.included = vec![IncludedEntity {
            confirmed_locations: Some(vec![location()]),
            funding_data: None,
        }];

        let status =
            apply_updates(&crm_for(&server), &CustomFields::default(), &company, &lead()).await;
        assert_eq!(
            status,
            UpdateStatus {
                fte: true,
                locations: true,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn failing_group_does_not_stop_the_others() {
        let server = MockServer::start().await;
        // Address updates are rejected, everything else succeeds.
        Mock::given(method("PUT"))
            .and(body_partial_json(json!({ "addresses": [ { "city": "Lyon" } ] })))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "bad address" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "lead_1" })))
            .expect(5)
            .mount(&server)
            .await;

        let status = apply_updates(
            &crm_for(&server),
            &CustomFields::default(),
            &full_company(),
            &lead(),
        )
        .await;
        assert_eq!(
            status,
            UpdateStatus {
                fte: true,
                locations: false,
                funding: true,
                description: true,
                website: true,
                industry: true,
            }
        );
    }

    #[tokio::test]
    async fn mapping_failure_skips_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "lead_1" })))
            .expect(0)
            .mount(&server)
            .await;

        let mut company = ResolvedCompany::default();
        company.basic_profile.included = vec![funding_entity(Some(FundingRound {
            announced_on: Some(AnnouncedOn {
                year: Some(2020),
                month: None,
                day: None,
            }),
            money_raised: None,
            funding_type: "SEED".into(),
        }))];

        let status =
            apply_updates(&crm_for(&server), &CustomFields::default(), &company, &lead()).await;
        assert_eq!(status, UpdateStatus::default());
    }
}
