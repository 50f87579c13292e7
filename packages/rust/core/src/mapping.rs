//! Pure mappers from cached profile values to CRM update payloads.

use chrono::NaiveDate;
use serde_json::{Value, json};

use leadrefresh_scrape_cache::{AnnouncedOn, FundingRound, Location};
use leadrefresh_shared::{CustomFields, LeadUpdate, RefreshError, Result};

/// Amount written when the last round has no disclosed amount.
pub const AMOUNT_NOT_FOUND: &str = "Not Found";

/// Employee count onto the FTE custom field.
pub fn fte_update(employee_count: u64, fields: &CustomFields) -> LeadUpdate {
    LeadUpdate::new().set(CustomFields::key(&fields.fte), employee_count)
}

/// Confirmed locations onto the lead's address list.
pub fn address_update(locations: &[Location]) -> LeadUpdate {
    let addresses: Vec<Value> = locations.iter().map(address).collect();
    LeadUpdate::new().set("addresses", addresses)
}

fn address(location: &Location) -> Value {
    json!({
        "address_1": location.line1,
        "address_2": location.line2.as_deref().unwrap_or(""),
        "city": location.city,
        "state": location.geographic_area.as_deref().unwrap_or(""),
        "zipcode": location.postal_code.as_deref().unwrap_or(""),
        "country": location.country,
    })
}

/// Last funding round onto the amount, date and type custom fields.
pub fn funding_update(round: &FundingRound, fields: &CustomFields) -> Result<LeadUpdate> {
    let amount = round
        .money_raised
        .as_ref()
        .and_then(|money| money.amount.clone())
        .filter(|amount| !amount.is_null())
        .unwrap_or_else(|| Value::from(AMOUNT_NOT_FOUND));

    Ok(LeadUpdate::new()
        .set(CustomFields::key(&fields.funding_amount), amount)
        .set(
            CustomFields::key(&fields.funding_date),
            funding_date(round.announced_on)?,
        )
        .set(
            CustomFields::key(&fields.funding_type),
            funding_type_label(&round.funding_type),
        ))
}

/// `month/day/year` without zero padding, e.g. `3/7/2019`.
pub fn funding_date(announced_on: Option<AnnouncedOn>) -> Result<String> {
    let on = announced_on.ok_or_else(|| RefreshError::mapping("funding round has no announcement date"))?;
    let (Some(year), Some(month), Some(day)) = (on.year, on.month, on.day) else {
        return Err(RefreshError::mapping(format!(
            "incomplete funding announcement date: {on:?}"
        )));
    };
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        RefreshError::mapping(format!("invalid funding announcement date {year}-{month}-{day}"))
    })?;
    Ok(date.format("%-m/%-d/%Y").to_string())
}

/// Human label for a scraped funding type (`SERIES_UNKNOWN` style).
pub fn funding_type_label(raw: &str) -> String {
    capitalize(raw)
        .replacen('_', " ", 1)
        .replace("Series unknown", "Venture - Series Unknown")
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// One built-in or custom field set to a raw value.
pub fn field_update(field: &str, value: impl Into<Value>) -> LeadUpdate {
    LeadUpdate::new().set(field, value)
}
