pub mod flex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Identifier of a tenant returned by a match lookup
pub type TenantId = String;

/// The signed-in user a cache index is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub email_id: String,
    pub access_token: String,
}

impl UserContext {
    pub fn new(email_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            access_token: access_token.into(),
        }
    }
}

/// Physical details of the rental unit
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RentalInformation {
    pub address1: String,
    pub address2: Option<String>,
    pub pincode: Option<String>,
    #[serde(deserialize_with = "flex::opt_u32")]
    pub baths: Option<u32>,
    #[serde(deserialize_with = "flex::opt_u32")]
    pub balconies: Option<u32>,
    #[serde(deserialize_with = "flex::opt_u32")]
    pub floor: Option<u32>,
    pub facing: Option<String>,
    pub has_elevator: bool,
    pub has_borewell: bool,
    #[serde(deserialize_with = "flex::opt_u32")]
    pub max_occupants: Option<u32>,
    pub water_availability: Option<String>,
    pub occupant_type: Option<String>,
    pub utilities: BTreeSet<String>,
    pub amenities: BTreeSet<String>,
    /// Media references for the home tour, as issued by the upload service
    pub home_tour: Vec<String>,
}

impl RentalInformation {
    /// Single-line postal address
    pub fn address(&self) -> String {
        let mut parts = vec![self.address1.trim()];
        if let Some(line) = self.address2.as_deref() {
            parts.push(line.trim());
        }
        if let Some(pin) = self.pincode.as_deref() {
            parts.push(pin.trim());
        }
        parts.retain(|p| !p.is_empty());
        parts.join(", ")
    }
}

/// Money and notice terms attached to a lease
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaseTerms {
    #[serde(deserialize_with = "flex::opt_f64")]
    pub advance_amount: Option<f64>,
    /// Lease tenure in months
    #[serde(deserialize_with = "flex::opt_u32")]
    pub lease_tenure: Option<u32>,
    #[serde(rename = "maintainance", deserialize_with = "flex::opt_f64")]
    pub maintenance: Option<f64>,
    #[serde(rename = "waterbill", deserialize_with = "flex::opt_f64")]
    pub water_bill: Option<f64>,
    pub electricity_bill_included: bool,
    /// Days of notice required before vacating
    #[serde(rename = "vacancyNotification", deserialize_with = "flex::opt_u32")]
    pub vacancy_notice_days: Option<u32>,
}

/// A rental listing as cached on the client.
///
/// `listing_id` is the sole identity: a newer record with the same id
/// replaces the older one wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub listing_id: String,
    pub owner_id: String,
    #[serde(deserialize_with = "flex::u32")]
    pub bhk: u32,
    /// Monthly rent
    #[serde(deserialize_with = "flex::f64")]
    pub rpm: f64,
    pub state: String,
    pub district: String,
    pub area: String,
    #[serde(deserialize_with = "flex::date")]
    pub date_available: NaiveDate,
    #[serde(default)]
    pub rental_information: RentalInformation,
    #[serde(default)]
    pub lease_terms: LeaseTerms,
    #[serde(default)]
    pub highlights: Vec<String>,
    /// Server fields this client does not model, kept so a cached record
    /// round-trips without loss
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListingRecord {
    /// Decode and validate a single untyped entry.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let record: ListingRecord = serde_json::from_value(value).map_err(|e| e.to_string())?;
        record.validate()?;
        Ok(record)
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.listing_id.trim().is_empty() {
            return Err("listingId must not be empty".to_string());
        }
        if !self.rpm.is_finite() || self.rpm < 0.0 {
            return Err(format!(
                "listing {} has an invalid rent {}",
                self.listing_id, self.rpm
            ));
        }
        Ok(())
    }
}

/// Create/update payload sent as the `rentalInfo` part of a listing request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    /// Present only when updating an existing listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<String>,
    pub email_id: String,
    pub bhk: u32,
    pub rpm: f64,
    pub state: String,
    pub district: String,
    pub area: String,
    pub date_available: NaiveDate,
    pub rental_information: RentalInformation,
    pub lease_terms: LeaseTerms,
    pub highlights: Vec<String>,
}

impl ListingDraft {
    /// Draft for editing an existing record
    pub fn from_record(record: &ListingRecord, email_id: impl Into<String>) -> Self {
        Self {
            listing_id: Some(record.listing_id.clone()),
            email_id: email_id.into(),
            bhk: record.bhk,
            rpm: record.rpm,
            state: record.state.clone(),
            district: record.district.clone(),
            area: record.area.clone(),
            date_available: record.date_available,
            rental_information: record.rental_information.clone(),
            lease_terms: record.lease_terms.clone(),
            highlights: record.highlights.clone(),
        }
    }
}

/// Cached profile of the signed-in user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "emailId", default)]
    pub email_id: String,
    #[serde(default)]
    pub contact_num: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
