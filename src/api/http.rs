use crate::api::traits::ListingApi;
use crate::api::types::SearchFilters;
use crate::error::{CacheError, Result};
use crate::models::{ListingDraft, ListingRecord, TenantId, UserContext, UserProfile};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP implementation of [`ListingApi`] with bearer-token authentication
pub struct HttpListingApi {
    client: Client,
    base_url: String,
}

impl HttpListingApi {
    /// Create a client for the API at `base_url`; every request is bounded by `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("listing-cache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CacheError::FetchFailure(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "API response");
        interpret(status, &body)
    }
}

/// Map a response to its JSON body or to the error kind callers act on.
fn interpret(status: StatusCode, body: &str) -> Result<Value> {
    let parsed = serde_json::from_str::<Value>(body);
    let message = parsed
        .as_ref()
        .ok()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if status == StatusCode::UNAUTHORIZED {
        warn!("API rejected the session token");
        return Err(CacheError::Unauthorized(
            message.unwrap_or_else(|| "session expired, please log in again".to_string()),
        ));
    }
    if !status.is_success() {
        return Err(CacheError::FetchFailure(
            message.unwrap_or_else(|| format!("server returned {}", status)),
        ));
    }
    parsed.map_err(|e| CacheError::MalformedResponse(e.to_string()))
}

/// Decode a JSON array of listings; one bad entry fails the whole payload.
fn decode_records(value: Option<&Value>) -> Result<Vec<ListingRecord>> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(CacheError::MalformedResponse(format!(
                "expected a list of listings, found {}",
                other
            )))
        }
    };
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            ListingRecord::from_value(entry.clone())
                .map_err(|reason| CacheError::MalformedResponse(format!("listing {}: {}", i, reason)))
        })
        .collect()
}

fn decode_record(value: Option<&Value>) -> Result<ListingRecord> {
    let value = value
        .cloned()
        .ok_or_else(|| CacheError::MalformedResponse("response carries no listing".to_string()))?;
    ListingRecord::from_value(value).map_err(CacheError::MalformedResponse)
}

/// Match payloads come back as `{"tenant_ids": [...]}`, or as an empty
/// list / null when nobody matched.
fn decode_matches(data: Option<&Value>) -> Result<Vec<TenantId>> {
    match data {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) if items.is_empty() => Ok(Vec::new()),
        Some(Value::Object(fields)) => match fields.get("tenant_ids") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(ids) => serde_json::from_value(ids.clone())
                .map_err(|e| CacheError::MalformedResponse(format!("tenant_ids: {}", e))),
        },
        Some(other) => Err(CacheError::MalformedResponse(format!(
            "unexpected match payload {}",
            other
        ))),
    }
}

/// Profiles come back as `{"data": [profile]}`; an empty list means unknown user
fn decode_profile(body: &Value) -> Result<Option<UserProfile>> {
    match body.get("data").and_then(|d| d.get(0)) {
        Some(first) => serde_json::from_value(first.clone())
            .map(Some)
            .map_err(|e| CacheError::MalformedResponse(format!("profile: {}", e))),
        None => Ok(None),
    }
}

fn message_or(body: &Value, fallback: &str) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

fn rental_info_form(draft: &ListingDraft) -> Result<Form> {
    let payload = serde_json::to_string(draft)
        .map_err(|e| CacheError::InvalidRecord(format!("failed to encode listing: {}", e)))?;
    let part = Part::text(payload)
        .mime_str("application/json")
        .map_err(|e| CacheError::InvalidRecord(e.to_string()))?;
    Ok(Form::new().part("rentalInfo", part))
}

#[async_trait]
impl ListingApi for HttpListingApi {
    async fn owned_listings(&self, context: &UserContext) -> Result<Vec<ListingRecord>> {
        info!(email = %context.email_id, "fetching owned listings");
        let body = self
            .send(
                self.client
                    .get(self.url("/listings/owner"))
                    .query(&[("emailId", context.email_id.as_str())])
                    .bearer_auth(&context.access_token),
            )
            .await?;
        decode_records(body.get("data"))
    }

    async fn interests(&self, context: &UserContext) -> Result<Vec<ListingRecord>> {
        info!(email = %context.email_id, "fetching interests");
        let body = self
            .send(
                self.client
                    .get(self.url("/interests"))
                    .query(&[("emailId", context.email_id.as_str()), ("choice", "interest")])
                    .bearer_auth(&context.access_token),
            )
            .await?;
        decode_records(body.get("data").and_then(|d| d.get("listings")))
    }

    async fn matches(&self, context: &UserContext, listing_id: &str) -> Result<Vec<TenantId>> {
        info!(listing_id, "fetching matches");
        let body = self
            .send(
                self.client
                    .get(self.url("/interests"))
                    .query(&[
                        ("emailId", context.email_id.as_str()),
                        ("listingId", listing_id),
                        ("choice", "match"),
                    ])
                    .bearer_auth(&context.access_token),
            )
            .await?;
        decode_matches(body.get("data"))
    }

    async fn express_interest(&self, context: &UserContext, listing_id: &str) -> Result<String> {
        let body = self
            .send(
                self.client
                    .post(self.url("/interests"))
                    .json(&json!({
                        "choice": "interest",
                        "emailId": context.email_id,
                        "listingId": listing_id,
                    }))
                    .bearer_auth(&context.access_token),
            )
            .await?;
        Ok(message_or(&body, "Interest recorded"))
    }

    async fn create_listing(&self, context: &UserContext, draft: &ListingDraft) -> Result<ListingRecord> {
        let body = self
            .send(
                self.client
                    .post(self.url("/listings"))
                    .multipart(rental_info_form(draft)?)
                    .bearer_auth(&context.access_token),
            )
            .await?;
        decode_record(Some(&body))
    }

    async fn update_listing(&self, context: &UserContext, draft: &ListingDraft) -> Result<ListingRecord> {
        let body = self
            .send(
                self.client
                    .put(self.url("/listings"))
                    .multipart(rental_info_form(draft)?)
                    .bearer_auth(&context.access_token),
            )
            .await?;
        decode_record(body.get("listing"))
    }

    async fn delete_listing(&self, context: &UserContext, listing_id: &str, owner_id: &str) -> Result<String> {
        let body = self
            .send(
                self.client
                    .delete(self.url("/listings"))
                    .query(&[("listingId", listing_id), ("ownerId", owner_id)])
                    .bearer_auth(&context.access_token),
            )
            .await?;
        Ok(message_or(&body, "Listing deleted"))
    }

    async fn search(&self, filters: &SearchFilters) -> Result<Vec<ListingRecord>> {
        let query = filters.query_pairs();
        debug!(?query, "searching listings");
        let body = self
            .send(self.client.get(self.url("/search")).query(&query))
            .await?;
        decode_records(body.get("result"))
    }

    async fn profile(&self, context: &UserContext) -> Result<Option<UserProfile>> {
        let body = self
            .send(
                self.client
                    .get(self.url("/profile"))
                    .query(&[("emailId", context.email_id.as_str())])
                    .bearer_auth(&context.access_token),
            )
            .await?;
        decode_profile(&body)
    }

    async fn update_profile(&self, context: &UserContext, profile: &UserProfile) -> Result<()> {
        self.send(
            self.client
                .patch(self.url("/profile"))
                .json(&json!({ "userInfo": profile }))
                .bearer_auth(&context.access_token),
        )
        .await?;
        Ok(())
    }

    async fn tenant_profile(&self, context: &UserContext, tenant_id: &str) -> Result<Option<UserProfile>> {
        info!(tenant_id, "fetching tenant profile");
        let body = self
            .send(
                self.client
                    .get(self.url("/profile"))
                    .query(&[("userId", tenant_id)])
                    .bearer_auth(&context.access_token),
            )
            .await?;
        decode_profile(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(id: &str) -> Value {
        json!({
            "listingId": id,
            "ownerId": "owner@example.com",
            "bhk": 2,
            "rpm": 12000,
            "state": "Karnataka",
            "district": "Bengaluru Urban",
            "area": "Indiranagar",
            "dateAvailable": "2024-06-01"
        })
    }

    #[test]
    fn unauthorized_is_distinct() {
        let err = interpret(StatusCode::UNAUTHORIZED, r#"{"message":"Token expired"}"#).unwrap_err();
        assert_eq!(err, CacheError::Unauthorized("Token expired".into()));
    }

    #[test]
    fn server_message_is_surfaced_verbatim() {
        let err = interpret(StatusCode::BAD_REQUEST, r#"{"message":"Listing is locked"}"#).unwrap_err();
        assert_eq!(err, CacheError::FetchFailure("Listing is locked".into()));

        let err = interpret(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert!(err.is_fetch_failure());
    }

    #[test]
    fn unparsable_success_body_is_malformed() {
        let err = interpret(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, CacheError::MalformedResponse(_)));
    }

    #[test]
    fn one_bad_listing_fails_the_whole_payload() {
        let payload = json!([wire("L1"), {"listingId": "L2"}]);
        let err = decode_records(Some(&payload)).unwrap_err();
        assert!(matches!(err, CacheError::MalformedResponse(ref m) if m.starts_with("listing 1")));
    }

    #[test]
    fn absent_listing_data_is_empty() {
        assert!(decode_records(None).unwrap().is_empty());
        assert!(decode_records(Some(&Value::Null)).unwrap().is_empty());
        assert_eq!(decode_records(Some(&json!([wire("L1")]))).unwrap().len(), 1);
        assert!(decode_records(Some(&json!({"listings": []}))).is_err());
    }

    #[test]
    fn match_payload_shapes() {
        assert!(decode_matches(None).unwrap().is_empty());
        assert!(decode_matches(Some(&json!([]))).unwrap().is_empty());
        assert_eq!(
            decode_matches(Some(&json!({"tenant_ids": ["t1", "t2"]}))).unwrap(),
            vec!["t1".to_string(), "t2".to_string()]
        );
        assert!(decode_matches(Some(&json!({"tenant_ids": [1]}))).is_err());
        assert!(decode_matches(Some(&json!("nobody"))).is_err());
    }

    #[test]
    fn profile_payload_shapes() {
        let body = json!({"data": [{"name": "Meera", "emailId": "t1@example.com", "gender": "F"}]});
        let profile = decode_profile(&body).unwrap().unwrap();
        assert_eq!(profile.name, "Meera");
        assert_eq!(profile.email_id, "t1@example.com");

        assert_eq!(decode_profile(&json!({"data": []})).unwrap(), None);
        assert!(decode_profile(&json!({"data": ["nobody"]})).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let api = HttpListingApi::new("https://api.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.url("/search"), "https://api.example.com/search");
    }
}
