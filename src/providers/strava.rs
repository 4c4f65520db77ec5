// ABOUTME: Strava API client for OAuth token exchange, activity listing, and streams
// ABOUTME: Maps Strava wire formats into provider-neutral summaries with proper error handling

//! # Strava Provider
//!
//! Implements the [`FitnessProvider`] trait against the Strava v3 API and
//! exposes the token-endpoint operations (authorization-code exchange and
//! refresh) used by the token manager.

use super::{ActivitySummary, FitnessProvider, ProviderConfig};
use crate::constants::strava;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Strava activity summary wire format
#[derive(Debug, Deserialize)]
struct StravaActivityResponse {
    id: i64,
    name: String,
    sport_type: Option<String>,
    #[serde(rename = "type")]
    activity_type: Option<String>,
    start_date: DateTime<Utc>,
    start_date_local: Option<String>,
    distance: Option<f64>,
    total_elevation_gain: Option<f64>,
    moving_time: Option<f64>,
    #[serde(default)]
    trainer: bool,
    average_heartrate: Option<f64>,
    max_heartrate: Option<f64>,
}

/// Strava stream envelope (`key_by_type` form)
#[derive(Debug, Deserialize)]
struct StravaStreamSet {
    heartrate: Option<StravaStream>,
}

#[derive(Debug, Deserialize)]
struct StravaStream {
    data: Vec<f64>,
}

/// Token endpoint response for both code exchange and refresh
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// New bearer token
    pub access_token: String,
    /// New refresh token
    pub refresh_token: String,
    /// Unix seconds expiry of the access token
    pub expires_at: i64,
    /// Athlete summary, present on code exchange only
    pub athlete: Option<TokenAthlete>,
}

/// Athlete identity included in the code-exchange response
#[derive(Debug, Deserialize)]
pub struct TokenAthlete {
    /// Strava athlete id
    pub id: i64,
}

impl TokenResponse {
    /// Expiry as a UTC instant
    #[must_use]
    pub fn expires_at_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.expires_at, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Strava API client bound to one access token
#[derive(Debug)]
pub struct StravaClient {
    config: ProviderConfig,
    client: Client,
    access_token: String,
}

impl StravaClient {
    /// Create a client bound to a currently-valid access token
    #[must_use]
    pub fn new(access_token: String) -> Self {
        Self {
            config: default_config(),
            client: http_client(),
            access_token,
        }
    }

    /// Make an authenticated GET request and deserialize the JSON body
    async fn api_request<T>(&self, endpoint: &str, query: &[(&str, String)]) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!(
            "{}/{}",
            self.config.api_base_url,
            endpoint.trim_start_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::auth_failed(format!(
                "Strava rejected the access token ({status})"
            )));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!("Strava resource {endpoint}")));
        }
        if status.is_server_error() {
            return Err(AppError::external_unavailable(
                strava::PROVIDER_NAME,
                format!("status {status}"),
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::external_service(
                strava::PROVIDER_NAME,
                format!("status {status}: {text}"),
            ));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl FitnessProvider for StravaClient {
    fn name(&self) -> &'static str {
        strava::PROVIDER_NAME
    }

    async fn list_activities(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> AppResult<Vec<ActivitySummary>> {
        let query = [
            ("after", after.timestamp().to_string()),
            ("before", before.timestamp().to_string()),
            ("per_page", strava::ACTIVITY_PAGE_SIZE.to_string()),
        ];

        let raw: Vec<StravaActivityResponse> =
            self.api_request("athlete/activities", &query).await?;

        debug!("Strava returned {} activity summaries", raw.len());

        Ok(raw.into_iter().map(into_summary).collect())
    }

    async fn heart_rate_stream(&self, activity_id: i64) -> AppResult<Option<Vec<f64>>> {
        let query = [
            ("keys", "heartrate".to_owned()),
            ("key_by_type", "true".to_owned()),
        ];

        let result: AppResult<StravaStreamSet> = self
            .api_request(&format!("activities/{activity_id}/streams"), &query)
            .await;

        match result {
            Ok(streams) => Ok(streams.heartrate.map(|s| s.data)),
            // A 404 means the activity has no streams recorded; not a failure
            Err(e) if e.code == crate::errors::ErrorCode::ResourceNotFound => {
                debug!("No streams recorded for activity {activity_id}");
                Ok(None)
            }
            Err(e) => {
                warn!("Stream fetch failed for activity {activity_id}: {e}");
                Err(e)
            }
        }
    }
}

fn into_summary(raw: StravaActivityResponse) -> ActivitySummary {
    // Strava's start_date_local is RFC3339 with a Z suffix but represents
    // wall-clock local time; strip the offset rather than converting.
    let start_local = raw.start_date_local.as_deref().and_then(parse_local);

    ActivitySummary {
        id: raw.id,
        name: raw.name,
        sport_type: raw.sport_type,
        activity_type: raw.activity_type,
        start_date: raw.start_date,
        start_date_local: start_local,
        distance_meters: raw.distance.unwrap_or(0.0),
        elevation_gain_meters: raw.total_elevation_gain.unwrap_or(0.0),
        moving_time_seconds: raw.moving_time.unwrap_or(0.0),
        trainer: raw.trainer,
        average_heartrate: raw.average_heartrate,
        max_heartrate: raw.max_heartrate,
    }
}

fn parse_local(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").ok()
}

/// Exchange an authorization code for a token triple
///
/// # Errors
///
/// Returns a transient error for 5xx/network failures and an external
/// service error when the code is rejected
pub async fn exchange_code(
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> AppResult<TokenResponse> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("code", code),
        ("grant_type", "authorization_code"),
    ];

    token_request(&params).await
}

/// Exchange a refresh token for a new token triple
///
/// # Errors
///
/// Returns `ReauthorizationRequired` when the provider rejects the refresh
/// token (terminal for the athlete) and a transient error for 5xx/network
/// failures
pub async fn refresh_token(
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> AppResult<TokenResponse> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];

    token_request(&params).await
}

async fn token_request(params: &[(&str, &str)]) -> AppResult<TokenResponse> {
    let response = http_client()
        .post(strava::TOKEN_URL)
        .form(params)
        .send()
        .await?;

    let status = response.status();

    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        let text = response.text().await.unwrap_or_default();
        return Err(AppError::reauthorization_required(format!(
            "Strava rejected the grant ({status}): {text}"
        )));
    }
    if status.is_server_error() {
        return Err(AppError::external_unavailable(
            strava::PROVIDER_NAME,
            format!("token endpoint status {status}"),
        ));
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(AppError::external_service(
            strava::PROVIDER_NAME,
            format!("token endpoint status {status}: {text}"),
        ));
    }

    Ok(response.json().await?)
}

/// Build the Strava authorization URL for the given state parameter
#[must_use]
pub fn authorization_url(client_id: &str, redirect_uri: &str, state: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("approval_prompt", "auto")
        .append_pair("scope", strava::DEFAULT_SCOPES)
        .append_pair("state", state)
        .finish();

    format!("{}?{query}", strava::AUTH_URL)
}

fn default_config() -> ProviderConfig {
    ProviderConfig {
        name: strava::PROVIDER_NAME.to_owned(),
        auth_url: strava::AUTH_URL.to_owned(),
        token_url: strava::TOKEN_URL.to_owned(),
        api_base_url: strava::API_BASE_URL.to_owned(),
    }
}

fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(strava::API_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}
