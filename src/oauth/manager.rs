// ABOUTME: Token manager handling provider credential refresh and client construction
// ABOUTME: Serializes concurrent refreshes per athlete and persists tokens before use

//! # Token Manager
//!
//! Given an athlete id, returns a Strava client bound to a currently-valid
//! access token, refreshing credentials when they are near expiry. Multiple
//! concurrent requests for the same athlete share a single refresh attempt
//! through a per-athlete async mutex; the refreshed triple is persisted
//! before any client is handed out.

use super::{AuthorizationResponse, CallbackResponse, TokenState, TokenStatus};
use crate::constants::{strava as strava_constants, tokens};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::UserSettings;
use crate::providers::strava::{self, StravaClient};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// OAuth state data for CSRF protection
#[derive(Debug, Clone)]
struct StateData {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// Central token manager for the Strava provider
pub struct TokenManager {
    database: Arc<Database>,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    refresh_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    state_storage: DashMap<String, StateData>,
}

impl TokenManager {
    /// Create a new token manager
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            database,
            client_id,
            client_secret,
            redirect_uri,
            refresh_locks: DashMap::new(),
            state_storage: DashMap::new(),
        }
    }

    /// Generate an authorization URL with a CSRF state parameter
    ///
    /// # Errors
    ///
    /// Returns an error if the athlete does not exist
    pub async fn generate_auth_url(&self, user_id: Uuid) -> AppResult<AuthorizationResponse> {
        self.database
            .get_user(user_id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

        let state = format!("{user_id}:{}", Uuid::new_v4());
        let now = Utc::now();

        self.state_storage.insert(
            state.clone(),
            StateData {
                user_id,
                expires_at: now + ChronoDuration::minutes(10),
            },
        );
        // Drop expired states while we are here
        self.state_storage.retain(|_, data| data.expires_at > now);

        let authorization_url =
            strava::authorization_url(&self.client_id, &self.redirect_uri, &state);

        Ok(AuthorizationResponse {
            authorization_url,
            state,
            provider: strava_constants::PROVIDER_NAME.to_owned(),
            expires_in_minutes: 10,
        })
    }

    /// Handle the OAuth callback: validate state, exchange the code, and
    /// persist the token triple plus provider athlete id
    ///
    /// # Errors
    ///
    /// Returns an error on an unknown/expired state or a failed exchange
    pub async fn handle_callback(&self, code: &str, state: &str) -> AppResult<CallbackResponse> {
        let state_data = self
            .state_storage
            .remove(state)
            .map(|(_, data)| data)
            .ok_or_else(|| AppError::invalid_input("Invalid or expired state parameter"))?;

        if state_data.expires_at < Utc::now() {
            return Err(AppError::invalid_input("Invalid or expired state parameter"));
        }

        let token = strava::exchange_code(&self.client_id, &self.client_secret, code).await?;
        let athlete_id = token.athlete.as_ref().map(|a| a.id);

        self.database
            .update_strava_token(
                state_data.user_id,
                &token.access_token,
                &token.refresh_token,
                token.expires_at_utc(),
                athlete_id,
            )
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        info!(
            "OAuth callback completed for user {} (athlete {:?})",
            state_data.user_id, athlete_id
        );

        Ok(CallbackResponse {
            user_id: state_data.user_id.to_string(),
            provider: strava_constants::PROVIDER_NAME.to_owned(),
            expires_at: token.expires_at_utc().to_rfc3339(),
            success: true,
            message: "strava connected successfully".to_owned(),
        })
    }

    /// Structured token status for an athlete
    ///
    /// # Errors
    ///
    /// Returns an error if the athlete does not exist
    pub async fn token_status(&self, user_id: Uuid) -> AppResult<TokenStatus> {
        let user = self.require_user(user_id).await?;
        Ok(TokenStatus::report(user.strava_token.as_ref(), Utc::now()))
    }

    /// Return a Strava client bound to a currently-valid access token,
    /// refreshing first when the stored token is near expiry.
    ///
    /// # Errors
    ///
    /// - `AuthFailed` when no credentials are stored
    /// - `ReauthorizationRequired` when the provider rejected the refresh
    ///   token (terminal for this athlete until they reconnect)
    /// - `ExternalServiceUnavailable` after bounded retries on transient
    ///   provider failures
    pub async fn authorized_client(&self, user_id: Uuid) -> AppResult<StravaClient> {
        let user = self.require_user(user_id).await?;

        match TokenState::classify(user.strava_token.as_ref(), Utc::now()) {
            TokenState::Valid => {
                let token = user
                    .strava_token
                    .ok_or_else(|| AppError::auth_failed("No provider credentials stored"))?;
                Ok(StravaClient::new(token.access_token))
            }
            TokenState::ExpiringSoon | TokenState::Expired => {
                self.refresh_single_flight(user_id).await
            }
            TokenState::Missing => Err(AppError::auth_failed(format!(
                "No Strava refresh token stored for user {user_id}"
            ))),
        }
    }

    /// Serialize refresh attempts per athlete: the first caller refreshes,
    /// every concurrent caller awaits the same lock and then re-reads the
    /// database, picking up the persisted result.
    async fn refresh_single_flight(&self, user_id: Uuid) -> AppResult<StravaClient> {
        let lock = self
            .refresh_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = lock.lock().await;

        // Another caller may have completed the refresh while we waited
        let user = self.require_user(user_id).await?;
        match TokenState::classify(user.strava_token.as_ref(), Utc::now()) {
            TokenState::Valid => {
                let token = user
                    .strava_token
                    .ok_or_else(|| AppError::auth_failed("No provider credentials stored"))?;
                return Ok(StravaClient::new(token.access_token));
            }
            TokenState::Missing => {
                return Err(AppError::auth_failed(format!(
                    "No Strava refresh token stored for user {user_id}"
                )));
            }
            TokenState::ExpiringSoon | TokenState::Expired => {}
        }

        let refresh_token = user
            .strava_token
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .ok_or_else(|| AppError::auth_failed("No provider credentials stored"))?;

        let token = self.refresh_with_backoff(user_id, &refresh_token).await?;

        self.database
            .update_strava_token(
                user_id,
                &token.access_token,
                &token.refresh_token,
                token.expires_at_utc(),
                None,
            )
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        info!("Refreshed Strava token for user {user_id}");

        Ok(StravaClient::new(token.access_token))
    }

    /// Refresh with bounded exponential backoff. An invalid-grant response
    /// is terminal and returned immediately; transient failures retry up to
    /// the attempt cap with 2^n-second waits.
    async fn refresh_with_backoff(
        &self,
        user_id: Uuid,
        refresh_token: &str,
    ) -> AppResult<strava::TokenResponse> {
        let mut last_error = AppError::auth_failed("token refresh not attempted");

        for attempt in 1..=tokens::MAX_REFRESH_ATTEMPTS {
            match strava::refresh_token(&self.client_id, &self.client_secret, refresh_token).await
            {
                Ok(token) => return Ok(token),
                Err(e) if e.is_transient() && attempt < tokens::MAX_REFRESH_ATTEMPTS => {
                    let wait = Duration::from_secs(2_u64.pow(attempt));
                    warn!(
                        "Transient token refresh failure for user {user_id} \
                         (attempt {attempt}): {e}; retrying in {wait:?}"
                    );
                    tokio::time::sleep(wait).await;
                    last_error = e;
                }
                Err(e) => {
                    if e.code == crate::errors::ErrorCode::ReauthorizationRequired {
                        warn!(
                            "Strava rejected refresh token for user {user_id}; \
                             re-authorization required"
                        );
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error)
    }

    async fn require_user(&self, user_id: Uuid) -> AppResult<UserSettings> {
        self.database
            .get_user(user_id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))
    }
}
