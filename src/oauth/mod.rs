// ABOUTME: OAuth module for provider credential lifecycle management
// ABOUTME: Defines token states, status reporting, and authorization flow types

//! # OAuth Management Module
//!
//! Provider token lifecycle for the ingestion pipeline: state
//! classification, auto-refresh, and the authorization-code flow. The
//! database is authoritative for tokens; anything held in memory is a cache.

pub mod manager;

use crate::constants::tokens;
use crate::models::StravaToken;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a stored provider token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    /// Expiry is more than the refresh horizon away
    Valid,
    /// Expiry is within the refresh horizon
    ExpiringSoon,
    /// Expiry has passed
    Expired,
    /// No refresh token is stored
    Missing,
}

impl TokenState {
    /// Classify a stored token relative to `now`
    #[must_use]
    pub fn classify(token: Option<&StravaToken>, now: DateTime<Utc>) -> Self {
        let Some(token) = token else {
            return Self::Missing;
        };
        if token.refresh_token.is_empty() {
            return Self::Missing;
        }

        let horizon = Duration::minutes(tokens::REFRESH_HORIZON_MINUTES);
        if token.expires_at <= now {
            Self::Expired
        } else if token.expires_at <= now + horizon {
            Self::ExpiringSoon
        } else {
            Self::Valid
        }
    }
}

/// Structured token status surfaced to callers and embedded in sync results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStatus {
    /// Current lifecycle state
    pub state: TokenState,
    /// Absolute expiry instant when a token is stored
    pub expires_at: Option<DateTime<Utc>>,
    /// Hours until expiry (negative when already expired)
    pub expires_in_hours: Option<f64>,
    /// Human-readable next step
    pub recommendation: String,
}

impl TokenStatus {
    /// Build a status report for a stored token
    #[must_use]
    pub fn report(token: Option<&StravaToken>, now: DateTime<Utc>) -> Self {
        let state = TokenState::classify(token, now);
        let expires_at = token.map(|t| t.expires_at);
        let expires_in_hours =
            expires_at.map(|at| (at - now).num_seconds() as f64 / 3600.0);

        let recommendation = match state {
            TokenState::Valid => {
                let hours = expires_in_hours.unwrap_or(0.0) - 0.5;
                if hours > 0.0 {
                    format!("Next automatic refresh in ~{hours:.1} hours")
                } else {
                    "Automatic refresh should occur shortly".to_owned()
                }
            }
            TokenState::ExpiringSoon => {
                "Automatic refresh should occur within 30 minutes".to_owned()
            }
            TokenState::Expired => "Automatic refresh will run on next sync".to_owned(),
            TokenState::Missing => "URGENT: Manual re-authorization required".to_owned(),
        };

        Self {
            state,
            expires_at,
            expires_in_hours,
            recommendation,
        }
    }
}

/// OAuth authorization response handed to the athlete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    /// URL the athlete must visit to authorize
    pub authorization_url: String,
    /// CSRF state parameter embedded in the URL
    pub state: String,
    /// Provider being connected
    pub provider: String,
    /// Minutes until the state parameter expires
    pub expires_in_minutes: u32,
}

/// OAuth callback response after a successful code exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackResponse {
    /// Athlete whose credentials were stored
    pub user_id: String,
    /// Provider that was connected
    pub provider: String,
    /// Expiry of the stored access token
    pub expires_at: String,
    /// Whether the flow completed
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in_minutes: i64) -> StravaToken {
        StravaToken {
            access_token: "access".to_owned(),
            refresh_token: "refresh".to_owned(),
            expires_at: Utc::now() + Duration::minutes(expires_in_minutes),
        }
    }

    #[test]
    fn classify_covers_all_states() {
        let now = Utc::now();
        assert_eq!(TokenState::classify(None, now), TokenState::Missing);
        assert_eq!(
            TokenState::classify(Some(&token(120)), now),
            TokenState::Valid
        );
        assert_eq!(
            TokenState::classify(Some(&token(10)), now),
            TokenState::ExpiringSoon
        );
        assert_eq!(
            TokenState::classify(Some(&token(-10)), now),
            TokenState::Expired
        );
    }

    #[test]
    fn missing_refresh_token_is_missing_state() {
        let now = Utc::now();
        let mut t = token(120);
        t.refresh_token.clear();
        assert_eq!(TokenState::classify(Some(&t), now), TokenState::Missing);
    }

    #[test]
    fn status_report_flags_missing_tokens_as_urgent() {
        let status = TokenStatus::report(None, Utc::now());
        assert_eq!(status.state, TokenState::Missing);
        assert!(status.recommendation.contains("re-authorization"));
    }
}
