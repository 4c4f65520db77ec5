// ABOUTME: Fitness provider abstraction for activity listing and stream fetching
// ABOUTME: Defines the provider-neutral activity summary consumed by the ingestion pipeline

//! # Fitness Provider Layer
//!
//! The ingestion pipeline talks to activity-tracking providers through the
//! [`FitnessProvider`] trait so the pipeline can be exercised against fakes
//! in tests. Strava is the production implementation.

pub mod strava;

use crate::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-neutral activity summary returned by activity listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Provider activity id
    pub id: i64,
    /// Activity name
    pub name: String,
    /// Specific sport label (e.g. `TrailRun`, `VirtualRide`)
    pub sport_type: Option<String>,
    /// Basic type label (e.g. `Run`, `Ride`), the fallback classification input
    pub activity_type: Option<String>,
    /// Start instant in UTC
    pub start_date: DateTime<Utc>,
    /// Start wall-clock time in the activity's local zone
    pub start_date_local: Option<NaiveDateTime>,
    /// Distance in meters
    pub distance_meters: f64,
    /// Total elevation gain in meters
    pub elevation_gain_meters: f64,
    /// Moving time in seconds
    pub moving_time_seconds: f64,
    /// Whether the activity was recorded on a trainer
    pub trainer: bool,
    /// Average heart rate in bpm
    pub average_heartrate: Option<f64>,
    /// Max heart rate in bpm
    pub max_heartrate: Option<f64>,
}

impl ActivitySummary {
    /// Local calendar date of the activity, preferring the provider's local
    /// field over the UTC instant
    #[must_use]
    pub fn local_date(&self) -> chrono::NaiveDate {
        self.start_date_local
            .map_or_else(|| self.start_date.date_naive(), |local| local.date())
    }
}

/// Provider configuration (endpoints and credentials identity)
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider name for logs
    pub name: String,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token exchange endpoint
    pub token_url: String,
    /// REST API base URL
    pub api_base_url: String,
}

/// Trait for fitness data providers
#[async_trait]
pub trait FitnessProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &'static str;

    /// List activity summaries whose start instant falls in `(after, before)`
    ///
    /// # Errors
    ///
    /// Returns an auth error when the token is rejected and a transient
    /// error for 5xx/network failures
    async fn list_activities(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> AppResult<Vec<ActivitySummary>>;

    /// Fetch the heart-rate stream for an activity, when one exists
    ///
    /// # Errors
    ///
    /// Returns an auth error when the token is rejected and a transient
    /// error for 5xx/network failures
    async fn heart_rate_stream(&self, activity_id: i64) -> AppResult<Option<Vec<f64>>>;
}
