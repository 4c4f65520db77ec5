// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides database, user, provider, and LLM fakes used across the suite
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::unwrap_used,
    clippy::expect_used
)]

//! Shared test utilities for `stride`
//!
//! This module provides common setup functions to reduce duplication across
//! integration tests: a file-backed test database, athlete fixtures, and
//! deterministic provider/LLM fakes.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use stride::database::Database;
use stride::errors::{AppError, AppResult};
use stride::llm::{ChatRequest, ChatResponse, LlmProvider};
use stride::models::{AcwrSettings, Gender, RiskTolerance, StravaToken, UserSettings};
use stride::providers::{ActivitySummary, FitnessProvider};
use tempfile::TempDir;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// A file-backed test database; the `TempDir` guard keeps the file alive
pub struct TestDatabase {
    /// Shared handle
    pub database: Arc<Database>,
    _dir: TempDir,
}

/// Create a fresh migrated database in a temp directory
pub async fn create_test_database() -> TestDatabase {
    init_test_logging();

    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("stride-test.db");
    let url = format!("sqlite:{}", path.display());

    let database = Database::new(&url).await.expect("create test database");

    TestDatabase {
        database: Arc::new(database),
        _dir: dir,
    }
}

/// Build an athlete fixture with sensible HR parameters and a live token
pub fn test_user() -> UserSettings {
    UserSettings {
        id: Uuid::new_v4(),
        email: format!("athlete-{}@example.com", Uuid::new_v4()),
        password_hash: "test-hash".to_owned(),
        resting_hr: 50,
        max_hr: 190,
        gender: Gender::Male,
        recommendation_style: RiskTolerance::Balanced,
        coaching_style_spectrum: Some(50),
        coaching_tone: None,
        timezone: "UTC".to_owned(),
        strava_token: Some(StravaToken {
            access_token: "test-access".to_owned(),
            refresh_token: "test-refresh".to_owned(),
            expires_at: Utc::now() + Duration::hours(6),
        }),
        strava_athlete_id: Some(42),
        acwr: AcwrSettings::default(),
        enhanced_trimp_enabled: false,
        created_at: Utc::now(),
    }
}

/// Persist an athlete fixture and return it
pub async fn create_test_user(database: &Database) -> UserSettings {
    let user = test_user();
    database.create_user(&user).await.expect("create test user");
    user
}

/// Build a running activity summary on `date` (noon UTC)
pub fn run_summary(id: i64, date: NaiveDate, distance_meters: f64, elevation_meters: f64) -> ActivitySummary {
    let start = Utc
        .from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time"));
    ActivitySummary {
        id,
        name: format!("Run {id}"),
        sport_type: Some("Run".to_owned()),
        activity_type: Some("Run".to_owned()),
        start_date: start,
        start_date_local: date.and_hms_opt(12, 0, 0),
        distance_meters,
        elevation_gain_meters: elevation_meters,
        moving_time_seconds: 3600.0,
        trainer: false,
        average_heartrate: Some(150.0),
        max_heartrate: Some(175.0),
    }
}

/// Deterministic in-memory provider for ingestion tests
#[derive(Default)]
pub struct FakeProvider {
    /// Summaries returned by `list_activities`
    pub activities: Vec<ActivitySummary>,
    /// Per-activity heart-rate streams
    pub streams: HashMap<i64, Vec<f64>>,
    /// When set, listing fails with an auth error
    pub fail_auth: bool,
}

#[async_trait]
impl FitnessProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_activities(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> AppResult<Vec<ActivitySummary>> {
        if self.fail_auth {
            return Err(AppError::auth_failed("fake provider rejected token"));
        }

        Ok(self
            .activities
            .iter()
            .filter(|a| a.start_date > after && a.start_date < before)
            .cloned()
            .collect())
    }

    async fn heart_rate_stream(&self, activity_id: i64) -> AppResult<Option<Vec<f64>>> {
        Ok(self.streams.get(&activity_id).cloned())
    }
}

/// Scripted LLM fake recording every prompt it receives
pub struct FakeLlm {
    /// Responses returned in order; the last repeats
    pub responses: Mutex<Vec<String>>,
    /// Prompts received
    pub prompts: Mutex<Vec<String>>,
    /// When set, every call fails transiently
    pub fail: bool,
}

impl FakeLlm {
    /// A fake that always returns `response`
    pub fn returning(response: &str) -> Arc<Self> {
        Self::scripted(vec![response.to_owned()])
    }

    /// A fake that returns `responses` in call order, repeating the last
    pub fn scripted(responses: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    /// A fake whose calls always fail
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    /// Number of calls received
    pub fn call_count(&self) -> usize {
        self.prompts.lock().expect("prompts lock").len()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &'static str {
        "fake-llm"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let prompt = request
            .messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let call_index = {
            let mut prompts = self.prompts.lock().expect("prompts lock");
            prompts.push(prompt);
            prompts.len() - 1
        };

        if self.fail {
            return Err(AppError::external_unavailable("fake-llm", "scripted failure"));
        }

        let responses = self.responses.lock().expect("responses lock");
        let content = responses
            .get(call_index)
            .or_else(|| responses.last())
            .cloned()
            .unwrap_or_default();

        Ok(ChatResponse {
            content,
            model: "fake-model".to_owned(),
        })
    }
}

/// A complete three-section recommendation response
pub const FULL_RECOMMENDATION_RESPONSE: &str = "\
**DAILY RECOMMENDATION:**
Easy 5 mile recovery run keeping heart rate in zone 2.

**WEEKLY PLANNING:**
Hold weekly volume steady and add one quality session.

**PATTERN INSIGHTS:**
Load and physiological response are well balanced.";

/// An autopsy response with a parseable alignment score
pub const AUTOPSY_RESPONSE: &str = "\
ALIGNMENT_SCORE: 3/10

ALIGNMENT ASSESSMENT:
The athlete ran hard intervals when an easy day was prescribed.

PHYSIOLOGICAL RESPONSE ANALYSIS:
High RPE with low energy suggests accumulated fatigue.

LEARNING INSIGHTS & TOMORROW'S IMPLICATIONS:
Simplify tomorrow's guidance and emphasize recovery.";
