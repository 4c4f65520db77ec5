// ABOUTME: Application constants for load modeling, token lifecycle, and external services
// ABOUTME: Centralizes physiological coefficients and service configuration values

//! Shared constants used across the training-load engine.

/// Unit conversion factors for provider data (Strava reports metric units).
pub mod units {
    /// Meters to miles
    pub const METERS_TO_MILES: f64 = 0.000_621_371;
    /// Meters to feet
    pub const METERS_TO_FEET: f64 = 3.280_84;
}

/// External-load model coefficients (running-equivalent miles).
pub mod load_model {
    /// Running: feet of elevation gain per equivalent mile
    pub const RUNNING_ELEVATION_DIVISOR: f64 = 750.0;

    /// Cycling: feet of elevation gain per equivalent mile
    pub const CYCLING_ELEVATION_DIVISOR: f64 = 1100.0;

    /// Cycling distance conversion by average speed band (mph ceiling, divisor)
    pub const CYCLING_LEISURE_MAX_MPH: f64 = 12.0;
    /// Divisor applied at or below the leisure ceiling
    pub const CYCLING_LEISURE_FACTOR: f64 = 3.0;
    /// Moderate band ceiling
    pub const CYCLING_MODERATE_MAX_MPH: f64 = 16.0;
    /// Divisor for the moderate band
    pub const CYCLING_MODERATE_FACTOR: f64 = 3.1;
    /// Vigorous band ceiling
    pub const CYCLING_VIGOROUS_MAX_MPH: f64 = 20.0;
    /// Divisor for the vigorous band
    pub const CYCLING_VIGOROUS_FACTOR: f64 = 2.9;
    /// Divisor above the vigorous ceiling (racing pace)
    pub const CYCLING_RACING_FACTOR: f64 = 2.5;

    /// Swimming: pool conversion ratio (1 swim mile ~ 4 run miles)
    pub const SWIM_POOL_FACTOR: f64 = 4.0;
    /// Swimming: open-water conversion ratio
    pub const SWIM_OPEN_WATER_FACTOR: f64 = 4.2;

    /// Strength: (hours) x RPE x this factor = equivalent miles
    pub const STRENGTH_CONVERSION_FACTOR: f64 = 0.30;
    /// RPE assumed when the athlete has not recorded one
    pub const STRENGTH_DEFAULT_RPE: f64 = 6.0;
}

/// Banister TRIMP coefficients.
pub mod trimp {
    /// Base multiplier in the Banister exponential formulation
    pub const BASE_COEFFICIENT: f64 = 0.64;
    /// Exponent coefficient for male athletes
    pub const K_MALE: f64 = 1.92;
    /// Exponent coefficient for female athletes
    pub const K_FEMALE: f64 = 1.67;
    /// Streams with more than this fraction of invalid samples fall back
    /// to the average-HR form
    pub const MIN_VALID_SAMPLE_FRACTION: f64 = 0.5;
}

/// Rolling-window lengths for the standard ACWR engine.
pub mod windows {
    /// Acute window length in days
    pub const ACUTE_DAYS: i64 = 7;
    /// Chronic window length in days
    pub const CHRONIC_DAYS: i64 = 28;
    /// Smallest configurable chronic window (enhanced engine)
    pub const CHRONIC_DAYS_MIN: i64 = 28;
    /// Largest configurable chronic window (enhanced engine)
    pub const CHRONIC_DAYS_MAX: i64 = 90;
    /// Default exponential decay rate (enhanced engine)
    pub const DEFAULT_DECAY_RATE: f64 = 0.05;
}

/// Provider token lifecycle parameters.
pub mod tokens {
    /// Tokens expiring within this horizon are refreshed proactively
    pub const REFRESH_HORIZON_MINUTES: i64 = 30;
    /// Maximum refresh attempts for transient provider failures
    pub const MAX_REFRESH_ATTEMPTS: u32 = 3;
}

/// Strava OAuth and API endpoints.
pub mod strava {
    /// Provider name used in logs and status payloads
    pub const PROVIDER_NAME: &str = "strava";
    /// Authorization endpoint
    pub const AUTH_URL: &str = "https://www.strava.com/oauth/authorize";
    /// Token exchange and refresh endpoint
    pub const TOKEN_URL: &str = "https://www.strava.com/oauth/token";
    /// REST API base
    pub const API_BASE_URL: &str = "https://www.strava.com/api/v3";
    /// Scopes requested during authorization
    pub const DEFAULT_SCOPES: &str = "read,activity:read_all";
    /// Seconds to pause between per-activity stream fetches (rate-limit courtesy)
    pub const STREAM_FETCH_PAUSE_SECS: u64 = 1;
    /// HTTP timeout for provider API calls
    pub const API_TIMEOUT_SECS: u64 = 30;
    /// Page size when listing activities
    pub const ACTIVITY_PAGE_SIZE: u32 = 200;
}

/// LLM request parameters.
pub mod llm {
    /// Sampling temperature for recommendation generation
    pub const RECOMMENDATION_TEMPERATURE: f32 = 0.7;
    /// Token budget for recommendation generation
    pub const RECOMMENDATION_MAX_TOKENS: u32 = 2000;
    /// HTTP timeout for recommendation calls
    pub const RECOMMENDATION_TIMEOUT_SECS: u64 = 30;
    /// Sampling temperature for autopsy analysis
    pub const AUTOPSY_TEMPERATURE: f32 = 0.25;
    /// Token budget for autopsy analysis
    pub const AUTOPSY_MAX_TOKENS: u32 = 3000;
    /// HTTP timeout for autopsy calls
    pub const AUTOPSY_TIMEOUT_SECS: u64 = 75;
}

/// Recommendation pipeline parameters.
pub mod recommendations {
    /// Days of activity history loaded into the prompt
    pub const ACTIVITY_ANALYSIS_DAYS: i64 = 28;
    /// Days of aggregates recomputed before generating
    pub const METRICS_REFRESH_DAYS: i64 = 3;
    /// Lookback for autopsy insights feeding the next recommendation
    pub const AUTOPSY_INSIGHT_DAYS: i64 = 3;
    /// Recommendation rows older than this are pruned after generation
    pub const RETENTION_DAYS: i64 = 14;
    /// Characters of the training reference guide included in prompts
    pub const TRAINING_GUIDE_EXCERPT_CHARS: usize = 1500;
}

/// Service identity for logging.
pub mod service {
    /// Service name reported in structured logs
    pub const NAME: &str = "stride-server";
}
