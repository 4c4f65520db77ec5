// ABOUTME: Core data models for athletes, activities, recommendations, and autopsies
// ABOUTME: Typed record structs with explicit field mappings for every persisted table

//! Common data models for the training-load engine.
//!
//! Every persisted table has a typed record struct here; the pipeline never
//! passes untyped maps. Sport classification is a tagged variant so load
//! computation pattern-matches instead of branching on raw strings.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::windows;

/// Sport classification for an activity.
///
/// `Other` carries the unrecognized label so diagnostics keep the original
/// provider value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SportType {
    /// Road, trail, track, and treadmill running
    Running,
    /// Outdoor and indoor cycling
    Cycling,
    /// Pool and open-water swimming
    Swimming,
    /// Weight training, crossfit, yoga, and other gym work
    Strength,
    /// Walking
    Walking,
    /// Hiking
    Hiking,
    /// Synthetic rest-day placeholder
    Rest,
    /// Unrecognized activity label
    Other(String),
}

impl SportType {
    /// Database representation of the sport classification
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
            Self::Swimming => "swimming",
            Self::Strength => "strength",
            Self::Walking => "walking",
            Self::Hiking => "hiking",
            Self::Rest => "rest",
            Self::Other(label) => label,
        }
    }

    /// Parse the database representation back into a variant
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "running" => Self::Running,
            "cycling" => Self::Cycling,
            "swimming" => Self::Swimming,
            "strength" => Self::Strength,
            "walking" => Self::Walking,
            "hiking" => Self::Hiking,
            "rest" => Self::Rest,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Athlete gender, used only to select the TRIMP exponent coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    /// k = 1.92
    Male,
    /// k = 1.67
    Female,
}

impl Gender {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    /// Parse from the database; unknown values default to male, matching
    /// the TRIMP literature's published male coefficient
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "female" => Self::Female,
            _ => Self::Male,
        }
    }
}

/// Risk-tolerance category driving personalized recommendation thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTolerance {
    /// Lower risk tolerance, earlier warnings, more recovery emphasis
    Conservative,
    /// Evidence-based thresholds, balanced risk approach
    Balanced,
    /// Adjusts based on individual response patterns and recovery
    Adaptive,
    /// Higher risk tolerance, aggressive progression, performance-focused
    Aggressive,
}

impl RiskTolerance {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Adaptive => "adaptive",
            Self::Aggressive => "aggressive",
        }
    }

    /// Parse from the database; unknown values default to balanced
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "conservative" => Self::Conservative,
            "adaptive" => Self::Adaptive,
            "aggressive" => Self::Aggressive,
            _ => Self::Balanced,
        }
    }
}

/// How an activity's TRIMP value was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrimpMethod {
    /// Single Banister evaluation at the average heart rate
    Average,
    /// Per-sample Banister evaluation over the heart-rate stream
    Stream,
    /// Rest day, TRIMP fixed at zero
    RestDay,
}

impl TrimpMethod {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Stream => "stream",
            Self::RestDay => "rest_day",
        }
    }

    /// Parse from the database; unknown values default to average
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "stream" => Self::Stream,
            "rest_day" => Self::RestDay,
            _ => Self::Average,
        }
    }
}

/// Stored provider OAuth credentials for one athlete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaToken {
    /// Bearer token for API requests
    pub access_token: String,
    /// Long-lived token used to obtain new access tokens
    pub refresh_token: String,
    /// Absolute expiry instant of the access token
    pub expires_at: DateTime<Utc>,
}

/// Per-athlete enhanced-ACWR configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AcwrSettings {
    /// Chronic window length in days, clamped to [28, 90]
    pub chronic_period_days: i64,
    /// Exponential decay rate, (0, 1]
    pub decay_rate: f64,
    /// Whether the exponentially-decayed engine is active for this athlete
    pub enhanced_enabled: bool,
}

impl Default for AcwrSettings {
    fn default() -> Self {
        Self {
            chronic_period_days: windows::CHRONIC_DAYS,
            decay_rate: windows::DEFAULT_DECAY_RATE,
            enhanced_enabled: false,
        }
    }
}

impl AcwrSettings {
    /// Clamp configuration values into their documented ranges
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            chronic_period_days: self
                .chronic_period_days
                .clamp(windows::CHRONIC_DAYS_MIN, windows::CHRONIC_DAYS_MAX),
            decay_rate: if self.decay_rate > 0.0 && self.decay_rate <= 1.0 {
                self.decay_rate
            } else {
                windows::DEFAULT_DECAY_RATE
            },
            enhanced_enabled: self.enhanced_enabled,
        }
    }
}

/// Athlete settings row (`user_settings` table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    /// Athlete id; every persisted entity is scoped by this
    pub id: Uuid,
    /// Account email
    pub email: String,
    /// Password hash (registration flows live outside this crate)
    pub password_hash: String,
    /// Resting heart rate in bpm
    pub resting_hr: i64,
    /// Maximum heart rate in bpm
    pub max_hr: i64,
    /// Gender for TRIMP coefficient selection
    pub gender: Gender,
    /// Risk tolerance driving recommendation thresholds
    pub recommendation_style: RiskTolerance,
    /// Coaching tone position on the 0-100 spectrum
    pub coaching_style_spectrum: Option<i64>,
    /// Legacy tone label, mapped onto the spectrum when the slider is unset
    pub coaching_tone: Option<String>,
    /// IANA time zone name; authoritative for all "today" decisions
    pub timezone: String,
    /// Provider credentials, absent until the OAuth callback completes
    pub strava_token: Option<StravaToken>,
    /// Provider athlete id captured on first token exchange
    pub strava_athlete_id: Option<i64>,
    /// Enhanced-ACWR engine configuration
    pub acwr: AcwrSettings,
    /// Whether stream-based TRIMP is enabled for this athlete
    pub enhanced_trimp_enabled: bool,
    /// Row creation instant
    pub created_at: DateTime<Utc>,
}

impl UserSettings {
    /// Resolve the athlete's IANA zone, falling back to UTC on a bad name
    #[must_use]
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    /// Calendar date of `instant` in the athlete's zone
    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz()).date_naive()
    }

    /// Today's calendar date in the athlete's zone
    #[must_use]
    pub fn local_today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    /// Coaching spectrum position, applying the legacy tone fallback
    #[must_use]
    pub fn coaching_spectrum(&self) -> i64 {
        self.coaching_style_spectrum.unwrap_or_else(|| {
            match self.coaching_tone.as_deref() {
                Some("casual") => 12,
                Some("motivational") => 62,
                Some("analytical") => 87,
                Some("supportive") => 37,
                _ => 50,
            }
        })
    }
}

/// Activity row (`activities` table); negative `activity_id` denotes a
/// synthetic rest day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Owning athlete
    pub user_id: Uuid,
    /// Provider activity id, or a derived negative id for rest days
    pub activity_id: i64,
    /// Local calendar date the activity is attributed to
    pub date: NaiveDate,
    /// Activity name as reported by the provider
    pub name: String,
    /// Sport classification
    pub sport_type: SportType,
    /// Distance in miles
    pub distance_miles: f64,
    /// Elevation gain in feet
    pub elevation_gain_feet: f64,
    /// Elevation component of the external load
    pub elevation_load_miles: f64,
    /// Total external load in running-equivalent miles
    pub total_load_miles: f64,
    /// Average heart rate in bpm (0 when absent)
    pub avg_heart_rate: f64,
    /// Max heart rate in bpm (0 when absent)
    pub max_heart_rate: f64,
    /// Moving duration in minutes
    pub duration_minutes: f64,
    /// Banister TRIMP internal load
    pub trimp: f64,
    /// Seconds in HR zone 1 (50-60% reserve)
    pub time_in_zone1: i64,
    /// Seconds in HR zone 2 (60-70% reserve)
    pub time_in_zone2: i64,
    /// Seconds in HR zone 3 (70-80% reserve)
    pub time_in_zone3: i64,
    /// Seconds in HR zone 4 (80-90% reserve)
    pub time_in_zone4: i64,
    /// Seconds in HR zone 5 (90-100% reserve)
    pub time_in_zone5: i64,
    /// Method used to compute TRIMP
    pub trimp_calculation_method: TrimpMethod,
    /// Sample count when stream-based TRIMP was used
    pub hr_stream_sample_count: i64,
    /// Instant the TRIMP computation ran
    pub trimp_processed_at: Option<DateTime<Utc>>,
    /// Rolling aggregates, written by the ACWR engine for this date
    pub aggregates: Option<DailyAggregates>,
    /// Running-equivalent miles before elevation, cycling only
    pub cycling_equivalent_miles: Option<f64>,
    /// Running-equivalent miles, swimming only
    pub swimming_equivalent_miles: Option<f64>,
    /// Running-equivalent miles, strength only
    pub strength_equivalent_miles: Option<f64>,
    /// Elevation divisor applied, cycling only
    pub cycling_elevation_factor: Option<f64>,
    /// Average speed in mph when derivable
    pub average_speed_mph: Option<f64>,
    /// Free-text notes
    pub notes: Option<String>,
}

impl ActivityRecord {
    /// Whether this row is a synthetic rest day
    #[must_use]
    pub const fn is_rest_day(&self) -> bool {
        self.activity_id < 0
    }

    /// Build the synthetic rest-day row for (athlete, date)
    #[must_use]
    pub fn rest_day(user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            user_id,
            activity_id: rest_day_activity_id(user_id, date),
            date,
            name: "Rest Day".to_owned(),
            sport_type: SportType::Rest,
            distance_miles: 0.0,
            elevation_gain_feet: 0.0,
            elevation_load_miles: 0.0,
            total_load_miles: 0.0,
            avg_heart_rate: 0.0,
            max_heart_rate: 0.0,
            duration_minutes: 0.0,
            trimp: 0.0,
            time_in_zone1: 0,
            time_in_zone2: 0,
            time_in_zone3: 0,
            time_in_zone4: 0,
            time_in_zone5: 0,
            trimp_calculation_method: TrimpMethod::RestDay,
            hr_stream_sample_count: 0,
            trimp_processed_at: None,
            aggregates: None,
            cycling_equivalent_miles: None,
            swimming_equivalent_miles: None,
            strength_equivalent_miles: None,
            cycling_elevation_factor: None,
            average_speed_mph: None,
            notes: Some("Automatically generated rest day record.".to_owned()),
        }
    }
}

/// Derive the deterministic negative activity id for a synthetic rest day.
///
/// The id combines the proleptic-Gregorian day ordinal with the first four
/// bytes of the athlete uuid, so two athletes resting on the same date get
/// distinct ids and re-running coverage is idempotent.
#[must_use]
pub fn rest_day_activity_id(user_id: Uuid, date: NaiveDate) -> i64 {
    let ordinal = i64::from(date.num_days_from_ce());
    let bytes = user_id.as_bytes();
    let seed = i64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
    -((ordinal << 32) | seed)
}

/// Rolling-window aggregates denormalized onto every activity row of a date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregates {
    /// 7-day average external load (miles/day)
    pub seven_day_avg_load: f64,
    /// Chronic-window average external load (miles/day)
    pub twentyeight_day_avg_load: f64,
    /// 7-day average TRIMP
    pub seven_day_avg_trimp: f64,
    /// Chronic-window average TRIMP
    pub twentyeight_day_avg_trimp: f64,
    /// External acute:chronic ratio
    pub acute_chronic_ratio: f64,
    /// Internal (TRIMP) acute:chronic ratio
    pub trimp_acute_chronic_ratio: f64,
    /// Signed gap between external and internal ratios, normalized by their mean
    pub normalized_divergence: f64,
}

/// Heart-rate stream row (`hr_streams` table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrStream {
    /// Parent activity
    pub activity_id: i64,
    /// Owning athlete
    pub user_id: Uuid,
    /// Ordered heart-rate samples in bpm
    pub samples: Vec<f64>,
    /// Samples per second
    pub sample_rate: f64,
}

/// Recommendation row (`llm_recommendations` table), unique per
/// (athlete, `target_date`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Owning athlete
    pub user_id: Uuid,
    /// Calendar date the recommendation was generated on (athlete local)
    pub generation_date: NaiveDate,
    /// Instant the recommendation was generated
    pub generated_at: DateTime<Utc>,
    /// Calendar date the recommendation is FOR
    pub target_date: NaiveDate,
    /// Daily guidance section
    pub daily_recommendation: String,
    /// Weekly planning section
    pub weekly_recommendation: String,
    /// Pattern insights section
    pub pattern_insights: String,
    /// Unmodified LLM response
    pub raw_response: String,
    /// Whether autopsy learning informed this generation
    pub is_autopsy_informed: bool,
    /// Number of autopsies that fed the generation
    pub autopsy_count: i64,
    /// Average alignment score over those autopsies
    pub avg_alignment_score: Option<f64>,
    /// Metrics at generation time, serialized as JSON
    pub metrics_snapshot: serde_json::Value,
}

/// Autopsy row (`ai_autopsies` table), unique per (athlete, date)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Autopsy {
    /// Owning athlete
    pub user_id: Uuid,
    /// Date the autopsy grades
    pub date: NaiveDate,
    /// Daily guidance that was active for that date
    pub prescribed_action: String,
    /// Summary of what the athlete actually did
    pub actual_activities: String,
    /// LLM analysis text
    pub autopsy_analysis: String,
    /// Alignment between prescribed and actual, clamped to [1, 10]
    pub alignment_score: i64,
    /// Instant the autopsy was generated
    pub generated_at: DateTime<Utc>,
}

/// Journal observation row (`journal_entries` table), unique per (athlete, date)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Owning athlete
    pub user_id: Uuid,
    /// Observed date
    pub date: NaiveDate,
    /// Pre-session energy, 1-5
    pub energy_level: Option<i64>,
    /// Rate of perceived exertion, 1-10
    pub rpe_score: Option<i64>,
    /// Fraction of the session spent thinking about pain, {0,20,40,60,80,100}
    pub pain_percentage: Option<i64>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Last update instant
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Validate observation ranges; out-of-range values are rejected before
    /// any persistence happens
    ///
    /// # Errors
    ///
    /// Returns an error message naming the offending field
    pub fn validate(&self) -> Result<(), String> {
        if let Some(energy) = self.energy_level {
            if !(1..=5).contains(&energy) {
                return Err(format!("energy_level must be between 1 and 5, got {energy}"));
            }
        }
        if let Some(rpe) = self.rpe_score {
            if !(1..=10).contains(&rpe) {
                return Err(format!("rpe_score must be between 1 and 10, got {rpe}"));
            }
        }
        if let Some(pain) = self.pain_percentage {
            if ![0, 20, 40, 60, 80, 100].contains(&pain) {
                return Err(format!(
                    "pain_percentage must be one of 0/20/40/60/80/100, got {pain}"
                ));
            }
        }
        Ok(())
    }
}

/// Current-metrics snapshot read from the latest aggregated activity row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// External acute:chronic ratio
    pub external_acwr: f64,
    /// Internal (TRIMP) acute:chronic ratio
    pub internal_acwr: f64,
    /// Normalized divergence between the two ratios
    pub normalized_divergence: f64,
    /// 7-day average external load
    pub seven_day_avg_load: f64,
    /// 7-day average TRIMP
    pub seven_day_avg_trimp: f64,
    /// Chronic-window average external load
    pub twentyeight_day_avg_load: f64,
    /// Chronic-window average TRIMP
    pub twentyeight_day_avg_trimp: f64,
    /// Consecutive days since the last rest day
    pub days_since_rest: i64,
    /// Date of the most recent activity row
    pub latest_activity_date: Option<NaiveDate>,
}

/// Round a load or TRIMP value to the 2-decimal persistence precision
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round a ratio or divergence to 3 decimals for prompt display
#[must_use]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Local-timezone helpers shared by ingestion and recommendation pipelines
pub mod timezones {
    use super::{DateTime, NaiveDate, TimeZone, Tz, Utc};

    /// UTC window covering `[start, end]` local dates in `tz`, expanded by
    /// one calendar day on each side to absorb offset edge cases
    #[must_use]
    pub fn expanded_utc_window(
        tz: Tz,
        start: NaiveDate,
        end: NaiveDate,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let padded_start = start.pred_opt().unwrap_or(start);
        let padded_end = end.succ_opt().unwrap_or(end);

        let start_naive = padded_start.and_hms_opt(0, 0, 0).unwrap_or_default();
        let end_naive = padded_end.and_hms_opt(23, 59, 59).unwrap_or_default();

        // A DST gap can make a local midnight nonexistent; fall back to the
        // UTC reading of the same wall-clock time.
        let after = tz
            .from_local_datetime(&start_naive)
            .earliest()
            .map_or_else(
                || Utc.from_utc_datetime(&start_naive),
                |dt| dt.with_timezone(&Utc),
            );
        let before = tz.from_local_datetime(&end_naive).latest().map_or_else(
            || Utc.from_utc_datetime(&end_naive),
            |dt| dt.with_timezone(&Utc),
        );

        (after, before)
    }
}
