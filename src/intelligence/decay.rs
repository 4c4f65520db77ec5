// ABOUTME: Exponentially-decayed ACWR engine weighting historical days by recency
// ABOUTME: Pure computation over activity data with structured edge cases and perf tiers

//! # Enhanced (Exponentially-Decayed) ACWR Engine
//!
//! Alternative to the standard rolling averages that weights each chronic-
//! window day by `e^(-lambda . days_ago)`. The acute side stays a simple
//! 7-day mean: acute stress is recent and treated uniformly, chronic stress
//! is old and decays. The chronic window length is configurable per athlete
//! in [28, 90] days.

use crate::constants::windows;
use crate::models::round3;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Activity counts above which a weight lookup table replaces repeated
/// exponentiation
const LOOKUP_TIER_THRESHOLD: usize = 1000;

/// Activity counts above which the chronic side is summed in batches
const BATCH_TIER_THRESHOLD: usize = 10_000;

/// Batch size for the batched tier
const BATCH_SIZE: usize = 2_500;

/// Minimal activity view consumed by the decay engine
#[derive(Debug, Clone, Copy)]
pub struct ActivityData {
    /// Local calendar date
    pub date: NaiveDate,
    /// External load in equivalent miles
    pub total_load_miles: f64,
    /// Internal load
    pub trimp: f64,
}

/// Named edge cases that preclude a meaningful enhanced calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCase {
    /// Neither window contains activities
    NoData,
    /// The acute window contains no activities
    NoAcuteData,
    /// The chronic window contains no activities
    NoChronicData,
    /// Fewer than 7 distinct days of chronic data
    InsufficientChronicData,
    /// More than half the chronic window has no activity
    SignificantDataGaps,
    /// An activity postdates the reference date
    FutureDates,
}

impl EdgeCase {
    /// Stable name used in logs and structured results
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::NoAcuteData => "no_acute_data",
            Self::NoChronicData => "no_chronic_data",
            Self::InsufficientChronicData => "insufficient_chronic_data",
            Self::SignificantDataGaps => "significant_data_gaps",
            Self::FutureDates => "future_dates",
        }
    }
}

/// Weighted-average computation result for one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayResult {
    /// Sum of weighted loads
    pub weighted_load_sum: f64,
    /// Sum of weighted TRIMP values
    pub weighted_trimp_sum: f64,
    /// Sum of weights
    pub total_weight: f64,
    /// Weighted load average
    pub weighted_load_avg: f64,
    /// Weighted TRIMP average
    pub weighted_trimp_avg: f64,
    /// Number of activities processed
    pub activity_count: usize,
}

/// Enhanced ACWR computation result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhancedAcwr {
    /// Simple 7-day mean of external load
    pub acute_load_avg: f64,
    /// Simple 7-day mean of TRIMP
    pub acute_trimp_avg: f64,
    /// Exponentially-weighted chronic load average
    pub chronic_load_avg: f64,
    /// Exponentially-weighted chronic TRIMP average
    pub chronic_trimp_avg: f64,
    /// External acute:chronic ratio
    pub acute_chronic_ratio: f64,
    /// Internal acute:chronic ratio
    pub trimp_acute_chronic_ratio: f64,
    /// Normalized divergence between the two ratios
    pub normalized_divergence: f64,
    /// Set when the inputs preclude a meaningful calculation; all numeric
    /// fields are zero in that case
    pub edge_case: Option<EdgeCase>,
}

impl EnhancedAcwr {
    fn edge(case: EdgeCase) -> Self {
        Self {
            acute_load_avg: 0.0,
            acute_trimp_avg: 0.0,
            chronic_load_avg: 0.0,
            chronic_trimp_avg: 0.0,
            acute_chronic_ratio: 0.0,
            trimp_acute_chronic_ratio: 0.0,
            normalized_divergence: 0.0,
            edge_case: Some(case),
        }
    }
}

/// Exponential decay weight for an activity `days_ago` days before the
/// reference date: `e^(-decay_rate x days_ago)`
#[must_use]
pub fn exponential_weight(days_ago: i64, decay_rate: f64) -> f64 {
    if days_ago < 0 {
        return 0.0;
    }
    (-decay_rate * days_ago as f64).exp().clamp(0.0, 1.0)
}

/// Compute exponentially-weighted averages over `activities` relative to
/// `reference_date`. Picks a computation tier by input size.
#[must_use]
pub fn weighted_averages(
    activities: &[ActivityData],
    reference_date: NaiveDate,
    decay_rate: f64,
) -> DecayResult {
    if activities.is_empty() {
        return DecayResult {
            weighted_load_sum: 0.0,
            weighted_trimp_sum: 0.0,
            total_weight: 0.0,
            weighted_load_avg: 0.0,
            weighted_trimp_avg: 0.0,
            activity_count: 0,
        };
    }

    let (load_sum, trimp_sum, weight_sum) = if activities.len() > BATCH_TIER_THRESHOLD {
        debug!(
            "Decay engine batched tier: {} activities in {} chunks",
            activities.len(),
            activities.len().div_ceil(BATCH_SIZE)
        );
        batched_sums(activities, reference_date, decay_rate)
    } else if activities.len() > LOOKUP_TIER_THRESHOLD {
        debug!("Decay engine lookup tier: {} activities", activities.len());
        lookup_sums(activities, reference_date, decay_rate)
    } else {
        direct_sums(activities, reference_date, decay_rate)
    };

    let (load_avg, trimp_avg) = if weight_sum > 0.0 {
        (load_sum / weight_sum, trimp_sum / weight_sum)
    } else {
        (0.0, 0.0)
    };

    DecayResult {
        weighted_load_sum: round3(load_sum),
        weighted_trimp_sum: round3(trimp_sum),
        total_weight: round3(weight_sum),
        weighted_load_avg: round3(load_avg),
        weighted_trimp_avg: round3(trimp_avg),
        activity_count: activities.len(),
    }
}

fn direct_sums(
    activities: &[ActivityData],
    reference_date: NaiveDate,
    decay_rate: f64,
) -> (f64, f64, f64) {
    let mut load_sum = 0.0;
    let mut trimp_sum = 0.0;
    let mut weight_sum = 0.0;

    for activity in activities {
        let days_ago = (reference_date - activity.date).num_days();
        let weight = exponential_weight(days_ago, decay_rate);
        load_sum += activity.total_load_miles * weight;
        trimp_sum += activity.trimp * weight;
        weight_sum += weight;
    }

    (load_sum, trimp_sum, weight_sum)
}

/// Precompute one weight per days-ago offset; the chronic window is at most
/// 90 days, so the table stays tiny regardless of activity count
fn lookup_sums(
    activities: &[ActivityData],
    reference_date: NaiveDate,
    decay_rate: f64,
) -> (f64, f64, f64) {
    let max_days = activities
        .iter()
        .map(|a| (reference_date - a.date).num_days())
        .max()
        .unwrap_or(0)
        .max(0);

    let table: Vec<f64> = (0..=max_days)
        .map(|d| exponential_weight(d, decay_rate))
        .collect();

    let mut load_sum = 0.0;
    let mut trimp_sum = 0.0;
    let mut weight_sum = 0.0;

    for activity in activities {
        let days_ago = (reference_date - activity.date).num_days();
        let weight = if days_ago < 0 {
            0.0
        } else {
            table.get(days_ago as usize).copied().unwrap_or(0.0)
        };
        load_sum += activity.total_load_miles * weight;
        trimp_sum += activity.trimp * weight;
        weight_sum += weight;
    }

    (load_sum, trimp_sum, weight_sum)
}

/// Sum partial weighted sums over fixed-size batches to keep accumulation
/// error bounded on very large inputs
fn batched_sums(
    activities: &[ActivityData],
    reference_date: NaiveDate,
    decay_rate: f64,
) -> (f64, f64, f64) {
    let mut load_sum = 0.0;
    let mut trimp_sum = 0.0;
    let mut weight_sum = 0.0;

    for chunk in activities.chunks(BATCH_SIZE) {
        let (load, trimp, weight) = lookup_sums(chunk, reference_date, decay_rate);
        load_sum += load;
        trimp_sum += trimp;
        weight_sum += weight;
    }

    (load_sum, trimp_sum, weight_sum)
}

/// Compute the enhanced ACWR: simple mean on the acute side, exponentially
/// weighted on the chronic side.
#[must_use]
pub fn enhanced_acwr(
    acute_activities: &[ActivityData],
    chronic_activities: &[ActivityData],
    decay_rate: f64,
    chronic_period_days: i64,
    reference_date: NaiveDate,
) -> EnhancedAcwr {
    if let Some(case) = detect_edge_case(
        acute_activities,
        chronic_activities,
        chronic_period_days,
        reference_date,
    ) {
        debug!("Enhanced ACWR edge case: {}", case.as_str());
        return EnhancedAcwr::edge(case);
    }

    let acute_count = acute_activities.len() as f64;
    let acute_load_avg =
        acute_activities.iter().map(|a| a.total_load_miles).sum::<f64>() / acute_count;
    let acute_trimp_avg = acute_activities.iter().map(|a| a.trimp).sum::<f64>() / acute_count;

    let chronic = weighted_averages(chronic_activities, reference_date, decay_rate);

    let acute_chronic_ratio = if chronic.weighted_load_avg > 0.0 {
        acute_load_avg / chronic.weighted_load_avg
    } else {
        0.0
    };
    let trimp_acute_chronic_ratio = if chronic.weighted_trimp_avg > 0.0 {
        acute_trimp_avg / chronic.weighted_trimp_avg
    } else {
        0.0
    };

    EnhancedAcwr {
        acute_load_avg: round3(acute_load_avg),
        acute_trimp_avg: round3(acute_trimp_avg),
        chronic_load_avg: chronic.weighted_load_avg,
        chronic_trimp_avg: chronic.weighted_trimp_avg,
        acute_chronic_ratio: round3(acute_chronic_ratio),
        trimp_acute_chronic_ratio: round3(trimp_acute_chronic_ratio),
        normalized_divergence: super::aggregates::normalized_divergence(
            acute_chronic_ratio,
            trimp_acute_chronic_ratio,
        ),
        edge_case: None,
    }
}

fn detect_edge_case(
    acute: &[ActivityData],
    chronic: &[ActivityData],
    chronic_period_days: i64,
    reference_date: NaiveDate,
) -> Option<EdgeCase> {
    if acute.is_empty() && chronic.is_empty() {
        return Some(EdgeCase::NoData);
    }
    if acute.is_empty() {
        return Some(EdgeCase::NoAcuteData);
    }
    if chronic.is_empty() {
        return Some(EdgeCase::NoChronicData);
    }

    if acute.iter().chain(chronic).any(|a| a.date > reference_date) {
        return Some(EdgeCase::FutureDates);
    }

    let distinct_days: HashSet<NaiveDate> = chronic.iter().map(|a| a.date).collect();
    if distinct_days.len() < windows::ACUTE_DAYS as usize {
        return Some(EdgeCase::InsufficientChronicData);
    }

    let window = chronic_period_days.max(1) as f64;
    if (distinct_days.len() as f64) < window * 0.5 {
        return Some(EdgeCase::SignificantDataGaps);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(offset_from_ref: i64, reference: NaiveDate) -> NaiveDate {
        reference - Duration::days(offset_from_ref)
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn uniform_activities(days: i64, load: f64, trimp: f64) -> Vec<ActivityData> {
        (0..days)
            .map(|d| ActivityData {
                date: date(d, reference()),
                total_load_miles: load,
                trimp,
            })
            .collect()
    }

    #[test]
    fn weight_decays_with_age() {
        let today = exponential_weight(0, 0.05);
        let old = exponential_weight(28, 0.05);
        assert!((today - 1.0).abs() < 1e-12);
        assert!(old < today);
        assert!((old - (-0.05_f64 * 28.0).exp()).abs() < 1e-12);
    }

    #[test]
    fn uniform_data_weighted_average_equals_value() {
        // When every day carries the same load, weighting cannot change the mean
        let activities = uniform_activities(28, 5.0, 60.0);
        let result = weighted_averages(&activities, reference(), 0.05);
        assert!((result.weighted_load_avg - 5.0).abs() < 1e-6);
        assert!((result.weighted_trimp_avg - 60.0).abs() < 1e-6);
    }

    #[test]
    fn recent_load_dominates_weighted_average() {
        // Heavy recent week, light older weeks: weighted avg exceeds simple avg
        let mut activities = Vec::new();
        for d in 0..28 {
            activities.push(ActivityData {
                date: date(d, reference()),
                total_load_miles: if d < 7 { 10.0 } else { 2.0 },
                trimp: 0.0,
            });
        }
        let weighted = weighted_averages(&activities, reference(), 0.1);
        let simple: f64 = activities.iter().map(|a| a.total_load_miles).sum::<f64>() / 28.0;
        assert!(weighted.weighted_load_avg > simple);
    }

    #[test]
    fn lookup_tier_matches_direct_computation() {
        // Many activities per day pushes past the lookup threshold
        let mut activities = Vec::new();
        for d in 0..28 {
            for _ in 0..50 {
                activities.push(ActivityData {
                    date: date(d, reference()),
                    total_load_miles: 3.0,
                    trimp: 40.0,
                });
            }
        }
        assert!(activities.len() > LOOKUP_TIER_THRESHOLD);

        let tiered = weighted_averages(&activities, reference(), 0.05);
        let direct = direct_sums(&activities, reference(), 0.05);
        assert!((tiered.weighted_load_sum - round3(direct.0)).abs() < 1e-6);
    }

    #[test]
    fn batched_tier_matches_direct_computation() {
        let mut activities = Vec::new();
        for d in 0..28 {
            for _ in 0..400 {
                activities.push(ActivityData {
                    date: date(d, reference()),
                    total_load_miles: 1.5,
                    trimp: 20.0,
                });
            }
        }
        assert!(activities.len() > BATCH_TIER_THRESHOLD);

        let tiered = weighted_averages(&activities, reference(), 0.05);
        let direct = direct_sums(&activities, reference(), 0.05);
        assert!((tiered.weighted_load_sum - round3(direct.0)).abs() < 1e-3);
    }

    #[test]
    fn enhanced_acwr_on_uniform_data_is_unity() {
        let acute = uniform_activities(7, 5.0, 60.0);
        let chronic = uniform_activities(28, 5.0, 60.0);
        let result = enhanced_acwr(&acute, &chronic, 0.05, 28, reference());

        assert!(result.edge_case.is_none());
        assert!((result.acute_chronic_ratio - 1.0).abs() < 1e-6);
        assert!((result.trimp_acute_chronic_ratio - 1.0).abs() < 1e-6);
        assert!(result.normalized_divergence.abs() < 1e-6);
    }

    #[test]
    fn edge_cases_are_detected_in_order() {
        let reference = reference();

        let empty: Vec<ActivityData> = Vec::new();
        let some = uniform_activities(10, 1.0, 10.0);

        assert_eq!(
            enhanced_acwr(&empty, &empty, 0.05, 28, reference).edge_case,
            Some(EdgeCase::NoData)
        );
        assert_eq!(
            enhanced_acwr(&empty, &some, 0.05, 28, reference).edge_case,
            Some(EdgeCase::NoAcuteData)
        );
        assert_eq!(
            enhanced_acwr(&some, &empty, 0.05, 28, reference).edge_case,
            Some(EdgeCase::NoChronicData)
        );
    }

    #[test]
    fn future_dates_are_an_edge_case() {
        let acute = uniform_activities(7, 5.0, 60.0);
        let mut chronic = uniform_activities(28, 5.0, 60.0);
        chronic.push(ActivityData {
            date: reference() + Duration::days(2),
            total_load_miles: 1.0,
            trimp: 1.0,
        });

        let result = enhanced_acwr(&acute, &chronic, 0.05, 28, reference());
        assert_eq!(result.edge_case, Some(EdgeCase::FutureDates));
    }

    #[test]
    fn sparse_chronic_data_flags_insufficiency_then_gaps() {
        let acute = uniform_activities(7, 5.0, 60.0);

        let five_days = uniform_activities(5, 5.0, 60.0);
        assert_eq!(
            enhanced_acwr(&acute, &five_days, 0.05, 28, reference()).edge_case,
            Some(EdgeCase::InsufficientChronicData)
        );

        // 10 distinct days across a 28-day window is under the 50% floor
        let ten_days = uniform_activities(10, 5.0, 60.0);
        assert_eq!(
            enhanced_acwr(&acute, &ten_days, 0.05, 28, reference()).edge_case,
            Some(EdgeCase::SignificantDataGaps)
        );
    }
}
