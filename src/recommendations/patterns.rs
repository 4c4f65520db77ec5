// ABOUTME: Training pattern analysis over recent activity history
// ABOUTME: Produces red/positive/warning flags and the trend summary fed into prompts

//! # Pattern Analysis
//!
//! Scans recent activity rows for risk flags (chronic ACWR elevation,
//! divergence drift) and positive adaptations, and summarizes longer-term
//! trends (weekly volume, intensity distribution, workout mix, elevation).

use super::prompts::RiskThresholds;
use crate::models::{ActivityRecord, SportType};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Risk and adaptation flags surfaced to the prompt
#[derive(Debug, Clone, Default)]
pub struct PatternFlags {
    /// Conditions requiring intervention
    pub red_flags: Vec<String>,
    /// Signs of efficient adaptation
    pub positive_patterns: Vec<String>,
    /// Conditions to monitor
    pub warnings: Vec<String>,
}

/// Longer-horizon trend summary
#[derive(Debug, Clone)]
pub struct TrainingPatterns {
    /// increasing / decreasing / stable
    pub weekly_volume_trend: String,
    /// Easy/moderate/hard percentage split
    pub intensity_distribution: String,
    /// Top workout types by frequency
    pub workout_type_frequency: String,
    /// flat / rolling / hilly
    pub elevation_pattern: String,
}

impl TrainingPatterns {
    /// Placeholder when there is not enough history to analyze
    #[must_use]
    pub fn insufficient() -> Self {
        Self {
            weekly_volume_trend: "insufficient data".to_owned(),
            intensity_distribution: "insufficient data".to_owned(),
            workout_type_frequency: "insufficient data".to_owned(),
            elevation_pattern: "insufficient data".to_owned(),
        }
    }
}

/// Per-date view used by the flag analysis: multiple rows on one date carry
/// identical aggregates, so one entry per date suffices
fn daily_series(activities: &[ActivityRecord]) -> Vec<(NaiveDate, f64, f64, Option<f64>)> {
    let mut by_date: BTreeMap<NaiveDate, (f64, f64, Option<f64>)> = BTreeMap::new();

    for activity in activities {
        if let Some(agg) = &activity.aggregates {
            by_date.insert(
                activity.date,
                (
                    agg.acute_chronic_ratio,
                    agg.trimp_acute_chronic_ratio,
                    Some(agg.normalized_divergence),
                ),
            );
        } else {
            by_date.entry(activity.date).or_insert((0.0, 0.0, None));
        }
    }

    by_date
        .into_iter()
        .map(|(date, (ext, int, div))| (date, ext, int, div))
        .collect()
}

/// Analyze the last 14 days of activity for red flags and positive
/// adaptations using the athlete's personalized thresholds
#[must_use]
pub fn analyze_pattern_flags(
    activities: &[ActivityRecord],
    thresholds: &RiskThresholds,
) -> PatternFlags {
    let mut flags = PatternFlags::default();

    let series = daily_series(activities);
    let recent: Vec<_> = series.iter().rev().take(14).rev().collect();

    if recent.len() < 7 {
        return flags;
    }

    // Chronic ACWR elevation: 5+ of the last 7 days above the threshold
    let high_acwr_days = recent
        .iter()
        .rev()
        .take(7)
        .filter(|(_, ext, int, _)| *ext > thresholds.acwr_high_risk || *int > thresholds.acwr_high_risk)
        .count();

    if high_acwr_days >= 5 {
        flags.red_flags.push(format!(
            "Chronic ACWR elevation (>{}) for 5+ consecutive days",
            thresholds.acwr_high_risk
        ));
    }

    // Divergence trend over the last 10 days with known divergence
    let divergence_trend: Vec<f64> = recent
        .iter()
        .rev()
        .take(10)
        .rev()
        .filter_map(|(_, _, _, div)| *div)
        .collect();

    if divergence_trend.len() >= 5 {
        let consecutive_negative = divergence_trend
            .iter()
            .rev()
            .take_while(|&&div| div < -0.05)
            .count();

        if consecutive_negative >= 6 {
            flags.red_flags.push(format!(
                "DIVERGENCE DRIFT: The {consecutive_negative}+ day negative divergence trend \
                 indicates disproportionate internal stress accumulation"
            ));
        } else if consecutive_negative >= 5 {
            flags.warnings.push(format!(
                "Divergence trending negative for {consecutive_negative} consecutive days - \
                 monitor closely"
            ));
        }

        let consecutive_positive = divergence_trend
            .iter()
            .rev()
            .take_while(|&&div| div > 0.05)
            .count();

        if consecutive_positive >= 3 {
            flags.positive_patterns.push(format!(
                "Efficient adaptation - {consecutive_positive} consecutive days of positive \
                 divergence indicates excellent load tolerance"
            ));
        }
    }

    flags
}

/// Summarize longer-term training patterns for prompt context
#[must_use]
pub fn analyze_training_patterns(activities: &[ActivityRecord]) -> TrainingPatterns {
    if activities.is_empty() {
        return TrainingPatterns::insufficient();
    }

    TrainingPatterns {
        weekly_volume_trend: volume_trend(activities),
        intensity_distribution: intensity_distribution(activities),
        workout_type_frequency: workout_type_frequency(activities),
        elevation_pattern: elevation_pattern(activities),
    }
}

fn volume_trend(activities: &[ActivityRecord]) -> String {
    let mut weeks: BTreeMap<u32, f64> = BTreeMap::new();
    for activity in activities {
        let week = activity.date.iso_week().week();
        *weeks.entry(week).or_insert(0.0) += activity.distance_miles;
    }

    let volumes: Vec<f64> = weeks.into_values().collect();
    if volumes.len() < 2 {
        return "stable".to_owned();
    }

    let last = volumes[volumes.len() - 1];
    let prev = volumes[volumes.len() - 2];

    if last > prev * 1.15 {
        "increasing".to_owned()
    } else if last < prev * 0.85 {
        "decreasing".to_owned()
    } else {
        "stable".to_owned()
    }
}

fn intensity_distribution(activities: &[ActivityRecord]) -> String {
    let mut easy = 0_usize;
    let mut moderate = 0_usize;
    let mut hard = 0_usize;

    for activity in activities {
        if activity.is_rest_day() {
            continue;
        }

        let zone_total = activity.time_in_zone1
            + activity.time_in_zone2
            + activity.time_in_zone3
            + activity.time_in_zone4
            + activity.time_in_zone5;

        if zone_total == 0 {
            // No HR zone data: fall back to TRIMP banding
            if activity.trimp <= 30.0 {
                easy += 1;
            } else if activity.trimp <= 70.0 {
                moderate += 1;
            } else {
                hard += 1;
            }
            continue;
        }

        let pct = |zone_time: i64| zone_time as f64 / zone_total as f64 * 100.0;
        let zone1 = pct(activity.time_in_zone1);
        let zone2 = pct(activity.time_in_zone2);
        let zone4 = pct(activity.time_in_zone4);
        let zone5 = pct(activity.time_in_zone5);

        if zone1 > 50.0 || zone1 + zone2 > 70.0 {
            easy += 1;
        } else if zone4 > 30.0 || zone5 > 20.0 || zone4 + zone5 > 40.0 {
            hard += 1;
        } else {
            moderate += 1;
        }
    }

    let total = easy + moderate + hard;
    if total == 0 {
        return "unknown".to_owned();
    }

    let share = |n: usize| (n as f64 / total as f64 * 100.0).round();
    format!(
        "Easy: {:.0}%, Moderate: {:.0}%, Hard: {:.0}%",
        share(easy),
        share(moderate),
        share(hard)
    )
}

fn workout_type_frequency(activities: &[ActivityRecord]) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for activity in activities {
        *counts
            .entry(activity.sport_type.as_str().to_owned())
            .or_insert(0) += 1;
    }

    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    sorted
        .into_iter()
        .take(3)
        .map(|(sport, count)| format!("{sport}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn elevation_pattern(activities: &[ActivityRecord]) -> String {
    let gains: Vec<f64> = activities.iter().map(|a| a.elevation_gain_feet).collect();
    let avg = gains.iter().sum::<f64>() / gains.len() as f64;

    if avg > 500.0 {
        "hilly".to_owned()
    } else if avg > 200.0 {
        "rolling".to_owned()
    } else {
        "flat".to_owned()
    }
}

/// One-line-per-day summary of the last seven active dates, newest first
#[must_use]
pub fn recent_activities_summary(activities: &[ActivityRecord]) -> String {
    if activities.is_empty() {
        return "No recent activities found.".to_owned();
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<&ActivityRecord>> = BTreeMap::new();
    for activity in activities {
        by_date.entry(activity.date).or_default().push(activity);
    }

    let mut lines = Vec::new();
    for (date, rows) in by_date.iter().rev().take(7) {
        for activity in rows {
            if activity.is_rest_day() {
                lines.push(format!("{date}: Rest day"));
                continue;
            }

            let (ext, int, div) = activity.aggregates.as_ref().map_or(
                (0.0, 0.0, 0.0),
                |agg| {
                    (
                        agg.acute_chronic_ratio,
                        agg.trimp_acute_chronic_ratio,
                        agg.normalized_divergence,
                    )
                },
            );

            let div_str = if div == 0.0 {
                String::new()
            } else {
                format!(", Divergence: {div:.2}")
            };

            lines.push(format!(
                "{date}: {sport} - {distance:.1}mi, {elevation:.0}ft, TRIMP: {trimp:.0}, \
                 ACWR: {ext:.2}/{int:.2}{div_str}",
                sport = activity.sport_type.as_str(),
                distance = activity.distance_miles,
                elevation = activity.elevation_gain_feet,
                trimp = activity.trimp,
            ));
        }
    }

    lines.join("\n")
}

/// Consecutive non-rest days ending at the latest activity date
#[must_use]
pub fn days_since_rest(activities: &[ActivityRecord]) -> i64 {
    let mut rest_by_date: BTreeMap<NaiveDate, bool> = BTreeMap::new();
    for activity in activities {
        let entry = rest_by_date.entry(activity.date).or_insert(false);
        *entry = *entry || activity.is_rest_day() || activity.sport_type == SportType::Rest;
    }

    let mut streak = 0;
    for (_, is_rest) in rest_by_date.iter().rev() {
        if *is_rest {
            break;
        }
        streak += 1;
    }

    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyAggregates, TrimpMethod};
    use crate::recommendations::prompts::{adjusted_thresholds, RiskThresholds};
    use chrono::Duration;
    use uuid::Uuid;

    fn thresholds() -> RiskThresholds {
        adjusted_thresholds(crate::models::RiskTolerance::Balanced)
    }

    fn activity(
        user: Uuid,
        date: NaiveDate,
        ext: f64,
        int: f64,
        div: f64,
        rest: bool,
    ) -> ActivityRecord {
        let mut record = if rest {
            ActivityRecord::rest_day(user, date)
        } else {
            let mut r = ActivityRecord::rest_day(user, date);
            r.activity_id = date.num_days_from_ce() as i64;
            r.sport_type = SportType::Running;
            r.name = "Run".to_owned();
            r.distance_miles = 5.0;
            r.total_load_miles = 5.0;
            r.trimp = 60.0;
            r.trimp_calculation_method = TrimpMethod::Average;
            r
        };
        record.aggregates = Some(DailyAggregates {
            seven_day_avg_load: 5.0,
            twentyeight_day_avg_load: 5.0,
            seven_day_avg_trimp: 60.0,
            twentyeight_day_avg_trimp: 60.0,
            acute_chronic_ratio: ext,
            trimp_acute_chronic_ratio: int,
            normalized_divergence: div,
        });
        record
    }

    fn date(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap() - Duration::days(offset)
    }

    #[test]
    fn elevated_acwr_week_raises_red_flag() {
        let user = Uuid::new_v4();
        let activities: Vec<_> = (0..14)
            .map(|d| activity(user, date(13 - d), if d >= 8 { 1.4 } else { 1.0 }, 1.0, 0.0, false))
            .collect();

        let flags = analyze_pattern_flags(&activities, &thresholds());
        assert_eq!(flags.red_flags.len(), 1);
        assert!(flags.red_flags[0].contains("Chronic ACWR elevation"));
    }

    #[test]
    fn six_negative_divergence_days_is_a_red_flag() {
        let user = Uuid::new_v4();
        let activities: Vec<_> = (0..14)
            .map(|d| {
                let div = if d >= 8 { -0.1 } else { 0.0 };
                activity(user, date(13 - d), 1.0, 1.0, div, false)
            })
            .collect();

        let flags = analyze_pattern_flags(&activities, &thresholds());
        assert!(flags.red_flags.iter().any(|f| f.contains("DIVERGENCE DRIFT")));
    }

    #[test]
    fn five_negative_divergence_days_is_a_warning() {
        let user = Uuid::new_v4();
        let activities: Vec<_> = (0..14)
            .map(|d| {
                let div = if d >= 9 { -0.1 } else { 0.0 };
                activity(user, date(13 - d), 1.0, 1.0, div, false)
            })
            .collect();

        let flags = analyze_pattern_flags(&activities, &thresholds());
        assert!(flags.red_flags.is_empty());
        assert_eq!(flags.warnings.len(), 1);
    }

    #[test]
    fn positive_divergence_run_is_flagged_as_adaptation() {
        let user = Uuid::new_v4();
        let activities: Vec<_> = (0..14)
            .map(|d| {
                let div = if d >= 11 { 0.1 } else { 0.0 };
                activity(user, date(13 - d), 1.0, 1.0, div, false)
            })
            .collect();

        let flags = analyze_pattern_flags(&activities, &thresholds());
        assert_eq!(flags.positive_patterns.len(), 1);
    }

    #[test]
    fn short_history_produces_no_flags() {
        let user = Uuid::new_v4();
        let activities: Vec<_> = (0..4)
            .map(|d| activity(user, date(3 - d), 2.0, 2.0, -0.5, false))
            .collect();

        let flags = analyze_pattern_flags(&activities, &thresholds());
        assert!(flags.red_flags.is_empty());
        assert!(flags.warnings.is_empty());
    }

    #[test]
    fn days_since_rest_counts_back_to_last_rest_day() {
        let user = Uuid::new_v4();
        let mut activities = vec![
            activity(user, date(4), 1.0, 1.0, 0.0, true), // rest
        ];
        for d in 0..4 {
            activities.push(activity(user, date(d), 1.0, 1.0, 0.0, false));
        }

        assert_eq!(days_since_rest(&activities), 4);
    }

    #[test]
    fn summary_lists_rest_days_and_metrics() {
        let user = Uuid::new_v4();
        let activities = vec![
            activity(user, date(1), 1.1, 0.9, 0.2, false),
            activity(user, date(0), 1.0, 1.0, 0.0, true),
        ];

        let summary = recent_activities_summary(&activities);
        assert!(summary.contains("Rest day"));
        assert!(summary.contains("ACWR: 1.10/0.90"));
        assert!(summary.contains("Divergence: 0.20"));
    }
}
