// ABOUTME: Autopsy generation grading prescribed guidance against actual training
// ABOUTME: Builds insight context for the feedback loop and a deterministic LLM fallback

//! # Training Autopsies
//!
//! When an athlete saves observations for a completed day, the autopsy
//! compares what was prescribed with what actually happened, scores the
//! alignment on a 1-10 scale, and stores the analysis. Recent autopsies
//! feed the next recommendation through [`AutopsyInsights`].

use crate::models::{ActivityRecord, Autopsy, JournalEntry};

/// Learning context extracted from recent autopsies
#[derive(Debug, Clone)]
pub struct AutopsyInsights {
    /// Number of autopsies in the lookback window
    pub count: i64,
    /// Average alignment score
    pub avg_alignment: f64,
    /// Alignment scores oldest-first (last three)
    pub alignment_trend: Vec<i64>,
    /// Excerpt of the latest learning-insights section
    pub latest_insight: Option<String>,
}

impl AutopsyInsights {
    /// Build the insight context from recent autopsies (newest first, as
    /// returned by the database)
    #[must_use]
    pub fn from_autopsies(autopsies: &[Autopsy]) -> Option<Self> {
        if autopsies.is_empty() {
            return None;
        }

        let scores: Vec<i64> = autopsies.iter().map(|a| a.alignment_score).collect();
        let avg_alignment = scores.iter().sum::<i64>() as f64 / scores.len() as f64;

        // Trend reads oldest-first; keep the most recent three
        let mut trend: Vec<i64> = scores.iter().copied().take(3).collect();
        trend.reverse();

        let latest_insight = autopsies.first().and_then(|a| {
            let upper = a.autopsy_analysis.to_uppercase();
            upper.find("LEARNING INSIGHTS").map(|idx| {
                a.autopsy_analysis[idx..]
                    .chars()
                    .take(200)
                    .collect::<String>()
            })
        });

        Some(Self {
            count: autopsies.len() as i64,
            avg_alignment: (avg_alignment * 10.0).round() / 10.0,
            alignment_trend: trend,
            latest_insight,
        })
    }
}

/// Summarize the real activities of a date for the autopsy prompt
#[must_use]
pub fn actual_activity_summary(activities: &[ActivityRecord]) -> String {
    let real: Vec<&ActivityRecord> = activities.iter().filter(|a| !a.is_rest_day()).collect();

    if real.is_empty() {
        return "Rest - no activity recorded".to_owned();
    }

    real.iter()
        .map(|activity| {
            format!(
                "{sport} workout: {distance:.1} miles, {elevation:.0} ft elevation, \
                 {duration:.0} min, TRIMP: {trimp:.0}",
                sport = activity.sport_type.as_str(),
                distance = activity.distance_miles,
                elevation = activity.elevation_gain_feet,
                duration = activity.duration_minutes,
                trimp = activity.trimp,
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Deterministic autopsy skeleton used when the LLM is unavailable. Still
/// yields a readable analysis and an alignment score of 5.
#[must_use]
pub fn fallback_autopsy(
    prescribed_action: &str,
    actual_activities: &str,
    entry: &JournalEntry,
) -> (String, i64) {
    let mut response_notes = Vec::new();

    if let Some(energy) = entry.energy_level {
        if energy <= 2 {
            response_notes.push("Low energy reported - may indicate fatigue".to_owned());
        } else if energy >= 4 {
            response_notes.push("Good energy levels - positive adaptation sign".to_owned());
        }
    }
    if let Some(rpe) = entry.rpe_score {
        if rpe >= 8 {
            response_notes.push("High RPE suggests significant effort".to_owned());
        } else if rpe <= 4 {
            response_notes.push("Low RPE indicates easy session".to_owned());
        }
    }
    if let Some(pain) = entry.pain_percentage {
        if pain > 0 {
            response_notes.push(format!("Pain reported ({pain}%) - monitor closely"));
        }
    }

    let response_analysis = if response_notes.is_empty() {
        "Insufficient data for analysis".to_owned()
    } else {
        response_notes.join("; ")
    };

    let prescribed_excerpt: String = prescribed_action.chars().take(100).collect();
    let actual_excerpt: String = actual_activities.chars().take(100).collect();

    let analysis = format!(
        "ALIGNMENT ASSESSMENT:\n\
         Training completed with basic alignment assessment. Detailed comparison requires \
         AI analysis.\n\
         \n\
         PHYSIOLOGICAL RESPONSE ANALYSIS:\n\
         {response_analysis}\n\
         \n\
         LEARNING INSIGHTS & TOMORROW'S IMPLICATIONS:\n\
         Fallback autopsy generated because the analysis service was unavailable. Future \
         training should consider the reported energy and pain levels.\n\
         \n\
         Prescribed: {prescribed_excerpt}\n\
         Actual: {actual_excerpt}"
    );

    (analysis, 5)
}
