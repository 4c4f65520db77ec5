// ABOUTME: Prompt composition for daily recommendations and training autopsies
// ABOUTME: Encodes risk-tolerance thresholds, the assessment decision tree, and coaching tones

//! # Prompt Composition
//!
//! Builds the fully-composed user messages sent to the LLM. Thresholds are
//! personalized by risk tolerance, the assessment category comes from a
//! deterministic decision tree (Safety -> Overtraining -> ACWR -> Recovery
//! -> Progression), and the coaching tone block is keyed to the athlete's
//! 0-100 spectrum position.

use crate::constants::recommendations as rec_constants;
use crate::models::{JournalEntry, MetricsSnapshot, RiskTolerance};

use super::autopsy::AutopsyInsights;
use super::patterns::{PatternFlags, TrainingPatterns};

/// Personalized risk thresholds derived from the athlete's risk tolerance
#[derive(Debug, Clone, Copy)]
pub struct RiskThresholds {
    /// ACWR above which risk is flagged
    pub acwr_high_risk: f64,
    /// Maximum consecutive training days before rest is mandated
    pub days_since_rest_max: i64,
    /// Divergence below which overtraining risk is flagged
    pub divergence_overtraining: f64,
    /// Divergence below which recovery is suggested
    pub divergence_moderate_risk: f64,
    /// ACWR below which progression is encouraged
    pub acwr_undertraining: f64,
    /// Short description of the tolerance profile
    pub description: &'static str,
}

/// Thresholds for each risk-tolerance category
#[must_use]
pub const fn adjusted_thresholds(style: RiskTolerance) -> RiskThresholds {
    match style {
        RiskTolerance::Conservative => RiskThresholds {
            acwr_high_risk: 1.2,
            days_since_rest_max: 6,
            divergence_overtraining: -0.10,
            divergence_moderate_risk: -0.03,
            acwr_undertraining: 0.85,
            description: "Lower risk tolerance, earlier warnings, more recovery emphasis",
        },
        RiskTolerance::Balanced => RiskThresholds {
            acwr_high_risk: 1.3,
            days_since_rest_max: 7,
            divergence_overtraining: -0.15,
            divergence_moderate_risk: -0.05,
            acwr_undertraining: 0.8,
            description: "Evidence-based thresholds, balanced risk approach",
        },
        RiskTolerance::Adaptive => RiskThresholds {
            acwr_high_risk: 1.35,
            days_since_rest_max: 7,
            divergence_overtraining: -0.15,
            divergence_moderate_risk: -0.05,
            acwr_undertraining: 0.8,
            description: "Adjusts based on individual response patterns and recovery",
        },
        RiskTolerance::Aggressive => RiskThresholds {
            acwr_high_risk: 1.5,
            days_since_rest_max: 8,
            divergence_overtraining: -0.20,
            divergence_moderate_risk: -0.08,
            acwr_undertraining: 0.75,
            description: "Higher risk tolerance, aggressive progression, performance-focused",
        },
    }
}

/// Primary assessment category selected by the decision tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentCategory {
    /// Too many consecutive training days
    MandatoryRest,
    /// Divergence signals disproportionate internal stress
    OvertrainingRisk,
    /// Both ACWR ratios above the high-risk threshold
    HighAcwrRisk,
    /// Negative divergence with a long training streak
    RecoveryNeeded,
    /// Both ratios under the undertraining threshold
    UndertrainingOpportunity,
    /// No flag tripped
    NormalProgression,
}

impl AssessmentCategory {
    /// Stable label used inside prompts
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MandatoryRest => "mandatory_rest",
            Self::OvertrainingRisk => "overtraining_risk",
            Self::HighAcwrRisk => "high_acwr_risk",
            Self::RecoveryNeeded => "recovery_needed",
            Self::UndertrainingOpportunity => "undertraining_opportunity",
            Self::NormalProgression => "normal_progression",
        }
    }
}

/// Decision tree over the current metrics, evaluated in assessment order:
/// Safety -> Overtraining -> ACWR -> Recovery -> Progression
#[must_use]
pub fn assessment_category(
    metrics: &MetricsSnapshot,
    thresholds: &RiskThresholds,
) -> AssessmentCategory {
    if metrics.days_since_rest > thresholds.days_since_rest_max {
        AssessmentCategory::MandatoryRest
    } else if metrics.normalized_divergence < thresholds.divergence_overtraining {
        AssessmentCategory::OvertrainingRisk
    } else if metrics.external_acwr > thresholds.acwr_high_risk
        && metrics.internal_acwr > thresholds.acwr_high_risk
    {
        AssessmentCategory::HighAcwrRisk
    } else if metrics.normalized_divergence < thresholds.divergence_moderate_risk
        && metrics.days_since_rest > 5
    {
        AssessmentCategory::RecoveryNeeded
    } else if metrics.external_acwr < thresholds.acwr_undertraining
        && metrics.internal_acwr < thresholds.acwr_undertraining
        && metrics.external_acwr > 0.0
    {
        AssessmentCategory::UndertrainingOpportunity
    } else {
        AssessmentCategory::NormalProgression
    }
}

/// Tone instruction block for the athlete's spectrum position
#[must_use]
pub const fn tone_instructions(spectrum: i64) -> &'static str {
    if spectrum <= 25 {
        "TONE & APPROACH for CASUAL COACHING:\n\
         - Use friendly, conversational language (\"Nice work!\", \"How did that feel?\")\n\
         - Focus on the joy and health benefits of training\n\
         - Minimize technical jargon and complex metrics\n\
         - Frame any adjustments as suggestions, not requirements\n\
         - Celebrate consistency over performance metrics\n\
         - Emphasize sustainable, enjoyable training"
    } else if spectrum <= 50 {
        "TONE & APPROACH for SUPPORTIVE COACHING:\n\
         - Lead with positive affirmation and accomplishment recognition\n\
         - Frame deviations as learning opportunities, not mistakes\n\
         - Use encouraging language (\"Great progress!\", \"You're building strength!\")\n\
         - Acknowledge effort and commitment consistently\n\
         - Provide gentle guidance with rationale\n\
         - Focus on building confidence through small wins"
    } else if spectrum <= 75 {
        "TONE & APPROACH for MOTIVATIONAL COACHING:\n\
         - Balance encouragement with performance challenges\n\
         - Set clear, achievable targets for improvement\n\
         - Use action-oriented language (\"Let's push for...\", \"Time to level up...\")\n\
         - Provide constructive feedback with growth focus\n\
         - Highlight potential and progress toward goals\n\
         - Challenge athlete while maintaining support"
    } else {
        "TONE & APPROACH for ANALYTICAL COACHING:\n\
         - Provide detailed, technical analysis of performance data\n\
         - Use precise metrics and evidence-based recommendations\n\
         - Direct feedback on training execution and physiological response\n\
         - Focus on optimization and performance enhancement\n\
         - Reference specific training science principles\n\
         - Give clear, actionable technical adjustments"
    }
}

/// Static training-reference guide embedded in prompts (truncated for
/// autopsies)
pub const TRAINING_GUIDE: &str = "\
TRAINING METRICS REFERENCE GUIDE

ACWR (Acute:Chronic Workload Ratio)
- Optimal Zone: 0.8-1.3. Loads in this band balance stimulus and recovery.
- High Risk: above the athlete's personalized threshold. Injury risk rises \
sharply; reduce volume before intensity.
- Undertraining: below 0.8. Fitness erodes; progressive loading is safe.

NORMALIZED DIVERGENCE (external vs internal ACWR)
- Balance zone: -0.05 to +0.05. External work and physiological cost agree.
- Negative drift: internal stress outpacing mechanical load. Sustained \
negative divergence signals accumulating fatigue, under-recovery, or early \
overtraining. Respond with recovery emphasis before it compounds.
- Positive drift: efficient adaptation. The athlete absorbs load at lower \
physiological cost; cautious progression is appropriate.

DECISION FRAMEWORK (assessment order)
1. Safety: consecutive training days past the rest ceiling mandate rest \
regardless of other metrics.
2. Overtraining: divergence below the overtraining threshold overrides \
progression; prescribe recovery.
3. ACWR: both ratios above the high-risk threshold call for a step-back \
week (reduce acute load 20-30%).
4. Recovery: moderate negative divergence plus a long streak suggests an \
easy day or rest.
5. Progression: ratios under the undertraining line support a 5-10% weekly \
volume increase, elevating one quality session.

PATTERN RECOGNITION
- 5+ of 7 days with elevated ACWR: chronic overload, not a single spike.
- 5-6 consecutive negative-divergence days: divergence drift; red flag at 6.
- 3+ consecutive positive-divergence days: efficient adaptation window.

SESSION CLASSIFICATION
- Easy: majority zone 1-2 time, TRIMP under 30.
- Moderate: zone 3 emphasis, TRIMP 30-70.
- Hard: meaningful zone 4-5 time or TRIMP above 70.";

/// Inputs shared by the recommendation prompt builders
pub struct RecommendationContext<'a> {
    /// Current metrics snapshot
    pub metrics: &'a MetricsSnapshot,
    /// Pattern flags over the last 14 days
    pub flags: &'a PatternFlags,
    /// Longer-horizon pattern summary
    pub patterns: &'a TrainingPatterns,
    /// Recent-activities summary block
    pub activities_summary: &'a str,
    /// Athlete risk tolerance
    pub style: RiskTolerance,
    /// Personalized thresholds
    pub thresholds: &'a RiskThresholds,
    /// Coaching tone block
    pub tone: &'a str,
    /// Analysis window description
    pub analysis_window: &'a str,
    /// Current date in the athlete's zone
    pub current_date: &'a str,
    /// Autopsy learning context, when available
    pub insights: Option<&'a AutopsyInsights>,
}

/// Compose the daily/weekly recommendation prompt
#[must_use]
pub fn recommendation_prompt(ctx: &RecommendationContext<'_>) -> String {
    let category = assessment_category(ctx.metrics, ctx.thresholds);
    let autopsy_context = ctx.insights.map_or(String::new(), autopsy_context_block);

    let red_flags = join_or(&ctx.flags.red_flags, "None detected");
    let positive = join_or(&ctx.flags.positive_patterns, "None identified");
    let warnings = join_or(&ctx.flags.warnings, "None");

    format!(
        "You are an expert endurance sports coach specializing in data-driven training recommendations.\n\
         \n\
         {tone}\n\
         \n\
         ATHLETE RISK TOLERANCE: {style} ({style_description})\n\
         - ACWR High Risk Threshold: >{acwr_high:.2}\n\
         - Maximum Days Without Rest: {rest_max} days\n\
         - Divergence Overtraining Risk: <{div_over:.2}\n\
         \n\
         ### ATHLETE PROFILE\n\
         Analysis Period: {window}\n\
         Assessment Category: {category}\n\
         \n\
         ### CURRENT METRICS (as of {date})\n\
         - External ACWR: {ext:.2} (Optimal: 0.8-1.3)\n\
         - Internal ACWR: {int:.2} (Optimal: 0.8-1.3)\n\
         - Normalized Divergence: {div:.3} (Balance zone: -0.05 to +0.05)\n\
         - 7-day Average Load: {load:.2} miles/day\n\
         - 7-day Average TRIMP: {trimp:.1}/day\n\
         - Days Since Rest: {rest}\n\
         {autopsy_context}\
         \n\
         ### PATTERN ANALYSIS\n\
         Training Trends:\n\
         - Weekly volume: {volume}\n\
         - Intensity distribution: {intensity}\n\
         - Workout types: {types}\n\
         - Elevation pattern: {elevation}\n\
         \n\
         Red Flags: {red_flags}\n\
         Positive Patterns: {positive}\n\
         Warnings: {warnings}\n\
         \n\
         ### RECENT ACTIVITY SUMMARY\n\
         {activities}\n\
         \n\
         ### TRAINING REFERENCE FRAMEWORK\n\
         {guide}\n\
         \n\
         ### RESPONSE INSTRUCTIONS\n\
         \n\
         Using the Training Reference Framework above and applying the specified coaching tone \
         throughout, provide specific, evidence-based recommendations in exactly three sections:\n\
         \n\
         **DAILY RECOMMENDATION:**\n\
         - Apply the Decision Framework assessment order (Safety -> Overtraining -> ACWR -> Recovery -> Progression)\n\
         - Use the athlete's risk tolerance thresholds listed above (NOT the standard guide thresholds)\n\
         - Reference the athlete's specific ACWR threshold ({acwr_high:.2}) and divergence limits\n\
         - Include specific volume/intensity targets based on current 7-day averages\n\
         \n\
         **WEEKLY PLANNING:**\n\
         - Apply weekly planning priorities from the guide with your coaching style\n\
         - Adjust recommendations to match the athlete's {style} risk tolerance\n\
         - Address any red flags or leverage positive patterns identified\n\
         - Include specific ACWR management strategies based on athlete's thresholds\n\
         \n\
         **PATTERN INSIGHTS:**\n\
         - Identify 2-3 specific observations using the pattern recognition framework\n\
         - Interpret metrics relative to this athlete's personalized thresholds\n\
         - Include forward-looking trend analysis based on recent patterns\n\
         \n\
         CRITICAL REQUIREMENTS:\n\
         - Use the ATHLETE'S PERSONALIZED THRESHOLDS, not the standard guide thresholds\n\
         - Apply the specified coaching tone consistently throughout all sections\n\
         - Keep each section focused and actionable\n\
         - Reference specific numbers from the metrics and use established classification terms \
         (e.g., \"Optimal Zone\", \"High Risk\", \"Efficient\") from the training guide\n",
        tone = ctx.tone,
        style = ctx.style.as_str(),
        style_description = ctx.thresholds.description,
        acwr_high = ctx.thresholds.acwr_high_risk,
        rest_max = ctx.thresholds.days_since_rest_max,
        div_over = ctx.thresholds.divergence_overtraining,
        window = ctx.analysis_window,
        category = category.as_str(),
        date = ctx.current_date,
        ext = ctx.metrics.external_acwr,
        int = ctx.metrics.internal_acwr,
        div = ctx.metrics.normalized_divergence,
        load = ctx.metrics.seven_day_avg_load,
        trimp = ctx.metrics.seven_day_avg_trimp,
        rest = ctx.metrics.days_since_rest,
        autopsy_context = autopsy_context,
        volume = ctx.patterns.weekly_volume_trend,
        intensity = ctx.patterns.intensity_distribution,
        types = ctx.patterns.workout_type_frequency,
        elevation = ctx.patterns.elevation_pattern,
        red_flags = red_flags,
        positive = positive,
        warnings = warnings,
        activities = ctx.activities_summary,
        guide = TRAINING_GUIDE,
    )
}

/// Autopsy-learning context block injected when recent autopsies exist
fn autopsy_context_block(insights: &AutopsyInsights) -> String {
    let trend_description = if insights.alignment_trend.len() >= 2
        && insights.alignment_trend.last() > insights.alignment_trend.first()
    {
        "improving"
    } else {
        "mixed"
    };

    format!(
        "\n### RECENT AUTOPSY LEARNING ({count} analyses)\n\
         - Average Alignment Score: {avg:.1}/10\n\
         - Alignment Trend: {trend} ({scores:?})\n\
         - Latest Insights: {latest}\n\
         \n\
         **COACHING ADAPTATION STRATEGY:**\n\
         - If alignment >7: Athlete follows guidance well - build on successful patterns\n\
         - If alignment 4-7: Address recurring deviations - simplify recommendations\n\
         - If alignment <4: Major strategy adjustment needed - focus on compliance over optimization\n\
         \n\
         **IMPORTANT:** Use this autopsy learning to adapt today's recommendation. If recent \
         alignment is low, recommend more conservative/achievable targets. If alignment is high, \
         maintain current approach.\n",
        count = insights.count,
        avg = insights.avg_alignment,
        trend = trend_description,
        scores = insights.alignment_trend,
        latest = insights
            .latest_insight
            .as_deref()
            .unwrap_or("No specific insights"),
    )
}

/// Compose the autopsy prompt demanding an `ALIGNMENT_SCORE: X/10` opener
#[must_use]
pub fn autopsy_prompt(
    date: &str,
    prescribed_action: &str,
    actual_activities: &str,
    entry: &JournalEntry,
    metrics: &MetricsSnapshot,
    tone: &str,
) -> String {
    let guide_excerpt: String = TRAINING_GUIDE
        .chars()
        .take(rec_constants::TRAINING_GUIDE_EXCERPT_CHARS)
        .collect();

    format!(
        "You are an expert endurance coach conducting a detailed training autopsy analysis for learning purposes.\n\
         \n\
         {tone}\n\
         \n\
         ANALYSIS DATE: {date}\n\
         \n\
         CURRENT ATHLETE CONTEXT:\n\
         - External ACWR: {ext:.2} (Optimal: 0.8-1.3)\n\
         - Internal ACWR: {int:.2} (Optimal: 0.8-1.3)\n\
         - Normalized Divergence: {div:.3} (Balance: -0.05 to +0.05)\n\
         - Days Since Rest: {rest}\n\
         \n\
         PRESCRIBED TRAINING DECISION:\n\
         {prescribed}\n\
         \n\
         ACTUAL TRAINING COMPLETED:\n\
         {actual}\n\
         \n\
         USER OBSERVATIONS:\n\
         {observations}\n\
         \n\
         TRAINING REFERENCE FRAMEWORK:\n\
         {guide}\n\
         ...\n\
         \n\
         AUTOPSY ANALYSIS INSTRUCTIONS:\n\
         \n\
         You must provide analysis in EXACTLY this format for parsing, applying the specified \
         coaching tone throughout:\n\
         \n\
         ALIGNMENT_SCORE: [X/10]\n\
         \n\
         ALIGNMENT ASSESSMENT:\n\
         [Detailed comparison of prescribed vs actual training. Score 10=perfect compliance, \
         8-9=minor deviations, 5-7=moderate changes, 1-4=major deviations. Consider volume, \
         intensity, type, and appropriateness given current metrics.]\n\
         \n\
         PHYSIOLOGICAL RESPONSE ANALYSIS:\n\
         [Evaluate energy/RPE/pain levels in context of training load. Compare expected vs actual \
         response. Identify signs of positive adaptation, fatigue, or red flags.]\n\
         \n\
         LEARNING INSIGHTS & TOMORROW'S IMPLICATIONS:\n\
         [Key takeaways for future training decisions. Why did the athlete deviate (if applicable)? \
         What does the response reveal about adaptation state? How should this influence the next \
         recommendation?]\n\
         \n\
         CRITICAL REQUIREMENTS:\n\
         - Start with \"ALIGNMENT_SCORE: X/10\" where X is a number 1-10\n\
         - Keep total response under 300 words for journal display\n\
         - Focus on actionable insights that will improve future recommendations\n\
         - Apply the specified coaching tone consistently throughout all sections\n",
        tone = tone,
        date = date,
        ext = metrics.external_acwr,
        int = metrics.internal_acwr,
        div = metrics.normalized_divergence,
        rest = metrics.days_since_rest,
        prescribed = prescribed_action,
        actual = actual_activities,
        observations = format_observations(entry),
        guide = guide_excerpt,
    )
}

/// Format journal observations for prompt inclusion
#[must_use]
pub fn format_observations(entry: &JournalEntry) -> String {
    let mut lines = Vec::new();

    if let Some(energy) = entry.energy_level {
        let label = match energy {
            1 => "Barely got out of bed",
            2 => "Low energy",
            3 => "Normal",
            4 => "High energy",
            _ => "Fired up",
        };
        lines.push(format!(
            "Energy Level: {energy}/5 ({label}) - How athlete felt going into session"
        ));
    }
    if let Some(rpe) = entry.rpe_score {
        lines.push(format!(
            "RPE (Rate of Perceived Exertion): {rpe}/10 - How hard the workout felt"
        ));
    }
    if let Some(pain) = entry.pain_percentage {
        lines.push(format!(
            "Pain %: {pain}% - Percentage of time thinking about pain during activity"
        ));
    }
    if let Some(notes) = entry.notes.as_deref() {
        if !notes.is_empty() {
            lines.push(format!("Notes: {notes}"));
        }
    }

    if lines.is_empty() {
        "No specific observations recorded".to_owned()
    } else {
        lines.join("\n")
    }
}

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_owned()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn metrics(ext: f64, int: f64, div: f64, rest: i64) -> MetricsSnapshot {
        MetricsSnapshot {
            external_acwr: ext,
            internal_acwr: int,
            normalized_divergence: div,
            seven_day_avg_load: 5.0,
            seven_day_avg_trimp: 60.0,
            twentyeight_day_avg_load: 5.0,
            twentyeight_day_avg_trimp: 60.0,
            days_since_rest: rest,
            latest_activity_date: None,
        }
    }

    #[test]
    fn decision_tree_honors_assessment_order() {
        let thresholds = adjusted_thresholds(RiskTolerance::Balanced);

        // Safety first: rest ceiling trumps everything else
        assert_eq!(
            assessment_category(&metrics(1.6, 1.6, -0.3, 9), &thresholds),
            AssessmentCategory::MandatoryRest
        );
        // Overtraining before ACWR
        assert_eq!(
            assessment_category(&metrics(1.6, 1.6, -0.3, 3), &thresholds),
            AssessmentCategory::OvertrainingRisk
        );
        assert_eq!(
            assessment_category(&metrics(1.6, 1.6, 0.0, 3), &thresholds),
            AssessmentCategory::HighAcwrRisk
        );
        assert_eq!(
            assessment_category(&metrics(1.0, 1.0, -0.08, 6), &thresholds),
            AssessmentCategory::RecoveryNeeded
        );
        assert_eq!(
            assessment_category(&metrics(0.6, 0.6, 0.0, 3), &thresholds),
            AssessmentCategory::UndertrainingOpportunity
        );
        assert_eq!(
            assessment_category(&metrics(1.0, 1.0, 0.0, 3), &thresholds),
            AssessmentCategory::NormalProgression
        );
    }

    #[test]
    fn conservative_thresholds_trip_earlier_than_aggressive() {
        let conservative = adjusted_thresholds(RiskTolerance::Conservative);
        let aggressive = adjusted_thresholds(RiskTolerance::Aggressive);
        let m = metrics(1.25, 1.25, 0.0, 3);

        assert_eq!(
            assessment_category(&m, &conservative),
            AssessmentCategory::HighAcwrRisk
        );
        assert_eq!(
            assessment_category(&m, &aggressive),
            AssessmentCategory::NormalProgression
        );
    }

    #[test]
    fn tone_blocks_cover_the_spectrum() {
        assert!(tone_instructions(10).contains("CASUAL"));
        assert!(tone_instructions(37).contains("SUPPORTIVE"));
        assert!(tone_instructions(62).contains("MOTIVATIONAL"));
        assert!(tone_instructions(90).contains("ANALYTICAL"));
        // Boundary values
        assert!(tone_instructions(25).contains("CASUAL"));
        assert!(tone_instructions(26).contains("SUPPORTIVE"));
    }

    #[test]
    fn autopsy_prompt_demands_alignment_score_opener() {
        let entry = JournalEntry {
            user_id: Uuid::new_v4(),
            date: chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            energy_level: Some(4),
            rpe_score: Some(6),
            pain_percentage: Some(0),
            notes: Some("felt strong".to_owned()),
            updated_at: Utc::now(),
        };
        let prompt = autopsy_prompt(
            "2025-05-01",
            "Easy 5 mile run",
            "Running - 5.1 miles",
            &entry,
            &metrics(1.0, 1.0, 0.0, 2),
            tone_instructions(50),
        );

        assert!(prompt.contains("ALIGNMENT_SCORE: [X/10]"));
        assert!(prompt.contains("Easy 5 mile run"));
        assert!(prompt.contains("Energy Level: 4/5"));
        assert!(prompt.contains("felt strong"));
    }

    #[test]
    fn recommendation_prompt_names_three_sections() {
        let flags = PatternFlags::default();
        let patterns = TrainingPatterns::insufficient();
        let m = metrics(1.0, 1.0, 0.0, 2);
        let thresholds = adjusted_thresholds(RiskTolerance::Balanced);
        let ctx = RecommendationContext {
            metrics: &m,
            flags: &flags,
            patterns: &patterns,
            activities_summary: "2025-05-01: Rest day",
            style: RiskTolerance::Balanced,
            thresholds: &thresholds,
            tone: tone_instructions(50),
            analysis_window: "2025-04-03 to 2025-05-01 (28 days)",
            current_date: "2025-05-01",
            insights: None,
        };

        let prompt = recommendation_prompt(&ctx);
        assert!(prompt.contains("**DAILY RECOMMENDATION:**"));
        assert!(prompt.contains("**WEEKLY PLANNING:**"));
        assert!(prompt.contains("**PATTERN INSIGHTS:**"));
        assert!(prompt.contains("normal_progression"));
        assert!(!prompt.contains("RECENT AUTOPSY LEARNING"));
    }

    #[test]
    fn recommendation_prompt_embeds_autopsy_learning_when_present() {
        let flags = PatternFlags::default();
        let patterns = TrainingPatterns::insufficient();
        let m = metrics(1.0, 1.0, 0.0, 2);
        let thresholds = adjusted_thresholds(RiskTolerance::Balanced);
        let insights = AutopsyInsights {
            count: 2,
            avg_alignment: 6.5,
            alignment_trend: vec![6, 7],
            latest_insight: Some("Athlete tolerates volume well".to_owned()),
        };
        let ctx = RecommendationContext {
            metrics: &m,
            flags: &flags,
            patterns: &patterns,
            activities_summary: "summary",
            style: RiskTolerance::Balanced,
            thresholds: &thresholds,
            tone: tone_instructions(50),
            analysis_window: "window",
            current_date: "2025-05-01",
            insights: Some(&insights),
        };

        let prompt = recommendation_prompt(&ctx);
        assert!(prompt.contains("RECENT AUTOPSY LEARNING (2 analyses)"));
        assert!(prompt.contains("6.5/10"));
        assert!(prompt.contains("improving"));
    }
}
