// ABOUTME: Recommendation pipeline producing daily/weekly guidance and closing the autopsy loop
// ABOUTME: Handles target-date selection, freshness rules, LLM calls, and regeneration ordering

//! # Recommendation & Autopsy Pipeline
//!
//! Produces daily and weekly training guidance per athlete, grades
//! yesterday's guidance against reality when observations arrive, and
//! feeds that autopsy into the next generation. Target dates are selected
//! in the athlete's time zone: an athlete who already trained today gets
//! tomorrow's recommendation, otherwise today's.

pub mod autopsy;
pub mod parser;
pub mod patterns;
pub mod prompts;

use crate::constants::{llm as llm_constants, recommendations as rec_constants};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::intelligence::aggregates::AcwrEngine;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::models::{
    Autopsy, JournalEntry, MetricsSnapshot, Recommendation, UserSettings,
};
use autopsy::AutopsyInsights;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{info, warn};

/// Outcome of a journal save and its autopsy workflow
#[derive(Debug, Clone, Serialize)]
pub struct JournalOutcome {
    /// Whether an autopsy exists for the observed date after this save
    pub autopsy_generated: bool,
    /// Alignment score of that autopsy
    pub alignment_score: Option<i64>,
    /// Whether a recommendation was (re)generated downstream
    pub decision_updated: bool,
    /// Target date of the regenerated recommendation
    pub next_recommendation_date: Option<NaiveDate>,
}

/// Recommendation pipeline over the shared database and LLM provider
pub struct RecommendationPipeline {
    database: Arc<Database>,
    acwr_engine: AcwrEngine,
    llm: Arc<dyn LlmProvider>,
}

impl RecommendationPipeline {
    /// Create a pipeline over the shared database and LLM provider
    #[must_use]
    pub fn new(database: Arc<Database>, llm: Arc<dyn LlmProvider>) -> Self {
        let acwr_engine = AcwrEngine::new(Arc::clone(&database));
        Self {
            database,
            acwr_engine,
            llm,
        }
    }

    /// Current-metrics snapshot from the latest aggregated activity row
    ///
    /// # Errors
    ///
    /// Returns a database error when reads fail
    pub async fn current_metrics(&self, user: &UserSettings) -> AppResult<MetricsSnapshot> {
        let Some(latest) = self
            .database
            .latest_aggregated_activity(user.id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
        else {
            return Ok(MetricsSnapshot::default());
        };

        let window_start = latest.date - Duration::days(rec_constants::ACTIVITY_ANALYSIS_DAYS - 1);
        let history = self
            .database
            .activities_between(user.id, window_start, latest.date)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let Some(agg) = latest.aggregates else {
            return Ok(MetricsSnapshot::default());
        };

        Ok(MetricsSnapshot {
            external_acwr: agg.acute_chronic_ratio,
            internal_acwr: agg.trimp_acute_chronic_ratio,
            normalized_divergence: agg.normalized_divergence,
            seven_day_avg_load: agg.seven_day_avg_load,
            seven_day_avg_trimp: agg.seven_day_avg_trimp,
            twentyeight_day_avg_load: agg.twentyeight_day_avg_load,
            twentyeight_day_avg_trimp: agg.twentyeight_day_avg_trimp,
            days_since_rest: patterns::days_since_rest(&history),
            latest_activity_date: Some(latest.date),
        })
    }

    /// Generate (or no-op) the recommendation for the athlete's next
    /// applicable date.
    ///
    /// Returns `Ok(None)` when the athlete has no activity history to
    /// reason about.
    ///
    /// # Errors
    ///
    /// Returns LLM or database errors; the caller maps unavailability to a
    /// default message
    pub async fn generate(
        &self,
        user: &UserSettings,
        force: bool,
        target_tomorrow: bool,
    ) -> AppResult<Option<Recommendation>> {
        let today = user.local_today();

        let has_activity_today = self
            .database
            .has_real_activity_for_date(user.id, today)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        // A rest-day request always targets tomorrow; otherwise a completed
        // workout today pushes the target to tomorrow
        let target_date = if target_tomorrow || has_activity_today {
            today + Duration::days(1)
        } else {
            today
        };

        if !force {
            if let Some(existing) = self
                .database
                .get_recommendation_for_date(user.id, target_date)
                .await
                .map_err(|e| AppError::database(e.to_string()))?
            {
                let yesterday_autopsy = self
                    .database
                    .get_autopsy(user.id, today - Duration::days(1))
                    .await
                    .map_err(|e| AppError::database(e.to_string()))?;

                let newer_than_autopsy = yesterday_autopsy
                    .as_ref()
                    .map_or(true, |a| existing.generated_at > a.generated_at);

                if newer_than_autopsy {
                    info!(
                        "Recommendation for {target_date} already current for user {}; skipping",
                        user.id
                    );
                    return Ok(Some(existing));
                }
            }
        }

        self.generate_for_target(user, target_date, today)
            .await
            .map(Some)
    }

    /// Compose, call the LLM, parse, and persist the recommendation for
    /// `target_date` unconditionally.
    async fn generate_for_target(
        &self,
        user: &UserSettings,
        target_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<Recommendation> {
        // Fold any just-ingested activity into the metrics before composing
        let refresh_start = today - Duration::days(rec_constants::METRICS_REFRESH_DAYS - 1);
        self.acwr_engine
            .update_window(user, refresh_start, today)
            .await?;

        let window_start = today - Duration::days(rec_constants::ACTIVITY_ANALYSIS_DAYS - 1);
        let activities = self
            .database
            .activities_between(user.id, window_start, today)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        if activities.is_empty() {
            return Err(AppError::not_found(format!(
                "activity history for user {}",
                user.id
            )));
        }

        let metrics = self.current_metrics(user).await?;
        let thresholds = prompts::adjusted_thresholds(user.recommendation_style);
        let flags = patterns::analyze_pattern_flags(&activities, &thresholds);
        let training_patterns = patterns::analyze_training_patterns(&activities);
        let activities_summary = patterns::recent_activities_summary(&activities);
        let insights = self.recent_insights(user, today).await?;

        let analysis_window = format!(
            "{window_start} to {today} ({} days)",
            rec_constants::ACTIVITY_ANALYSIS_DAYS
        );
        let current_date = today.to_string();
        let tone = prompts::tone_instructions(user.coaching_spectrum());

        let ctx = prompts::RecommendationContext {
            metrics: &metrics,
            flags: &flags,
            patterns: &training_patterns,
            activities_summary: &activities_summary,
            style: user.recommendation_style,
            thresholds: &thresholds,
            tone,
            analysis_window: &analysis_window,
            current_date: &current_date,
            insights: insights.as_ref(),
        };
        let prompt = prompts::recommendation_prompt(&ctx);

        let request = ChatRequest::new(
            vec![ChatMessage::user(prompt)],
            llm_constants::RECOMMENDATION_TEMPERATURE,
            llm_constants::RECOMMENDATION_MAX_TOKENS,
            StdDuration::from_secs(llm_constants::RECOMMENDATION_TIMEOUT_SECS),
        );

        let response = self.llm.complete(&request).await?;
        let sections = parser::parse_recommendation(&response.content);

        let recommendation = Recommendation {
            user_id: user.id,
            generation_date: today,
            generated_at: Utc::now(),
            target_date,
            daily_recommendation: sections.daily_recommendation,
            weekly_recommendation: sections.weekly_recommendation,
            pattern_insights: sections.pattern_insights,
            raw_response: response.content,
            is_autopsy_informed: insights.is_some(),
            autopsy_count: insights.as_ref().map_or(0, |i| i.count),
            avg_alignment_score: insights.as_ref().map(|i| i.avg_alignment),
            metrics_snapshot: serde_json::to_value(&metrics)?,
        };

        self.database
            .save_recommendation(&recommendation)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        info!(
            "Saved recommendation for user {} targeting {target_date} \
             (autopsy informed: {})",
            user.id, recommendation.is_autopsy_informed
        );

        // Bounded history: prune rows past the retention window
        let cutoff = today - Duration::days(rec_constants::RETENTION_DAYS);
        if let Err(e) = self
            .database
            .prune_recommendations_before(user.id, cutoff)
            .await
        {
            warn!("Failed to prune old recommendations for user {}: {e}", user.id);
        }

        Ok(recommendation)
    }

    /// Save observations for a date and run the autopsy workflow: generate
    /// or reuse the autopsy, then regenerate today's recommendation when
    /// the autopsy postdates it (otherwise generate tomorrow's).
    ///
    /// # Errors
    ///
    /// Returns a validation error for out-of-range observations and
    /// database errors on persistence failures
    pub async fn save_observations(
        &self,
        user: &UserSettings,
        entry: &JournalEntry,
    ) -> AppResult<JournalOutcome> {
        entry.validate().map_err(AppError::out_of_range)?;

        self.database
            .upsert_journal_entry(entry)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let today = user.local_today();

        // Future dates cannot be graded
        if entry.date > today {
            return Ok(JournalOutcome {
                autopsy_generated: false,
                alignment_score: None,
                decision_updated: false,
                next_recommendation_date: None,
            });
        }

        let prescribed = self
            .database
            .get_recommendation_for_date(user.id, entry.date)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
            .map(|r| r.daily_recommendation);

        let day_activities = self
            .database
            .activities_for_date(user.id, entry.date)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        let has_real_activity = day_activities.iter().any(|a| !a.is_rest_day());

        let (Some(prescribed), true) = (prescribed, has_real_activity) else {
            info!(
                "No prescribed action or no real activity for user {} on {}; skipping autopsy",
                user.id, entry.date
            );
            return Ok(JournalOutcome {
                autopsy_generated: false,
                alignment_score: None,
                decision_updated: false,
                next_recommendation_date: None,
            });
        };

        let autopsy = match self
            .database
            .get_autopsy(user.id, entry.date)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
        {
            Some(existing) => {
                info!(
                    "Using existing autopsy for user {} on {} (alignment {}/10)",
                    user.id, entry.date, existing.alignment_score
                );
                existing
            }
            None => {
                let generated = self
                    .generate_autopsy(user, entry, &prescribed, &day_activities)
                    .await?;
                self.database
                    .upsert_autopsy(&generated)
                    .await
                    .map_err(|e| AppError::database(e.to_string()))?;
                generated
            }
        };

        // Feedback loop: an autopsy newer than today's recommendation means
        // today must be regenerated with the new learning; otherwise move on
        // to tomorrow
        let today_rec = self
            .database
            .get_recommendation_for_date(user.id, today)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let next_target = match today_rec {
            Some(rec) if rec.generated_at >= autopsy.generated_at => today + Duration::days(1),
            _ => today,
        };

        let regenerated = self.generate_for_target(user, next_target, today).await;
        let decision_updated = match regenerated {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    "Autopsy-informed regeneration failed for user {} targeting {next_target}: {e}",
                    user.id
                );
                false
            }
        };

        Ok(JournalOutcome {
            autopsy_generated: true,
            alignment_score: Some(autopsy.alignment_score),
            decision_updated,
            next_recommendation_date: decision_updated.then_some(next_target),
        })
    }

    /// Generate an autopsy via the LLM, falling back to the deterministic
    /// skeleton when the call fails
    async fn generate_autopsy(
        &self,
        user: &UserSettings,
        entry: &JournalEntry,
        prescribed: &str,
        day_activities: &[crate::models::ActivityRecord],
    ) -> AppResult<Autopsy> {
        let actual = autopsy::actual_activity_summary(day_activities);
        let metrics = self.current_metrics(user).await?;
        let tone = prompts::tone_instructions(user.coaching_spectrum());

        let prompt = prompts::autopsy_prompt(
            &entry.date.to_string(),
            prescribed,
            &actual,
            entry,
            &metrics,
            tone,
        );

        let request = ChatRequest::new(
            vec![ChatMessage::user(prompt)],
            llm_constants::AUTOPSY_TEMPERATURE,
            llm_constants::AUTOPSY_MAX_TOKENS,
            StdDuration::from_secs(llm_constants::AUTOPSY_TIMEOUT_SECS),
        );

        let (analysis, alignment_score) = match self.llm.complete(&request).await {
            Ok(response) => {
                let parsed = parser::parse_autopsy(&response.content);
                (parsed.analysis, parsed.alignment_score)
            }
            Err(e) => {
                warn!(
                    "Autopsy generation failed for user {} on {}: {e}; using fallback",
                    user.id, entry.date
                );
                autopsy::fallback_autopsy(prescribed, &actual, entry)
            }
        };

        // Prescribed text is excerpted for storage
        let prescribed_excerpt: String = prescribed.chars().take(500).collect();

        Ok(Autopsy {
            user_id: user.id,
            date: entry.date,
            prescribed_action: prescribed_excerpt,
            actual_activities: actual,
            autopsy_analysis: analysis,
            alignment_score,
            generated_at: Utc::now(),
        })
    }

    /// Autopsy insights over the configured lookback window
    async fn recent_insights(
        &self,
        user: &UserSettings,
        today: NaiveDate,
    ) -> AppResult<Option<AutopsyInsights>> {
        let since = today - Duration::days(rec_constants::AUTOPSY_INSIGHT_DAYS);
        let autopsies = self
            .database
            .recent_autopsies(user.id, since)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        Ok(AutopsyInsights::from_autopsies(&autopsies))
    }
}
