// ABOUTME: Rolling acute/chronic aggregate engine writing per-date ACWR fields
// ABOUTME: Dispatches to the exponentially-decayed variant with fallback to the standard form

//! # Rolling Aggregates & ACWR Engine
//!
//! For a given (athlete, date) computes the acute (7-day) and chronic
//! (28-day) load and TRIMP averages plus the derived ratios, and writes
//! them back to every activity row for that date. Missing days count as
//! zero, which is why ingestion backfills rest days for past dates.
//!
//! Dates in a multi-day window must be processed in ascending order: each
//! date's write depends on prior rest-day inserts being present. Running
//! the update twice for the same date produces identical output.

use super::decay::{self, ActivityData};
use crate::constants::windows;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{round2, round3, DailyAggregates, UserSettings};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Normalized divergence between the external and internal ACWR:
/// `(ext - int) / ((ext + int) / 2)`, zero when both ratios are zero
#[must_use]
pub fn normalized_divergence(external: f64, internal: f64) -> f64 {
    let mean = (external + internal) / 2.0;
    if mean == 0.0 {
        return 0.0;
    }
    round3((external - internal) / mean)
}

/// Rolling-aggregate engine over the shared database
pub struct AcwrEngine {
    database: Arc<Database>,
}

impl AcwrEngine {
    /// Create an engine over the shared database
    #[must_use]
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Recompute and persist aggregates for one (athlete, date), selecting
    /// the enhanced engine when the athlete is flagged for it. Any failure
    /// in the enhanced path falls back to the standard computation.
    ///
    /// # Errors
    ///
    /// Returns a database error when reads or the final write fail
    pub async fn update_for_date(
        &self,
        user: &UserSettings,
        date: NaiveDate,
    ) -> AppResult<DailyAggregates> {
        if user.acwr.enhanced_enabled {
            match self.enhanced_for_date(user, date).await {
                Ok(Some(aggregates)) => {
                    self.write(user.id, date, &aggregates).await?;
                    return Ok(aggregates);
                }
                Ok(None) => {
                    debug!(
                        "Enhanced ACWR returned an edge case for user {} on {date}; \
                         using standard calculation",
                        user.id
                    );
                }
                Err(e) => {
                    warn!(
                        "Enhanced ACWR failed for user {} on {date}: {e}; \
                         falling back to standard calculation",
                        user.id
                    );
                }
            }
        }

        let aggregates = self.standard_for_date(user.id, date).await?;
        self.write(user.id, date, &aggregates).await?;
        Ok(aggregates)
    }

    /// Recompute aggregates for every date in `[start, end]` in ascending
    /// order
    ///
    /// # Errors
    ///
    /// Returns the first per-date error encountered
    pub async fn update_window(
        &self,
        user: &UserSettings,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<()> {
        let mut date = start;
        while date <= end {
            self.update_for_date(user, date).await?;
            date += Duration::days(1);
        }
        Ok(())
    }

    /// Standard time-based aggregation: window sums divided by fixed window
    /// lengths, missing days counting as zero
    async fn standard_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<DailyAggregates> {
        let acute_start = date - Duration::days(windows::ACUTE_DAYS - 1);
        let chronic_start = date - Duration::days(windows::CHRONIC_DAYS - 1);

        let (acute_load_sum, acute_trimp_sum) = self
            .database
            .sum_load_between(user_id, acute_start, date)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        let (chronic_load_sum, chronic_trimp_sum) = self
            .database
            .sum_load_between(user_id, chronic_start, date)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let seven_day_avg_load = round2(acute_load_sum / windows::ACUTE_DAYS as f64);
        let twentyeight_day_avg_load = round2(chronic_load_sum / windows::CHRONIC_DAYS as f64);
        let seven_day_avg_trimp = round2(acute_trimp_sum / windows::ACUTE_DAYS as f64);
        let twentyeight_day_avg_trimp = round2(chronic_trimp_sum / windows::CHRONIC_DAYS as f64);

        let acute_chronic_ratio = if twentyeight_day_avg_load > 0.0 {
            round2(seven_day_avg_load / twentyeight_day_avg_load)
        } else {
            0.0
        };
        let trimp_acute_chronic_ratio = if twentyeight_day_avg_trimp > 0.0 {
            round2(seven_day_avg_trimp / twentyeight_day_avg_trimp)
        } else {
            0.0
        };

        Ok(DailyAggregates {
            seven_day_avg_load,
            twentyeight_day_avg_load,
            seven_day_avg_trimp,
            twentyeight_day_avg_trimp,
            acute_chronic_ratio,
            trimp_acute_chronic_ratio,
            normalized_divergence: normalized_divergence(
                acute_chronic_ratio,
                trimp_acute_chronic_ratio,
            ),
        })
    }

    /// Enhanced aggregation for athletes flagged into the decayed engine.
    /// Returns `Ok(None)` when the engine reports a structured edge case,
    /// which the caller resolves via the standard computation.
    ///
    /// The chronic average lands in the fixed `twentyeight_day_*` columns
    /// regardless of the configured window length; readers consult the
    /// athlete's ACWR settings for the semantic window.
    async fn enhanced_for_date(
        &self,
        user: &UserSettings,
        date: NaiveDate,
    ) -> AppResult<Option<DailyAggregates>> {
        let settings = user.acwr.sanitized();
        let acute_start = date - Duration::days(windows::ACUTE_DAYS - 1);
        let chronic_start = date - Duration::days(settings.chronic_period_days - 1);

        let acute = self.activity_data(user.id, acute_start, date).await?;
        let chronic = self.activity_data(user.id, chronic_start, date).await?;

        let result = decay::enhanced_acwr(
            &acute,
            &chronic,
            settings.decay_rate,
            settings.chronic_period_days,
            date,
        );

        if let Some(case) = result.edge_case {
            debug!(
                "Enhanced ACWR edge case {} for user {} on {date}",
                case.as_str(),
                user.id
            );
            return Ok(None);
        }

        Ok(Some(DailyAggregates {
            seven_day_avg_load: round2(result.acute_load_avg),
            twentyeight_day_avg_load: round2(result.chronic_load_avg),
            seven_day_avg_trimp: round2(result.acute_trimp_avg),
            twentyeight_day_avg_trimp: round2(result.chronic_trimp_avg),
            acute_chronic_ratio: round2(result.acute_chronic_ratio),
            trimp_acute_chronic_ratio: round2(result.trimp_acute_chronic_ratio),
            normalized_divergence: result.normalized_divergence,
        }))
    }

    async fn activity_data(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<ActivityData>> {
        let rows = self
            .database
            .activities_between(user_id, start, end)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| ActivityData {
                date: row.date,
                total_load_miles: row.total_load_miles,
                trimp: row.trimp,
            })
            .collect())
    }

    async fn write(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        aggregates: &DailyAggregates,
    ) -> AppResult<()> {
        self.database
            .update_daily_aggregates(user_id, date, aggregates)
            .await
            .map_err(|e| AppError::database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divergence_is_zero_when_both_ratios_are_zero() {
        assert_eq!(normalized_divergence(0.0, 0.0), 0.0);
    }

    #[test]
    fn divergence_is_positive_when_external_leads() {
        // (1.2 - 0.8) / 1.0 = 0.4
        assert!((normalized_divergence(1.2, 0.8) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn divergence_is_negative_when_internal_leads() {
        assert!(normalized_divergence(0.9, 1.3) < 0.0);
    }

    #[test]
    fn divergence_of_equal_ratios_is_zero() {
        assert_eq!(normalized_divergence(1.1, 1.1), 0.0);
    }
}
