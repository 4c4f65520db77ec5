// ABOUTME: Activity ingestion pipeline pulling provider data into canonical load records
// ABOUTME: Handles classification, load computation, idempotent persistence, and rest-day coverage

//! # Activity Ingestion Pipeline
//!
//! For a given athlete and date window: pull activity summaries from the
//! provider, normalize each into a canonical load record, persist
//! idempotently, and backfill synthetic rest days so every strictly-past
//! local date has at least one row.
//!
//! Per-activity failures are isolated: logged, counted, and the batch
//! proceeds. Provider authentication failures abort the batch.

use crate::constants::{strava, units};
use crate::database::Database;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::intelligence::{load_model, trimp, zones};
use crate::models::{
    round2, timezones, ActivityRecord, HrStream, SportType, TrimpMethod, UserSettings,
};
use crate::providers::{ActivitySummary, FitnessProvider};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome counters for one ingestion run
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IngestReport {
    /// New activity rows persisted
    pub processed: usize,
    /// Summaries skipped because the activity was already stored
    pub skipped_existing: usize,
    /// Summaries skipped because the label is unsupported
    pub skipped_unsupported: usize,
    /// Summaries that failed and were isolated
    pub failed: usize,
    /// Synthetic rest days inserted for coverage
    pub rest_days_created: usize,
}

/// Activity ingestion pipeline over the shared database
pub struct IngestionPipeline {
    database: Arc<Database>,
    stream_fetch_pause: Duration,
}

impl IngestionPipeline {
    /// Create a pipeline with the production stream-fetch pacing
    #[must_use]
    pub fn new(database: Arc<Database>) -> Self {
        Self {
            database,
            stream_fetch_pause: Duration::from_secs(strava::STREAM_FETCH_PAUSE_SECS),
        }
    }

    /// Override the pause between per-activity stream fetches (tests)
    #[must_use]
    pub const fn with_stream_pause(mut self, pause: Duration) -> Self {
        self.stream_fetch_pause = pause;
        self
    }

    /// Ingest all provider activities for the athlete over local dates
    /// `[start, end]`, then backfill rest-day coverage for past dates.
    ///
    /// # Errors
    ///
    /// Returns an auth error when the provider rejects the token (the
    /// batch aborts); per-activity failures are counted, not raised.
    pub async fn process_window(
        &self,
        user: &UserSettings,
        provider: &dyn FitnessProvider,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<IngestReport> {
        info!(
            "Ingesting activities for user {} from {start} to {end}",
            user.id
        );

        // Expand the provider query by a day on each side to absorb
        // time-zone edges, then filter back to the athlete-local window
        let (after, before) = timezones::expanded_utc_window(user.tz(), start, end);
        let summaries = provider.list_activities(after, before).await?;

        debug!("Provider returned {} summaries", summaries.len());

        let mut report = IngestReport::default();

        for summary in summaries {
            let local_date = summary.local_date();
            if local_date < start || local_date > end {
                continue;
            }

            match self.process_one(user, provider, &summary, &mut report).await {
                Ok(()) => {}
                Err(e) if e.code == ErrorCode::AuthFailed => {
                    // Auth failures are batch-terminal; surface to the token manager
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "Failed to process activity {} for user {}: {e}",
                        summary.id, user.id
                    );
                    report.failed += 1;
                }
            }
        }

        report.rest_days_created = self.ensure_daily_records(user, start, end).await?;

        info!(
            "Ingest complete for user {}: {} new, {} existing, {} unsupported, {} failed, {} rest days",
            user.id,
            report.processed,
            report.skipped_existing,
            report.skipped_unsupported,
            report.failed,
            report.rest_days_created
        );

        Ok(report)
    }

    /// Process a single activity summary
    async fn process_one(
        &self,
        user: &UserSettings,
        provider: &dyn FitnessProvider,
        summary: &ActivitySummary,
        report: &mut IngestReport,
    ) -> AppResult<()> {
        let label = load_model::specific_label(summary);

        if !load_model::is_supported_label(&label) {
            info!(
                "Skipping unsupported activity {} ({label}) for user {}",
                summary.id, user.id
            );
            report.skipped_unsupported += 1;
            return Ok(());
        }

        if self
            .database
            .activity_exists(user.id, summary.id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
        {
            debug!("Activity {} already stored; skipping", summary.id);
            report.skipped_existing += 1;
            return Ok(());
        }

        let (record, stream) = self.build_record(user, provider, summary, &label).await?;

        let inserted = self.insert_with_retry(&record).await?;
        if !inserted {
            report.skipped_existing += 1;
            return Ok(());
        }

        // A real activity supersedes any synthetic rest day on its date
        if self
            .database
            .delete_rest_day(user.id, record.date)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
        {
            debug!("Replaced rest day on {} with activity {}", record.date, record.activity_id);
        }

        // The stream references the activity row; persist only after commit
        if let Some(stream) = stream {
            self.database
                .save_hr_stream(&stream)
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
        }

        report.processed += 1;
        Ok(())
    }

    /// Normalize a summary into the canonical activity record, fetching the
    /// heart-rate stream when one may exist
    async fn build_record(
        &self,
        user: &UserSettings,
        provider: &dyn FitnessProvider,
        summary: &ActivitySummary,
        label: &str,
    ) -> AppResult<(ActivityRecord, Option<HrStream>)> {
        let sport = load_model::classify_sport(label);

        let distance_miles = summary.distance_meters * units::METERS_TO_MILES;
        let elevation_gain_feet = summary.elevation_gain_meters * units::METERS_TO_FEET;
        let duration_minutes = summary.moving_time_seconds / 60.0;

        let average_speed_mph = if distance_miles > 0.0 && summary.moving_time_seconds > 0.0 {
            Some(round2(distance_miles / (summary.moving_time_seconds / 3600.0)))
        } else {
            None
        };

        let load = load_model::external_load(
            &sport,
            distance_miles,
            elevation_gain_feet,
            duration_minutes,
            average_speed_mph,
            label,
            None,
        );

        let avg_hr = summary.average_heartrate.unwrap_or(0.0);
        let max_hr = summary.max_heartrate.unwrap_or(0.0);

        // Streams feed both zone bucketing and enhanced TRIMP; skip the
        // fetch entirely when the activity carries no heart-rate data
        let samples = if avg_hr > 0.0 {
            let fetched = match provider.heart_rate_stream(summary.id).await {
                Ok(samples) => samples,
                Err(e) if e.is_transient() => {
                    warn!("Stream fetch failed transiently for {}: {e}", summary.id);
                    None
                }
                Err(e) => return Err(e),
            };
            tokio::time::sleep(self.stream_fetch_pause).await;
            fetched
        } else {
            None
        };

        let resting_hr = user.resting_hr as f64;
        let user_max_hr = user.max_hr as f64;

        let (trimp_value, trimp_method, sample_count) = if avg_hr > 0.0 && duration_minutes > 0.0 {
            match &samples {
                Some(stream_samples) if user.enhanced_trimp_enabled => {
                    let result = trimp::from_stream(
                        duration_minutes,
                        stream_samples,
                        resting_hr,
                        user_max_hr,
                        user.gender,
                    );
                    (result.value, result.method, result.sample_count as i64)
                }
                _ => (
                    trimp::from_average(
                        duration_minutes,
                        avg_hr,
                        resting_hr,
                        user_max_hr,
                        user.gender,
                    ),
                    TrimpMethod::Average,
                    0,
                ),
            }
        } else {
            (0.0, TrimpMethod::Average, 0)
        };

        let zone_times = match &samples {
            Some(stream_samples) => zones::from_stream(stream_samples, resting_hr, user_max_hr),
            None => zones::estimate_from_average(avg_hr, duration_minutes, resting_hr, user_max_hr),
        };

        let (cycling_equivalent, swimming_equivalent, strength_equivalent) = match sport {
            SportType::Cycling => (Some(load.equivalent_miles), None, None),
            SportType::Swimming => (None, Some(load.equivalent_miles), None),
            SportType::Strength => (None, None, Some(load.equivalent_miles)),
            _ => (None, None, None),
        };

        // Strength rows carry the equivalent distance so window arithmetic
        // sees comparable mileage
        let stored_distance = if sport == SportType::Strength {
            load.equivalent_miles
        } else {
            round2(distance_miles)
        };

        let record = ActivityRecord {
            user_id: user.id,
            activity_id: summary.id,
            date: summary.local_date(),
            name: summary.name.clone(),
            sport_type: sport,
            distance_miles: stored_distance,
            elevation_gain_feet: round2(elevation_gain_feet),
            elevation_load_miles: load.elevation_load_miles,
            total_load_miles: load.total_load_miles,
            avg_heart_rate: avg_hr,
            max_heart_rate: max_hr,
            duration_minutes: round2(duration_minutes),
            trimp: trimp_value,
            time_in_zone1: zone_times[0],
            time_in_zone2: zone_times[1],
            time_in_zone3: zone_times[2],
            time_in_zone4: zone_times[3],
            time_in_zone5: zone_times[4],
            trimp_calculation_method: trimp_method,
            hr_stream_sample_count: sample_count,
            trimp_processed_at: Some(Utc::now()),
            aggregates: None,
            cycling_equivalent_miles: cycling_equivalent,
            swimming_equivalent_miles: swimming_equivalent,
            strength_equivalent_miles: strength_equivalent,
            cycling_elevation_factor: load.cycling_elevation_factor,
            average_speed_mph,
            notes: None,
        };

        let stream = samples.map(|samples| HrStream {
            activity_id: summary.id,
            user_id: user.id,
            samples,
            sample_rate: 1.0,
        });

        Ok((record, stream))
    }

    /// Insert a row, retrying once after schema re-initialization to cover
    /// the first-boot path
    async fn insert_with_retry(&self, record: &ActivityRecord) -> AppResult<bool> {
        match self.database.insert_activity(record).await {
            Ok(inserted) => Ok(inserted),
            Err(first_error) => {
                warn!(
                    "Activity insert failed ({first_error}); re-initializing schema and retrying"
                );
                self.database
                    .migrate()
                    .await
                    .map_err(|e| AppError::database(e.to_string()))?;
                self.database
                    .insert_activity(record)
                    .await
                    .map_err(|e| AppError::database(e.to_string()))
            }
        }
    }

    /// Backfill a synthetic rest day for every date in `[start, end]` that
    /// is strictly in the past in the athlete's zone and has no row yet.
    /// Today and future dates are never backfilled: today's workout may
    /// still happen.
    ///
    /// # Errors
    ///
    /// Returns a database error when coverage reads or inserts fail
    pub async fn ensure_daily_records(
        &self,
        user: &UserSettings,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<usize> {
        let local_today = user.local_today();
        let mut created = 0_usize;
        let mut date = start;

        while date <= end {
            if date >= local_today {
                debug!(
                    "Skipping rest-day coverage for {date} (today or future in athlete zone)"
                );
                date += ChronoDuration::days(1);
                continue;
            }

            let covered = self
                .database
                .has_row_for_date(user.id, date)
                .await
                .map_err(|e| AppError::database(e.to_string()))?;

            if !covered {
                let rest_day = ActivityRecord::rest_day(user.id, date);
                let inserted = self
                    .database
                    .insert_activity(&rest_day)
                    .await
                    .map_err(|e| AppError::database(e.to_string()))?;
                if inserted {
                    debug!("Created rest day for user {} on {date}", user.id);
                    created += 1;
                }
            }

            date += ChronoDuration::days(1);
        }

        Ok(created)
    }
}
