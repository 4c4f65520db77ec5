// ABOUTME: Activity table operations including idempotent inserts and aggregate writes
// ABOUTME: Handles rest-day coverage queries, window sums, and per-date aggregate updates

use super::Database;
use crate::models::{ActivityRecord, DailyAggregates, SportType, TrimpMethod};
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the `activities` table and its indexes
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_activities(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS activities (
                user_id TEXT NOT NULL,
                activity_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                name TEXT NOT NULL,
                sport_type TEXT NOT NULL,
                distance_miles REAL NOT NULL DEFAULT 0,
                elevation_gain_feet REAL NOT NULL DEFAULT 0,
                elevation_load_miles REAL NOT NULL DEFAULT 0,
                total_load_miles REAL NOT NULL DEFAULT 0,
                avg_heart_rate REAL NOT NULL DEFAULT 0,
                max_heart_rate REAL NOT NULL DEFAULT 0,
                duration_minutes REAL NOT NULL DEFAULT 0,
                trimp REAL NOT NULL DEFAULT 0,
                time_in_zone1 INTEGER NOT NULL DEFAULT 0,
                time_in_zone2 INTEGER NOT NULL DEFAULT 0,
                time_in_zone3 INTEGER NOT NULL DEFAULT 0,
                time_in_zone4 INTEGER NOT NULL DEFAULT 0,
                time_in_zone5 INTEGER NOT NULL DEFAULT 0,
                trimp_calculation_method TEXT NOT NULL DEFAULT 'average',
                hr_stream_sample_count INTEGER NOT NULL DEFAULT 0,
                trimp_processed_at DATETIME,
                seven_day_avg_load REAL,
                twentyeight_day_avg_load REAL,
                seven_day_avg_trimp REAL,
                twentyeight_day_avg_trimp REAL,
                acute_chronic_ratio REAL,
                trimp_acute_chronic_ratio REAL,
                normalized_divergence REAL,
                cycling_equivalent_miles REAL,
                swimming_equivalent_miles REAL,
                strength_equivalent_miles REAL,
                cycling_elevation_factor REAL,
                average_speed_mph REAL,
                notes TEXT,
                PRIMARY KEY (user_id, activity_id)
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_activities_user_date ON activities(user_id, date)",
        )
        .execute(self.pool())
        .await?;

        // Additive evolution: multisport columns arrived after the running-only schema
        self.add_column_if_missing("activities", "cycling_equivalent_miles", "REAL")
            .await?;
        self.add_column_if_missing("activities", "swimming_equivalent_miles", "REAL")
            .await?;
        self.add_column_if_missing("activities", "strength_equivalent_miles", "REAL")
            .await?;
        self.add_column_if_missing("activities", "cycling_elevation_factor", "REAL")
            .await?;
        self.add_column_if_missing("activities", "average_speed_mph", "REAL")
            .await?;
        self.add_column_if_missing("activities", "trimp_calculation_method", "TEXT NOT NULL DEFAULT 'average'")
            .await?;
        self.add_column_if_missing("activities", "hr_stream_sample_count", "INTEGER NOT NULL DEFAULT 0")
            .await?;
        self.add_column_if_missing("activities", "trimp_processed_at", "DATETIME")
            .await?;

        Ok(())
    }

    /// Whether (athlete, provider activity id) is already persisted
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn activity_exists(&self, user_id: Uuid, activity_id: i64) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM activities WHERE user_id = $1 AND activity_id = $2",
        )
        .bind(user_id.to_string())
        .bind(activity_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.is_some())
    }

    /// Whether any row (real or rest) exists for (athlete, date)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn has_row_for_date(&self, user_id: Uuid, date: NaiveDate) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM activities WHERE user_id = $1 AND date = $2 LIMIT 1")
            .bind(user_id.to_string())
            .bind(date)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.is_some())
    }

    /// Whether a real (positive-id) activity exists for (athlete, date)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn has_real_activity_for_date(&self, user_id: Uuid, date: NaiveDate) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM activities WHERE user_id = $1 AND date = $2 AND activity_id > 0 LIMIT 1",
        )
        .bind(user_id.to_string())
        .bind(date)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.is_some())
    }

    /// Insert an activity row. Returns `false` when the (athlete, activity)
    /// key already exists, which callers count as an idempotent skip.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than a unique-key violation
    pub async fn insert_activity(&self, activity: &ActivityRecord) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO activities (
                user_id, activity_id, date, name, sport_type,
                distance_miles, elevation_gain_feet, elevation_load_miles, total_load_miles,
                avg_heart_rate, max_heart_rate, duration_minutes, trimp,
                time_in_zone1, time_in_zone2, time_in_zone3, time_in_zone4, time_in_zone5,
                trimp_calculation_method, hr_stream_sample_count, trimp_processed_at,
                cycling_equivalent_miles, swimming_equivalent_miles, strength_equivalent_miles,
                cycling_elevation_factor, average_speed_mph, notes
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27
            )
            ",
        )
        .bind(activity.user_id.to_string())
        .bind(activity.activity_id)
        .bind(activity.date)
        .bind(&activity.name)
        .bind(activity.sport_type.as_str())
        .bind(activity.distance_miles)
        .bind(activity.elevation_gain_feet)
        .bind(activity.elevation_load_miles)
        .bind(activity.total_load_miles)
        .bind(activity.avg_heart_rate)
        .bind(activity.max_heart_rate)
        .bind(activity.duration_minutes)
        .bind(activity.trimp)
        .bind(activity.time_in_zone1)
        .bind(activity.time_in_zone2)
        .bind(activity.time_in_zone3)
        .bind(activity.time_in_zone4)
        .bind(activity.time_in_zone5)
        .bind(activity.trimp_calculation_method.as_str())
        .bind(activity.hr_stream_sample_count)
        .bind(activity.trimp_processed_at)
        .bind(activity.cycling_equivalent_miles)
        .bind(activity.swimming_equivalent_miles)
        .bind(activity.strength_equivalent_miles)
        .bind(activity.cycling_elevation_factor)
        .bind(activity.average_speed_mph)
        .bind(&activity.notes)
        .execute(self.pool())
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the synthetic rest-day row for (athlete, date), if present.
    /// Called when a real activity later appears for a backfilled date.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_rest_day(&self, user_id: Uuid, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM activities WHERE user_id = $1 AND date = $2 AND activity_id < 0",
        )
        .bind(user_id.to_string())
        .bind(date)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Summed external load and TRIMP over local dates `[start, end]`,
    /// missing days contributing zero
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn sum_load_between(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(f64, f64)> {
        let row = sqlx::query(
            r"
            SELECT COALESCE(SUM(total_load_miles), 0) AS load_sum,
                   COALESCE(SUM(trimp), 0) AS trimp_sum
            FROM activities
            WHERE user_id = $1 AND date BETWEEN $2 AND $3
            ",
        )
        .bind(user_id.to_string())
        .bind(start)
        .bind(end)
        .fetch_one(self.pool())
        .await?;

        Ok((row.try_get("load_sum")?, row.try_get("trimp_sum")?))
    }

    /// All activity rows for an athlete over local dates `[start, end]`,
    /// ascending by date
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn activities_between(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ActivityRecord>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM activities
            WHERE user_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date ASC, activity_id ASC
            ",
        )
        .bind(user_id.to_string())
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_activity).collect()
    }

    /// All rows for one (athlete, date)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn activities_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<ActivityRecord>> {
        self.activities_between(user_id, date, date).await
    }

    /// Write the rolling aggregates to every activity row of (athlete, date)
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_daily_aggregates(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        aggregates: &DailyAggregates,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE activities SET
                seven_day_avg_load = $3,
                twentyeight_day_avg_load = $4,
                seven_day_avg_trimp = $5,
                twentyeight_day_avg_trimp = $6,
                acute_chronic_ratio = $7,
                trimp_acute_chronic_ratio = $8,
                normalized_divergence = $9
            WHERE user_id = $1 AND date = $2
            ",
        )
        .bind(user_id.to_string())
        .bind(date)
        .bind(aggregates.seven_day_avg_load)
        .bind(aggregates.twentyeight_day_avg_load)
        .bind(aggregates.seven_day_avg_trimp)
        .bind(aggregates.twentyeight_day_avg_trimp)
        .bind(aggregates.acute_chronic_ratio)
        .bind(aggregates.trimp_acute_chronic_ratio)
        .bind(aggregates.normalized_divergence)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Most recent activity row carrying computed aggregates, the source of
    /// the current-metrics snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn latest_aggregated_activity(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ActivityRecord>> {
        let row = sqlx::query(
            r"
            SELECT * FROM activities
            WHERE user_id = $1 AND acute_chronic_ratio IS NOT NULL
            ORDER BY date DESC, activity_id DESC
            LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_activity).transpose()
    }

    /// Number of rows for an athlete (test and diagnostics helper)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn count_activities(&self, user_id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM activities WHERE user_id = $1")
            .bind(user_id.to_string())
            .fetch_one(self.pool())
            .await?;

        Ok(row.try_get("n")?)
    }
}

fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> Result<ActivityRecord> {
    let user_id: String = row.try_get("user_id")?;
    let sport: String = row.try_get("sport_type")?;
    let method: String = row.try_get("trimp_calculation_method")?;

    let seven_day_avg_load: Option<f64> = row.try_get("seven_day_avg_load")?;
    let aggregates = match seven_day_avg_load {
        Some(seven_load) => Some(DailyAggregates {
            seven_day_avg_load: seven_load,
            twentyeight_day_avg_load: row
                .try_get::<Option<f64>, _>("twentyeight_day_avg_load")?
                .unwrap_or(0.0),
            seven_day_avg_trimp: row
                .try_get::<Option<f64>, _>("seven_day_avg_trimp")?
                .unwrap_or(0.0),
            twentyeight_day_avg_trimp: row
                .try_get::<Option<f64>, _>("twentyeight_day_avg_trimp")?
                .unwrap_or(0.0),
            acute_chronic_ratio: row
                .try_get::<Option<f64>, _>("acute_chronic_ratio")?
                .unwrap_or(0.0),
            trimp_acute_chronic_ratio: row
                .try_get::<Option<f64>, _>("trimp_acute_chronic_ratio")?
                .unwrap_or(0.0),
            normalized_divergence: row
                .try_get::<Option<f64>, _>("normalized_divergence")?
                .unwrap_or(0.0),
        }),
        None => None,
    };

    Ok(ActivityRecord {
        user_id: uuid::Uuid::parse_str(&user_id)?,
        activity_id: row.try_get("activity_id")?,
        date: row.try_get("date")?,
        name: row.try_get("name")?,
        sport_type: SportType::from_db(&sport),
        distance_miles: row.try_get("distance_miles")?,
        elevation_gain_feet: row.try_get("elevation_gain_feet")?,
        elevation_load_miles: row.try_get("elevation_load_miles")?,
        total_load_miles: row.try_get("total_load_miles")?,
        avg_heart_rate: row.try_get("avg_heart_rate")?,
        max_heart_rate: row.try_get("max_heart_rate")?,
        duration_minutes: row.try_get("duration_minutes")?,
        trimp: row.try_get("trimp")?,
        time_in_zone1: row.try_get("time_in_zone1")?,
        time_in_zone2: row.try_get("time_in_zone2")?,
        time_in_zone3: row.try_get("time_in_zone3")?,
        time_in_zone4: row.try_get("time_in_zone4")?,
        time_in_zone5: row.try_get("time_in_zone5")?,
        trimp_calculation_method: TrimpMethod::from_db(&method),
        hr_stream_sample_count: row.try_get("hr_stream_sample_count")?,
        trimp_processed_at: row.try_get("trimp_processed_at")?,
        aggregates,
        cycling_equivalent_miles: row.try_get("cycling_equivalent_miles")?,
        swimming_equivalent_miles: row.try_get("swimming_equivalent_miles")?,
        strength_equivalent_miles: row.try_get("strength_equivalent_miles")?,
        cycling_elevation_factor: row.try_get("cycling_elevation_factor")?,
        average_speed_mph: row.try_get("average_speed_mph")?,
        notes: row.try_get("notes")?,
    })
}
