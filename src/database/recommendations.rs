// ABOUTME: Recommendation row storage keyed by (athlete, target date)
// ABOUTME: Enforces single-row-per-target-date semantics and retention pruning

use super::Database;
use crate::models::Recommendation;
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the `llm_recommendations` table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_recommendations(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS llm_recommendations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                generation_date TEXT NOT NULL,
                generated_at DATETIME NOT NULL,
                target_date TEXT NOT NULL,
                daily_recommendation TEXT NOT NULL,
                weekly_recommendation TEXT NOT NULL,
                pattern_insights TEXT NOT NULL,
                raw_response TEXT NOT NULL,
                is_autopsy_informed BOOLEAN NOT NULL DEFAULT 0,
                autopsy_count INTEGER NOT NULL DEFAULT 0,
                avg_alignment_score REAL,
                metrics_snapshot TEXT NOT NULL DEFAULT '{}',
                UNIQUE(user_id, target_date)
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_recommendations_user_target ON llm_recommendations(user_id, target_date)",
        )
        .execute(self.pool())
        .await?;

        self.add_column_if_missing("llm_recommendations", "is_autopsy_informed", "BOOLEAN NOT NULL DEFAULT 0")
            .await?;
        self.add_column_if_missing("llm_recommendations", "autopsy_count", "INTEGER NOT NULL DEFAULT 0")
            .await?;
        self.add_column_if_missing("llm_recommendations", "avg_alignment_score", "REAL")
            .await?;

        Ok(())
    }

    /// Insert or overwrite the recommendation for (athlete, target date).
    /// The caller decides whether an overwrite is allowed; the database
    /// simply guarantees a single row per target date.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the upsert fails
    pub async fn save_recommendation(&self, rec: &Recommendation) -> Result<()> {
        let snapshot = serde_json::to_string(&rec.metrics_snapshot)?;

        sqlx::query(
            r"
            INSERT INTO llm_recommendations (
                user_id, generation_date, generated_at, target_date,
                daily_recommendation, weekly_recommendation, pattern_insights,
                raw_response, is_autopsy_informed, autopsy_count,
                avg_alignment_score, metrics_snapshot
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT(user_id, target_date) DO UPDATE SET
                generation_date = excluded.generation_date,
                generated_at = excluded.generated_at,
                daily_recommendation = excluded.daily_recommendation,
                weekly_recommendation = excluded.weekly_recommendation,
                pattern_insights = excluded.pattern_insights,
                raw_response = excluded.raw_response,
                is_autopsy_informed = excluded.is_autopsy_informed,
                autopsy_count = excluded.autopsy_count,
                avg_alignment_score = excluded.avg_alignment_score,
                metrics_snapshot = excluded.metrics_snapshot
            ",
        )
        .bind(rec.user_id.to_string())
        .bind(rec.generation_date)
        .bind(rec.generated_at)
        .bind(rec.target_date)
        .bind(&rec.daily_recommendation)
        .bind(&rec.weekly_recommendation)
        .bind(&rec.pattern_insights)
        .bind(&rec.raw_response)
        .bind(rec.is_autopsy_informed)
        .bind(rec.autopsy_count)
        .bind(rec.avg_alignment_score)
        .bind(snapshot)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Fetch the recommendation whose target date is `target_date`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn get_recommendation_for_date(
        &self,
        user_id: Uuid,
        target_date: NaiveDate,
    ) -> Result<Option<Recommendation>> {
        let row = sqlx::query(
            "SELECT * FROM llm_recommendations WHERE user_id = $1 AND target_date = $2",
        )
        .bind(user_id.to_string())
        .bind(target_date)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_recommendation).transpose()
    }

    /// Fetch the newest recommendation by target date
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn latest_recommendation(&self, user_id: Uuid) -> Result<Option<Recommendation>> {
        let row = sqlx::query(
            "SELECT * FROM llm_recommendations WHERE user_id = $1 ORDER BY target_date DESC LIMIT 1",
        )
        .bind(user_id.to_string())
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_recommendation).transpose()
    }

    /// Delete recommendation rows whose target date predates `cutoff`
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn prune_recommendations_before(
        &self,
        user_id: Uuid,
        cutoff: NaiveDate,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM llm_recommendations WHERE user_id = $1 AND target_date < $2",
        )
        .bind(user_id.to_string())
        .bind(cutoff)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }
}

fn row_to_recommendation(row: &sqlx::sqlite::SqliteRow) -> Result<Recommendation> {
    let user_id: String = row.try_get("user_id")?;
    let snapshot: String = row.try_get("metrics_snapshot")?;

    Ok(Recommendation {
        user_id: Uuid::parse_str(&user_id)?,
        generation_date: row.try_get("generation_date")?,
        generated_at: row.try_get("generated_at")?,
        target_date: row.try_get("target_date")?,
        daily_recommendation: row.try_get("daily_recommendation")?,
        weekly_recommendation: row.try_get("weekly_recommendation")?,
        pattern_insights: row.try_get("pattern_insights")?,
        raw_response: row.try_get("raw_response")?,
        is_autopsy_informed: row.try_get("is_autopsy_informed")?,
        autopsy_count: row.try_get("autopsy_count")?,
        avg_alignment_score: row.try_get("avg_alignment_score")?,
        metrics_snapshot: serde_json::from_str(&snapshot).unwrap_or(serde_json::Value::Null),
    })
}
