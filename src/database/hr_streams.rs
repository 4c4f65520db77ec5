// ABOUTME: Heart-rate stream storage keyed to activities
// ABOUTME: Streams are written only after their parent activity row commits

use super::Database;
use crate::models::HrStream;
use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the `hr_streams` table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_hr_streams(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS hr_streams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                activity_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                hr_data TEXT NOT NULL,
                sample_rate REAL NOT NULL DEFAULT 1.0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, activity_id),
                FOREIGN KEY (user_id, activity_id)
                    REFERENCES activities(user_id, activity_id) ON DELETE CASCADE
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_hr_streams_activity ON hr_streams(user_id, activity_id)",
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Persist a heart-rate stream for an already-committed activity row
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the insert fails
    pub async fn save_hr_stream(&self, stream: &HrStream) -> Result<()> {
        let hr_data = serde_json::to_string(&stream.samples)?;

        sqlx::query(
            r"
            INSERT INTO hr_streams (activity_id, user_id, hr_data, sample_rate)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(user_id, activity_id) DO UPDATE SET
                hr_data = excluded.hr_data,
                sample_rate = excluded.sample_rate,
                updated_at = CURRENT_TIMESTAMP
            ",
        )
        .bind(stream.activity_id)
        .bind(stream.user_id.to_string())
        .bind(hr_data)
        .bind(stream.sample_rate)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Load the heart-rate stream for an activity, if one was captured
    ///
    /// # Errors
    ///
    /// Returns an error if the query or JSON decoding fails
    pub async fn get_hr_stream(
        &self,
        user_id: Uuid,
        activity_id: i64,
    ) -> Result<Option<HrStream>> {
        let row = sqlx::query(
            "SELECT hr_data, sample_rate FROM hr_streams WHERE user_id = $1 AND activity_id = $2",
        )
        .bind(user_id.to_string())
        .bind(activity_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| {
            let hr_data: String = r.try_get("hr_data")?;
            let samples: Vec<f64> = serde_json::from_str(&hr_data)?;
            Ok(HrStream {
                activity_id,
                user_id,
                samples,
                sample_rate: r.try_get("sample_rate")?,
            })
        })
        .transpose()
    }
}
