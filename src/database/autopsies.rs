// ABOUTME: Autopsy and journal-entry storage, each unique per (athlete, date)
// ABOUTME: Journal saves feed the autopsy workflow; autopsies feed the next recommendation

use super::Database;
use crate::models::{Autopsy, JournalEntry};
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the `ai_autopsies` table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_autopsies(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ai_autopsies (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                prescribed_action TEXT NOT NULL,
                actual_activities TEXT NOT NULL,
                autopsy_analysis TEXT NOT NULL,
                alignment_score INTEGER NOT NULL,
                generated_at DATETIME NOT NULL,
                PRIMARY KEY (user_id, date)
            )
            ",
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Create the `journal_entries` table
    ///
    /// # Errors
    ///
    /// Returns an error if table creation fails
    pub(super) async fn migrate_journal_entries(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS journal_entries (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                energy_level INTEGER,
                rpe_score INTEGER,
                pain_percentage INTEGER,
                notes TEXT,
                updated_at DATETIME NOT NULL,
                PRIMARY KEY (user_id, date)
            )
            ",
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Insert or regenerate the autopsy for (athlete, date)
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails
    pub async fn upsert_autopsy(&self, autopsy: &Autopsy) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO ai_autopsies (
                user_id, date, prescribed_action, actual_activities,
                autopsy_analysis, alignment_score, generated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(user_id, date) DO UPDATE SET
                prescribed_action = excluded.prescribed_action,
                actual_activities = excluded.actual_activities,
                autopsy_analysis = excluded.autopsy_analysis,
                alignment_score = excluded.alignment_score,
                generated_at = excluded.generated_at
            ",
        )
        .bind(autopsy.user_id.to_string())
        .bind(autopsy.date)
        .bind(&autopsy.prescribed_action)
        .bind(&autopsy.actual_activities)
        .bind(&autopsy.autopsy_analysis)
        .bind(autopsy.alignment_score)
        .bind(autopsy.generated_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Fetch the autopsy for (athlete, date)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn get_autopsy(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<Autopsy>> {
        let row = sqlx::query("SELECT * FROM ai_autopsies WHERE user_id = $1 AND date = $2")
            .bind(user_id.to_string())
            .bind(date)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(row_to_autopsy).transpose()
    }

    /// Autopsies dated on or after `since`, newest first (bounded to five,
    /// matching the insight lookback)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn recent_autopsies(&self, user_id: Uuid, since: NaiveDate) -> Result<Vec<Autopsy>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM ai_autopsies
            WHERE user_id = $1 AND date >= $2
            ORDER BY date DESC
            LIMIT 5
            ",
        )
        .bind(user_id.to_string())
        .bind(since)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_autopsy).collect()
    }

    /// Insert or update the journal entry for (athlete, date)
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails
    pub async fn upsert_journal_entry(&self, entry: &JournalEntry) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO journal_entries (
                user_id, date, energy_level, rpe_score, pain_percentage, notes, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(user_id, date) DO UPDATE SET
                energy_level = excluded.energy_level,
                rpe_score = excluded.rpe_score,
                pain_percentage = excluded.pain_percentage,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            ",
        )
        .bind(entry.user_id.to_string())
        .bind(entry.date)
        .bind(entry.energy_level)
        .bind(entry.rpe_score)
        .bind(entry.pain_percentage)
        .bind(&entry.notes)
        .bind(entry.updated_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Fetch the journal entry for (athlete, date)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn get_journal_entry(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<JournalEntry>> {
        let row = sqlx::query("SELECT * FROM journal_entries WHERE user_id = $1 AND date = $2")
            .bind(user_id.to_string())
            .bind(date)
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| {
            let user: String = r.try_get("user_id")?;
            Ok(JournalEntry {
                user_id: Uuid::parse_str(&user)?,
                date: r.try_get("date")?,
                energy_level: r.try_get("energy_level")?,
                rpe_score: r.try_get("rpe_score")?,
                pain_percentage: r.try_get("pain_percentage")?,
                notes: r.try_get("notes")?,
                updated_at: r.try_get("updated_at")?,
            })
        })
        .transpose()
    }
}

fn row_to_autopsy(row: &sqlx::sqlite::SqliteRow) -> Result<Autopsy> {
    let user_id: String = row.try_get("user_id")?;

    Ok(Autopsy {
        user_id: Uuid::parse_str(&user_id)?,
        date: row.try_get("date")?,
        prescribed_action: row.try_get("prescribed_action")?,
        actual_activities: row.try_get("actual_activities")?,
        autopsy_analysis: row.try_get("autopsy_analysis")?,
        alignment_score: row.try_get("alignment_score")?,
        generated_at: row.try_get("generated_at")?,
    })
}
