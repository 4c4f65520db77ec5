// ABOUTME: Athlete settings database operations including provider token storage
// ABOUTME: Handles user rows, HR parameters, coaching preferences, and Strava credentials

use super::Database;
use crate::models::{AcwrSettings, Gender, RiskTolerance, StravaToken, UserSettings};
use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the `user_settings` table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_users(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_settings (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                resting_hr INTEGER NOT NULL DEFAULT 60,
                max_hr INTEGER NOT NULL DEFAULT 180,
                gender TEXT NOT NULL DEFAULT 'male',
                recommendation_style TEXT NOT NULL DEFAULT 'balanced'
                    CHECK (recommendation_style IN ('conservative', 'balanced', 'adaptive', 'aggressive')),
                coaching_style_spectrum INTEGER,
                coaching_tone TEXT,
                timezone TEXT NOT NULL DEFAULT 'UTC',
                strava_access_token TEXT,
                strava_refresh_token TEXT,
                strava_token_expires_at INTEGER,
                strava_athlete_id INTEGER,
                acwr_chronic_period_days INTEGER NOT NULL DEFAULT 28,
                acwr_decay_rate REAL NOT NULL DEFAULT 0.05,
                acwr_enhanced_enabled BOOLEAN NOT NULL DEFAULT 0,
                enhanced_trimp_enabled BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_user_settings_email ON user_settings(email)")
            .execute(self.pool())
            .await?;

        // Additive evolution for rows created before the enhanced engines landed
        self.add_column_if_missing("user_settings", "acwr_chronic_period_days", "INTEGER NOT NULL DEFAULT 28")
            .await?;
        self.add_column_if_missing("user_settings", "acwr_decay_rate", "REAL NOT NULL DEFAULT 0.05")
            .await?;
        self.add_column_if_missing("user_settings", "acwr_enhanced_enabled", "BOOLEAN NOT NULL DEFAULT 0")
            .await?;
        self.add_column_if_missing("user_settings", "enhanced_trimp_enabled", "BOOLEAN NOT NULL DEFAULT 0")
            .await?;

        Ok(())
    }

    /// Create a new athlete row
    ///
    /// # Errors
    ///
    /// Returns an error if the email is already in use or the insert fails
    pub async fn create_user(&self, user: &UserSettings) -> Result<Uuid> {
        if let Some(existing) = self.get_user_by_email(&user.email).await? {
            if existing.id != user.id {
                return Err(anyhow!("Email already in use by another user"));
            }
        }

        let (access, refresh, expires) = user.strava_token.as_ref().map_or(
            (None, None, None),
            |token| {
                (
                    Some(token.access_token.as_str()),
                    Some(token.refresh_token.as_str()),
                    Some(token.expires_at.timestamp()),
                )
            },
        );

        sqlx::query(
            r"
            INSERT INTO user_settings (
                id, email, password_hash, resting_hr, max_hr, gender,
                recommendation_style, coaching_style_spectrum, coaching_tone,
                timezone, strava_access_token, strava_refresh_token,
                strava_token_expires_at, strava_athlete_id,
                acwr_chronic_period_days, acwr_decay_rate, acwr_enhanced_enabled,
                enhanced_trimp_enabled, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                password_hash = excluded.password_hash,
                resting_hr = excluded.resting_hr,
                max_hr = excluded.max_hr,
                gender = excluded.gender,
                recommendation_style = excluded.recommendation_style,
                coaching_style_spectrum = excluded.coaching_style_spectrum,
                coaching_tone = excluded.coaching_tone,
                timezone = excluded.timezone,
                acwr_chronic_period_days = excluded.acwr_chronic_period_days,
                acwr_decay_rate = excluded.acwr_decay_rate,
                acwr_enhanced_enabled = excluded.acwr_enhanced_enabled,
                enhanced_trimp_enabled = excluded.enhanced_trimp_enabled
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.resting_hr)
        .bind(user.max_hr)
        .bind(user.gender.as_str())
        .bind(user.recommendation_style.as_str())
        .bind(user.coaching_style_spectrum)
        .bind(&user.coaching_tone)
        .bind(&user.timezone)
        .bind(access)
        .bind(refresh)
        .bind(expires)
        .bind(user.strava_athlete_id)
        .bind(user.acwr.chronic_period_days)
        .bind(user.acwr.decay_rate)
        .bind(user.acwr.enhanced_enabled)
        .bind(user.enhanced_trimp_enabled)
        .bind(user.created_at)
        .execute(self.pool())
        .await?;

        Ok(user.id)
    }

    /// Fetch an athlete by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<UserSettings>> {
        let row = sqlx::query("SELECT * FROM user_settings WHERE id = $1")
            .bind(user_id.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Fetch an athlete by email
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserSettings>> {
        let row = sqlx::query("SELECT * FROM user_settings WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// All athletes holding a Strava refresh token, the scheduled-sync fan-out set
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or row decoding fails
    pub async fn list_users_with_strava_tokens(&self) -> Result<Vec<UserSettings>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM user_settings
            WHERE strava_refresh_token IS NOT NULL AND strava_refresh_token != ''
            ORDER BY created_at
            ",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    /// Persist a new Strava token triple for an athlete. The write is a
    /// single statement, so downstream readers never observe a partial
    /// triple.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_strava_token(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
        athlete_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE user_settings SET
                strava_access_token = $2,
                strava_refresh_token = $3,
                strava_token_expires_at = $4,
                strava_athlete_id = COALESCE($5, strava_athlete_id)
            WHERE id = $1
            ",
        )
        .bind(user_id.to_string())
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at.timestamp())
        .bind(athlete_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Remove an athlete's Strava credentials
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn clear_strava_token(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r"
            UPDATE user_settings SET
                strava_access_token = NULL,
                strava_refresh_token = NULL,
                strava_token_expires_at = NULL
            WHERE id = $1
            ",
        )
        .bind(user_id.to_string())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Update an athlete's enhanced-ACWR configuration (values sanitized)
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_acwr_settings(&self, user_id: Uuid, settings: AcwrSettings) -> Result<()> {
        let settings = settings.sanitized();
        sqlx::query(
            r"
            UPDATE user_settings SET
                acwr_chronic_period_days = $2,
                acwr_decay_rate = $3,
                acwr_enhanced_enabled = $4
            WHERE id = $1
            ",
        )
        .bind(user_id.to_string())
        .bind(settings.chronic_period_days)
        .bind(settings.decay_rate)
        .bind(settings.enhanced_enabled)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<UserSettings> {
    let id: String = row.try_get("id")?;
    let access: Option<String> = row.try_get("strava_access_token")?;
    let refresh: Option<String> = row.try_get("strava_refresh_token")?;
    let expires: Option<i64> = row.try_get("strava_token_expires_at")?;

    let strava_token = match (access, refresh, expires) {
        (Some(access_token), Some(refresh_token), Some(ts)) => Some(StravaToken {
            access_token,
            refresh_token,
            expires_at: Utc
                .timestamp_opt(ts, 0)
                .single()
                .ok_or_else(|| anyhow!("invalid token expiry timestamp {ts}"))?,
        }),
        _ => None,
    };

    let gender: String = row.try_get("gender")?;
    let style: String = row.try_get("recommendation_style")?;

    Ok(UserSettings {
        id: Uuid::parse_str(&id)?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        resting_hr: row.try_get("resting_hr")?,
        max_hr: row.try_get("max_hr")?,
        gender: Gender::from_db(&gender),
        recommendation_style: RiskTolerance::from_db(&style),
        coaching_style_spectrum: row.try_get("coaching_style_spectrum")?,
        coaching_tone: row.try_get("coaching_tone")?,
        timezone: row.try_get("timezone")?,
        strava_token,
        strava_athlete_id: row.try_get("strava_athlete_id")?,
        acwr: AcwrSettings {
            chronic_period_days: row.try_get("acwr_chronic_period_days")?,
            decay_rate: row.try_get("acwr_decay_rate")?,
            enhanced_enabled: row.try_get("acwr_enhanced_enabled")?,
        }
        .sanitized(),
        enhanced_trimp_enabled: row.try_get("enhanced_trimp_enabled")?,
        created_at: row.try_get("created_at")?,
    })
}
