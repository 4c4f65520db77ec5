// ABOUTME: Journal routes saving daily observations and triggering the autopsy workflow
// ABOUTME: Validates observation ranges before any persistence happens

//! Journal routes
//!
//! `POST /api/journal` saves the athlete's observations for a date
//! (energy 1-5, RPE 1-10, pain percentage in 20% steps, notes) and runs
//! the autopsy workflow for completed days.

use super::ServerResources;
use crate::errors::AppError;
use crate::models::JournalEntry;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Request body for a journal save
#[derive(Debug, Deserialize)]
pub struct JournalRequest {
    /// Athlete recording observations
    pub user_id: Uuid,
    /// Observed date
    pub date: NaiveDate,
    /// Pre-session energy, 1-5
    pub energy_level: Option<i64>,
    /// Rate of perceived exertion, 1-10
    pub rpe_score: Option<i64>,
    /// Pain percentage, one of 0/20/40/60/80/100
    pub pain_percentage: Option<i64>,
    /// Free-text notes
    pub notes: Option<String>,
}

/// Journal routes implementation
pub struct JournalRoutes;

impl JournalRoutes {
    /// Create all journal routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/journal", post(Self::handle_save))
            .with_state(resources)
    }

    async fn handle_save(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<JournalRequest>,
    ) -> Result<Response, AppError> {
        let user = resources
            .database
            .get_user(request.user_id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| AppError::not_found(format!("user {}", request.user_id)))?;

        let entry = JournalEntry {
            user_id: request.user_id,
            date: request.date,
            energy_level: request.energy_level,
            rpe_score: request.rpe_score,
            pain_percentage: request.pain_percentage,
            notes: request.notes,
            updated_at: Utc::now(),
        };

        let outcome = resources
            .recommendations
            .save_observations(&user, &entry)
            .await?;

        Ok((StatusCode::OK, Json(outcome)).into_response())
    }
}
