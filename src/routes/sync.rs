// ABOUTME: Sync trigger routes for user-initiated and scheduled ingestion runs
// ABOUTME: Scheduled fan-out is gated by the X-Cloudscheduler identifying header

//! Sync trigger routes
//!
//! `POST /api/sync` runs the pipeline for one athlete; `POST
//! /api/sync/scheduled` fans out over every connected athlete and requires
//! the `X-Cloudscheduler: true` header (401 without it).

use super::ServerResources;
use crate::errors::AppError;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Request body for user-initiated sync
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    /// Athlete to sync
    pub user_id: Uuid,
    /// Day window; the configured default applies when omitted
    pub days: Option<i64>,
}

/// Sync routes implementation
pub struct SyncRoutes;

impl SyncRoutes {
    /// Create all sync routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/sync", post(Self::handle_user_sync))
            .route("/api/sync/scheduled", post(Self::handle_scheduled_sync))
            .with_state(resources)
    }

    /// Handle a user-initiated sync for one athlete
    async fn handle_user_sync(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<SyncRequest>,
    ) -> Result<Response, AppError> {
        let days = request
            .days
            .unwrap_or(resources.config.sync_default_days)
            .clamp(1, 90);

        let result = resources.orchestrator.sync_user(request.user_id, days).await;

        // Failures surface in the structured status, not as HTTP errors;
        // no partial data is hidden
        Ok((StatusCode::OK, Json(result)).into_response())
    }

    /// Handle the scheduled fan-out; requires the scheduler header
    async fn handle_scheduled_sync(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let is_scheduler = headers
            .get("X-Cloudscheduler")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        if !is_scheduler {
            return Ok((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "scheduled sync requires the X-Cloudscheduler header"
                })),
            )
                .into_response());
        }

        let summary = Arc::clone(&resources.orchestrator)
            .sync_all(resources.config.sync_default_days)
            .await?;

        Ok((StatusCode::OK, Json(summary)).into_response())
    }
}
