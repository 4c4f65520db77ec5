// ABOUTME: Recommendation routes for athlete-initiated generation and retrieval
// ABOUTME: Maps pipeline unavailability to a default message keyed to the target date

//! Recommendation routes
//!
//! `POST /api/recommendations/generate` triggers generation for the next
//! applicable date (`target_tomorrow` forces tomorrow, the rest-day path).
//! When no recommendation can be produced the response carries a default
//! message keyed to the target date instead of an error.

use super::ServerResources;
use crate::errors::AppError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Request body for athlete-initiated generation
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Athlete requesting guidance
    pub user_id: Uuid,
    /// Regenerate even when the stored recommendation is current
    #[serde(default)]
    pub force: bool,
    /// Always target tomorrow (rest-day request)
    #[serde(default)]
    pub target_tomorrow: bool,
}

/// Recommendation routes implementation
pub struct RecommendationRoutes;

impl RecommendationRoutes {
    /// Create all recommendation routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/recommendations/generate", post(Self::handle_generate))
            .with_state(resources)
    }

    async fn handle_generate(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<GenerateRequest>,
    ) -> Result<Response, AppError> {
        let user = resources
            .database
            .get_user(request.user_id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| AppError::not_found(format!("user {}", request.user_id)))?;

        let target_date = if request.target_tomorrow {
            user.local_today() + Duration::days(1)
        } else {
            user.local_today()
        };

        match resources
            .recommendations
            .generate(&user, request.force, request.target_tomorrow)
            .await
        {
            Ok(Some(recommendation)) => {
                Ok((StatusCode::OK, Json(recommendation)).into_response())
            }
            Ok(None) => Ok(Self::default_response(target_date)),
            Err(e) => {
                warn!(
                    "Recommendation generation failed for user {}: {e}",
                    request.user_id
                );
                Ok(Self::default_response(target_date))
            }
        }
    }

    /// Default message keyed to the target date when generation is
    /// unavailable
    fn default_response(target_date: chrono::NaiveDate) -> Response {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "target_date": target_date,
                "daily_recommendation": format!(
                    "No recommendation is available for {target_date} yet. \
                     Sync recent activities and try again."
                ),
                "weekly_recommendation": "Maintain your current training approach until fresh guidance is generated.",
                "pattern_insights": "Insufficient data for pattern analysis.",
                "is_autopsy_informed": false,
            })),
        )
            .into_response()
    }
}
