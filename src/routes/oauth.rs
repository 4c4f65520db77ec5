// ABOUTME: Provider OAuth routes for authorization, callback, and token status
// ABOUTME: Thin handlers delegating the flow to the token manager

//! Provider OAuth routes
//!
//! `GET /api/oauth/authorize` issues the authorization URL with a CSRF
//! state; `GET /api/oauth/callback` exchanges the code and persists the
//! token triple; `GET /api/token-status` reports the structured token
//! state.

use super::ServerResources;
use crate::errors::AppError;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Query for authorization URL generation and token status
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    /// Athlete initiating the flow
    pub user_id: Uuid,
}

/// Query received on the provider callback
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange
    pub code: String,
    /// CSRF state issued at authorization time
    pub state: String,
}

/// OAuth routes implementation
pub struct OAuthRoutes;

impl OAuthRoutes {
    /// Create all OAuth routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/oauth/authorize", get(Self::handle_authorize))
            .route("/api/oauth/callback", get(Self::handle_callback))
            .route("/api/token-status", get(Self::handle_token_status))
            .with_state(resources)
    }

    async fn handle_authorize(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UserQuery>,
    ) -> Result<Response, AppError> {
        let response = resources
            .token_manager
            .generate_auth_url(query.user_id)
            .await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn handle_callback(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<CallbackQuery>,
    ) -> Result<Response, AppError> {
        let response = resources
            .token_manager
            .handle_callback(&query.code, &query.state)
            .await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn handle_token_status(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UserQuery>,
    ) -> Result<Response, AppError> {
        let status = resources.token_manager.token_status(query.user_id).await?;
        Ok((StatusCode::OK, Json(status)).into_response())
    }
}
