// ABOUTME: HTTP route groups for the operational surface of the training engine
// ABOUTME: Wires sync triggers, OAuth flows, journal saves, and health checks into one router

//! # HTTP Routes
//!
//! The operational surface of the engine: sync triggers (user-initiated
//! and scheduled), the provider OAuth flow, journal/observation saves,
//! athlete-initiated recommendation generation, token status, and health.
//! Dashboard and session concerns live outside this crate.

pub mod health;
pub mod journal;
pub mod oauth;
pub mod recommendations;
pub mod sync;

use crate::config::ServerConfig;
use crate::database::Database;
use crate::oauth::manager::TokenManager;
use crate::recommendations::RecommendationPipeline;
use crate::sync::SyncOrchestrator;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every route group
pub struct ServerResources {
    /// Shared database handle
    pub database: Arc<Database>,
    /// Provider token manager
    pub token_manager: Arc<TokenManager>,
    /// Sync orchestrator
    pub orchestrator: Arc<SyncOrchestrator>,
    /// Recommendation pipeline
    pub recommendations: Arc<RecommendationPipeline>,
    /// Server configuration
    pub config: ServerConfig,
}

/// Assemble the full application router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(health::HealthRoutes::routes())
        .merge(sync::SyncRoutes::routes(Arc::clone(&resources)))
        .merge(oauth::OAuthRoutes::routes(Arc::clone(&resources)))
        .merge(journal::JournalRoutes::routes(Arc::clone(&resources)))
        .merge(recommendations::RecommendationRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
}
