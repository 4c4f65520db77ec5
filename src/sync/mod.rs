// ABOUTME: Sync orchestrator bridging external triggers to per-athlete pipelines
// ABOUTME: Runs user-initiated and scheduled fan-out syncs with per-athlete isolation

//! # Sync Orchestrator
//!
//! Bridges external triggers (user request or scheduler) to the per-athlete
//! pipeline: token manager -> ingestion -> aggregates. The scheduled fan-out
//! processes athletes concurrently under a bounded worker pool; within one
//! athlete all work is sequential so aggregates advance in ascending date
//! order. Per-athlete failures never fail the fan-out.

use crate::database::Database;
use crate::errors::{AppResult, ErrorCode};
use crate::ingest::{IngestReport, IngestionPipeline};
use crate::intelligence::aggregates::AcwrEngine;
use crate::models::UserSettings;
use crate::oauth::manager::TokenManager;
use crate::oauth::TokenStatus;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Per-athlete sync outcome
#[derive(Debug, Clone, Serialize)]
pub struct UserSyncResult {
    /// Athlete processed
    pub user_id: Uuid,
    /// Whether the pipeline completed
    pub success: bool,
    /// Ingestion counters when the pipeline ran
    pub report: Option<IngestReport>,
    /// Token status after the run
    pub token_status: Option<TokenStatus>,
    /// Failure description when `success` is false
    pub error: Option<String>,
}

/// Scheduled fan-out summary
#[derive(Debug, Clone, Serialize)]
pub struct FanOutSummary {
    /// Athletes attempted
    pub users_processed: usize,
    /// New activities persisted across all athletes
    pub total_activities: usize,
    /// Per-athlete outcomes
    pub per_user_results: Vec<UserSyncResult>,
}

/// Orchestrator over the shared engine components
pub struct SyncOrchestrator {
    database: Arc<Database>,
    token_manager: Arc<TokenManager>,
    ingestion: IngestionPipeline,
    acwr_engine: AcwrEngine,
    max_concurrency: usize,
}

impl SyncOrchestrator {
    /// Create an orchestrator over the shared components
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        token_manager: Arc<TokenManager>,
        max_concurrency: usize,
    ) -> Self {
        let ingestion = IngestionPipeline::new(Arc::clone(&database));
        let acwr_engine = AcwrEngine::new(Arc::clone(&database));
        Self {
            database,
            token_manager,
            ingestion,
            acwr_engine,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Run the full pipeline for one athlete over the trailing `days`-day
    /// window. Failures are captured in the result, never raised: a sync
    /// always yields a structured status.
    pub async fn sync_user(&self, user_id: Uuid, days: i64) -> UserSyncResult {
        match self.run_pipeline(user_id, days).await {
            Ok((report, token_status)) => UserSyncResult {
                user_id,
                success: true,
                report: Some(report),
                token_status: Some(token_status),
                error: None,
            },
            Err(e) => {
                let token_status = self.token_manager.token_status(user_id).await.ok();
                if e.code == ErrorCode::ReauthorizationRequired {
                    error!("Sync blocked for user {user_id}: re-authorization required");
                } else {
                    warn!("Sync failed for user {user_id}: {e}");
                }
                UserSyncResult {
                    user_id,
                    success: false,
                    report: None,
                    token_status,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Enumerate every athlete holding provider credentials and sync each
    /// under the bounded worker pool
    ///
    /// # Errors
    ///
    /// Returns a database error when the athlete enumeration itself fails;
    /// per-athlete failures are captured in the summary
    pub async fn sync_all(self: Arc<Self>, days: i64) -> AppResult<FanOutSummary> {
        let users = self
            .database
            .list_users_with_strava_tokens()
            .await
            .map_err(|e| crate::errors::AppError::database(e.to_string()))?;

        info!("Scheduled sync fan-out over {} athletes", users.len());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<UserSyncResult> = JoinSet::new();

        for user in users {
            let orchestrator = Arc::clone(&self);
            let permit_source = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = permit_source.acquire().await;
                orchestrator.sync_user(user.id, days).await
            });
        }

        let mut per_user_results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => per_user_results.push(result),
                Err(e) => error!("Sync worker panicked: {e}"),
            }
        }

        let total_activities = per_user_results
            .iter()
            .filter_map(|r| r.report.as_ref())
            .map(|r| r.processed)
            .sum();

        Ok(FanOutSummary {
            users_processed: per_user_results.len(),
            total_activities,
            per_user_results,
        })
    }

    /// The sequential per-athlete chain: client, ingest, aggregates
    async fn run_pipeline(
        &self,
        user_id: Uuid,
        days: i64,
    ) -> AppResult<(IngestReport, TokenStatus)> {
        let user = self.require_user(user_id).await?;

        // Token refresh result is persisted before the client is used
        let client = self.token_manager.authorized_client(user_id).await?;

        let end = user.local_date(Utc::now());
        let start = end - Duration::days(days.max(1) - 1);

        let report = self
            .ingestion
            .process_window(&user, &client, start, end)
            .await?;

        // Aggregates advance day by day in ascending order; each date's
        // write depends on prior rest-day inserts being present
        self.acwr_engine.update_window(&user, start, end).await?;

        let token_status = self.token_manager.token_status(user_id).await?;

        Ok((report, token_status))
    }

    async fn require_user(&self, user_id: Uuid) -> AppResult<UserSettings> {
        self.database
            .get_user(user_id)
            .await
            .map_err(|e| crate::errors::AppError::database(e.to_string()))?
            .ok_or_else(|| crate::errors::AppError::not_found(format!("user {user_id}")))
    }
}
