//! Health check endpoint
//!
//! ```text
//! GET /health
//! ```
//!
//! ```json
//! {
//!   "success": true,
//!   "data": {
//!     "status": "healthy",
//!     "version": "0.1.0",
//!     "database": "connected",
//!     "migrations": { "applied_migrations": 3, "latest_version": 3, "is_up_to_date": true },
//!     "pool": { "active_connections": 1, "idle_connections": 4, "total_connections": 5 }
//!   }
//! }
//! ```
//!
//! Responds `503` with `"status": "degraded"` when the database is unreachable.

use crate::{app::AppState, response::ApiResponse};
use axum::{extract::State, http::StatusCode};
use propdesk_shared::db::{
    migrations::{get_migration_status, MigrationStatus},
    pool::{get_pool_stats, health_check as db_health_check, PoolStats},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: &'static str,

    pub version: &'static str,

    /// `connected` or `disconnected`
    pub database: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations: Option<MigrationStatus>,

    pub pool: PoolStats,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let connected = match db_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    let migrations = if connected {
        get_migration_status(&state.db).await.ok()
    } else {
        None
    };

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    ApiResponse::with_status(
        status,
        HealthResponse {
            status: if connected { "healthy" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            database: if connected { "connected" } else { "disconnected" },
            migrations,
            pool: get_pool_stats(&state.db),
        },
    )
}
