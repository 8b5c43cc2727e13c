//! `GET /v1/dashboard`
//!
//! Summary of the active company's portfolio, served from the read-through
//! cache when a fresh entry exists. Concurrent misses share one load.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::CompanyScope,
    response::ApiResponse,
};
use axum::extract::State;
use chrono::Utc;
use std::sync::Arc;
use propdesk_shared::{
    analytics::{summarize, DashboardSummary},
    auth::authorization::ResourcePermission,
    models::{contract::Contract, maintenance::MaintenanceRequest, payment::Payment, unit::Unit},
};

pub async fn get_dashboard(
    State(state): State<AppState>,
    scope: CompanyScope,
) -> ApiResult<ApiResponse<DashboardSummary>> {
    scope.require(ResourcePermission::Read)?;
    let company_id = scope.company_id();
    let db = &state.db;

    let summary = state
        .dashboard_cache
        .get_or_try_insert_with(company_id, || async move {
            let units = Unit::all_for_company(db, company_id).await?;
            let contracts = Contract::all_for_company(db, company_id).await?;
            let payments = Payment::all_for_company(db, company_id).await?;
            let maintenance = MaintenanceRequest::open_for_company(db, company_id).await?;

            let summary = summarize(&units, &contracts, &payments, &maintenance, Utc::now().date_naive());

            tracing::debug!(
                %company_id,
                units = units.len(),
                contracts = contracts.len(),
                payments = payments.len(),
                "Dashboard summary computed"
            );

            Ok::<_, ApiError>(summary)
        })
        .await
        .map_err(|err| Arc::try_unwrap(err).unwrap_or_else(|shared| ApiError::InternalError(shared.to_string())))?;

    Ok(ApiResponse::ok(summary.as_ref().clone()))
}
