//! Maintenance request endpoints
//!
//! Filters: `status`, `priority`, `unit_id`.

use super::ensure_reference;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, CompanyScope, ValidJson},
    response::{ApiResponse, Deleted},
};
use axum::{extract::State, routing::get, Router};
use propdesk_shared::{
    auth::authorization::ResourcePermission,
    models::{
        maintenance::{CreateMaintenance, MaintenanceFilter, MaintenanceRequest, UpdateMaintenance},
        Pagination,
    },
};
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route(
            "/:id",
            get(get_request).patch(update_request).delete(delete_request),
        )
}

pub async fn list_requests(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(page): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<MaintenanceFilter>,
) -> ApiResult<ApiResponse<Vec<MaintenanceRequest>>> {
    scope.require(ResourcePermission::Read)?;

    let requests = MaintenanceRequest::list(&state.db, scope.company_id(), &filter, page).await?;
    Ok(ApiResponse::ok(requests))
}

pub async fn create_request(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<CreateMaintenance>,
) -> ApiResult<ApiResponse<MaintenanceRequest>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    ensure_reference(&state.db, "units", "Unit", req.unit_id, company_id).await?;

    let request = MaintenanceRequest::create(&state.db, company_id, scope.user_id, req).await?;
    state.dashboard_cache.invalidate(&company_id).await;

    tracing::info!(
        %company_id,
        request_id = %request.id,
        priority = request.priority.as_str(),
        "Maintenance request opened"
    );

    Ok(ApiResponse::created(request))
}

pub async fn get_request(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<MaintenanceRequest>> {
    scope.require(ResourcePermission::Read)?;

    let request = MaintenanceRequest::find(&state.db, scope.company_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Maintenance request"))?;

    Ok(ApiResponse::ok(request))
}

pub async fn update_request(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateMaintenance>,
) -> ApiResult<ApiResponse<MaintenanceRequest>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    let request = MaintenanceRequest::update(&state.db, company_id, id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Maintenance request"))?;
    state.dashboard_cache.invalidate(&company_id).await;

    Ok(ApiResponse::ok(request))
}

pub async fn delete_request(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Delete)?;
    let company_id = scope.company_id();

    if !MaintenanceRequest::delete(&state.db, company_id, id).await? {
        return Err(ApiError::not_found("Maintenance request"));
    }
    state.dashboard_cache.invalidate(&company_id).await;

    Ok(Deleted::yes())
}
