//! Unit endpoints
//!
//! Filters: `building_id`, `status`. Any write drops the company's cached
//! dashboard.

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
        unit::{CreateUnit, Unit, UnitFilter, UpdateUnit},
        Pagination,
    },
};
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_units).post(create_unit))
        .route("/:id", get(get_unit).patch(update_unit).delete(delete_unit))
}

pub async fn list_units(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(page): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<UnitFilter>,
) -> ApiResult<ApiResponse<Vec<Unit>>> {
    scope.require(ResourcePermission::Read)?;

    let units = Unit::list(&state.db, scope.company_id(), &filter, page).await?;
    Ok(ApiResponse::ok(units))
}

pub async fn create_unit(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<CreateUnit>,
) -> ApiResult<ApiResponse<Unit>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    ensure_reference(&state.db, "buildings", "Building", req.building_id, company_id).await?;

    let unit = Unit::create(&state.db, company_id, req).await?;
    state.dashboard_cache.invalidate(&company_id).await;

    tracing::info!(%company_id, unit_id = %unit.id, building_id = %unit.building_id, "Unit created");

    Ok(ApiResponse::created(unit))
}

pub async fn get_unit(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Unit>> {
    scope.require(ResourcePermission::Read)?;

    let unit = Unit::find(&state.db, scope.company_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Unit"))?;

    Ok(ApiResponse::ok(unit))
}

pub async fn update_unit(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateUnit>,
) -> ApiResult<ApiResponse<Unit>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    if let Some(building_id) = req.building_id {
        ensure_reference(&state.db, "buildings", "Building", building_id, company_id).await?;
    }

    let unit = Unit::update(&state.db, company_id, id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Unit"))?;
    state.dashboard_cache.invalidate(&company_id).await;

    Ok(ApiResponse::ok(unit))
}

pub async fn delete_unit(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Delete)?;
    let company_id = scope.company_id();

    if !Unit::delete(&state.db, company_id, id).await? {
        return Err(ApiError::not_found("Unit"));
    }
    state.dashboard_cache.invalidate(&company_id).await;

    tracing::info!(%company_id, unit_id = %id, "Unit deleted");

    Ok(Deleted::yes())
}
