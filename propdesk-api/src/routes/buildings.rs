//! Building endpoints
//!
//! - `GET    /v1/buildings`       list (filter: `city`)
//! - `POST   /v1/buildings`       create
//! - `GET    /v1/buildings/:id`   fetch
//! - `PATCH  /v1/buildings/:id`   update
//! - `DELETE /v1/buildings/:id`   delete (cascades to units)

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
        building::{Building, BuildingFilter, CreateBuilding, UpdateBuilding},
        Pagination,
    },
};
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_buildings).post(create_building))
        .route(
            "/:id",
            get(get_building).patch(update_building).delete(delete_building),
        )
}

pub async fn list_buildings(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(page): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<BuildingFilter>,
) -> ApiResult<ApiResponse<Vec<Building>>> {
    scope.require(ResourcePermission::Read)?;

    let buildings = Building::list(&state.db, scope.company_id(), &filter, page).await?;
    Ok(ApiResponse::ok(buildings))
}

pub async fn create_building(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<CreateBuilding>,
) -> ApiResult<ApiResponse<Building>> {
    scope.require(ResourcePermission::Write)?;

    let building = Building::create(&state.db, scope.company_id(), req).await?;

    tracing::info!(company_id = %scope.company_id(), building_id = %building.id, "Building created");

    Ok(ApiResponse::created(building))
}

pub async fn get_building(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Building>> {
    scope.require(ResourcePermission::Read)?;

    let building = Building::find(&state.db, scope.company_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Building"))?;

    Ok(ApiResponse::ok(building))
}

pub async fn update_building(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateBuilding>,
) -> ApiResult<ApiResponse<Building>> {
    scope.require(ResourcePermission::Write)?;

    let building = Building::update(&state.db, scope.company_id(), id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Building"))?;

    Ok(ApiResponse::ok(building))
}

pub async fn delete_building(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Delete)?;

    if !Building::delete(&state.db, scope.company_id(), id).await? {
        return Err(ApiError::not_found("Building"));
    }

    // Units went with the building
    state.dashboard_cache.invalidate(&scope.company_id()).await;

    tracing::info!(company_id = %scope.company_id(), building_id = %id, "Building deleted");

    Ok(Deleted::yes())
}
