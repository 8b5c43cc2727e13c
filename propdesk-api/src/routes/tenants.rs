//! Tenant (renter) endpoints
//!
//! Filter: `search` on name or email.

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
        tenant::{CreateTenant, Tenant, TenantFilter, UpdateTenant},
        Pagination,
    },
};
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tenants).post(create_tenant))
        .route("/:id", get(get_tenant).patch(update_tenant).delete(delete_tenant))
}

pub async fn list_tenants(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(page): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<TenantFilter>,
) -> ApiResult<ApiResponse<Vec<Tenant>>> {
    scope.require(ResourcePermission::Read)?;

    let tenants = Tenant::list(&state.db, scope.company_id(), &filter, page).await?;
    Ok(ApiResponse::ok(tenants))
}

pub async fn create_tenant(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<CreateTenant>,
) -> ApiResult<ApiResponse<Tenant>> {
    scope.require(ResourcePermission::Write)?;

    let tenant = Tenant::create(&state.db, scope.company_id(), req).await?;

    tracing::info!(company_id = %scope.company_id(), tenant_id = %tenant.id, "Tenant created");

    Ok(ApiResponse::created(tenant))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Tenant>> {
    scope.require(ResourcePermission::Read)?;

    let tenant = Tenant::find(&state.db, scope.company_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant"))?;

    Ok(ApiResponse::ok(tenant))
}

pub async fn update_tenant(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateTenant>,
) -> ApiResult<ApiResponse<Tenant>> {
    scope.require(ResourcePermission::Write)?;

    let tenant = Tenant::update(&state.db, scope.company_id(), id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant"))?;

    Ok(ApiResponse::ok(tenant))
}

pub async fn delete_tenant(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Delete)?;

    if !Tenant::delete(&state.db, scope.company_id(), id).await? {
        return Err(ApiError::not_found("Tenant"));
    }

    tracing::info!(company_id = %scope.company_id(), tenant_id = %id, "Tenant deleted");

    Ok(Deleted::yes())
}
