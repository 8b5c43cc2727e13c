//! CRM lead endpoints under `/v1/crm/leads`
//!
//! Filters: `stage`, `assigned_to`. A lead can only be assigned to a member
//! of the company.

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
        crm::{CreateLead, CrmLead, LeadFilter, UpdateLead},
        membership::Membership,
        Pagination,
    },
};
use sqlx::PgPool;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/leads", get(list_leads).post(create_lead))
        .route(
            "/leads/:id",
            get(get_lead).patch(update_lead).delete(delete_lead),
        )
}

async fn ensure_member(db: &PgPool, company_id: Uuid, user_id: Uuid) -> ApiResult<()> {
    if Membership::get_role(db, company_id, user_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!("User {user_id} is not a member of this company")));
    }
    Ok(())
}

pub async fn list_leads(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(page): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<LeadFilter>,
) -> ApiResult<ApiResponse<Vec<CrmLead>>> {
    scope.require(ResourcePermission::Read)?;

    let leads = CrmLead::list(&state.db, scope.company_id(), &filter, page).await?;
    Ok(ApiResponse::ok(leads))
}

pub async fn create_lead(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<CreateLead>,
) -> ApiResult<ApiResponse<CrmLead>> {
    scope.require(ResourcePermission::Write)?;

    if let Some(user_id) = req.assigned_to {
        ensure_member(&state.db, scope.company_id(), user_id).await?;
    }

    let lead = CrmLead::create(&state.db, scope.company_id(), req).await?;

    tracing::info!(company_id = %scope.company_id(), lead_id = %lead.id, stage = lead.stage.as_str(), "Lead created");

    Ok(ApiResponse::created(lead))
}

pub async fn get_lead(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<CrmLead>> {
    scope.require(ResourcePermission::Read)?;

    let lead = CrmLead::find(&state.db, scope.company_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lead"))?;

    Ok(ApiResponse::ok(lead))
}

pub async fn update_lead(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateLead>,
) -> ApiResult<ApiResponse<CrmLead>> {
    scope.require(ResourcePermission::Write)?;

    if let Some(user_id) = req.assigned_to {
        ensure_member(&state.db, scope.company_id(), user_id).await?;
    }

    let lead = CrmLead::update(&state.db, scope.company_id(), id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Lead"))?;

    Ok(ApiResponse::ok(lead))
}

pub async fn delete_lead(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Delete)?;

    if !CrmLead::delete(&state.db, scope.company_id(), id).await? {
        return Err(ApiError::not_found("Lead"));
    }

    Ok(Deleted::yes())
}
