//! Contract endpoints
//!
//! Filters: `status`, `unit_id`, `tenant_id`.
//!
//! Unit occupancy follows the contract: creating or switching a contract to
//! `active` marks its unit occupied; terminating, expiring or deleting the
//! last active contract frees it. Each transition runs in one transaction.

use super::ensure_reference;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, CompanyScope, ValidJson},
    response::{ApiResponse, Deleted},
};
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use propdesk_shared::{
    auth::authorization::ResourcePermission,
    models::{
        contract::{Contract, ContractFilter, CreateContract, UpdateContract},
        unit::{Unit, UnitStatus},
        Pagination,
    },
};
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts).post(create_contract))
        .route(
            "/:id",
            get(get_contract).patch(update_contract).delete(delete_contract),
        )
        .route("/:id/terminate", post(terminate_contract))
}

pub async fn list_contracts(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(page): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<ContractFilter>,
) -> ApiResult<ApiResponse<Vec<Contract>>> {
    scope.require(ResourcePermission::Read)?;

    let contracts = Contract::list(&state.db, scope.company_id(), &filter, page).await?;
    Ok(ApiResponse::ok(contracts))
}

pub async fn create_contract(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<CreateContract>,
) -> ApiResult<ApiResponse<Contract>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    ensure_reference(&state.db, "units", "Unit", req.unit_id, company_id).await?;
    ensure_reference(&state.db, "tenants", "Tenant", req.tenant_id, company_id).await?;

    let mut tx = state.db.begin().await?;

    let contract = Contract::create(&mut *tx, company_id, req).await?;
    if contract.is_active() {
        Unit::set_status(&mut *tx, company_id, contract.unit_id, UnitStatus::Occupied).await?;
    }

    tx.commit().await?;
    state.dashboard_cache.invalidate(&company_id).await;

    tracing::info!(
        %company_id,
        contract_id = %contract.id,
        unit_id = %contract.unit_id,
        status = contract.status.as_str(),
        "Contract created"
    );

    Ok(ApiResponse::created(contract))
}

pub async fn get_contract(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Contract>> {
    scope.require(ResourcePermission::Read)?;

    let contract = Contract::find(&state.db, scope.company_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contract"))?;

    Ok(ApiResponse::ok(contract))
}

pub async fn update_contract(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateContract>,
) -> ApiResult<ApiResponse<Contract>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    let mut tx = state.db.begin().await?;

    let before = Contract::find(&mut *tx, company_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contract"))?;

    if let Some(to) = req.status {
        if before.status.is_closed() && to != before.status {
            return Err(ApiError::Conflict(format!("Contract is already {}", before.status.as_str())));
        }
    }

    let contract = Contract::update(&mut *tx, company_id, id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Contract"))?;

    match (before.is_active(), contract.is_active()) {
        (false, true) => {
            Unit::set_status(&mut *tx, company_id, contract.unit_id, UnitStatus::Occupied).await?;
        }
        (true, false) => {
            Unit::release_if_vacant(&mut *tx, company_id, contract.unit_id).await?;
        }
        _ => {}
    }

    tx.commit().await?;
    state.dashboard_cache.invalidate(&company_id).await;

    Ok(ApiResponse::ok(contract))
}

/// `POST /v1/contracts/:id/terminate`
///
/// Terminates a draft or active contract and frees its unit. Terminating a
/// closed contract answers 409.
pub async fn terminate_contract(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Contract>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    let mut tx = state.db.begin().await?;

    let Some(contract) = Contract::terminate(&mut *tx, company_id, id).await? else {
        let existing = Contract::find(&mut *tx, company_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Contract"))?;
        return Err(ApiError::Conflict(format!("Contract is already {}", existing.status.as_str())));
    };

    Unit::release_if_vacant(&mut *tx, company_id, contract.unit_id).await?;

    tx.commit().await?;
    state.dashboard_cache.invalidate(&company_id).await;

    tracing::info!(%company_id, contract_id = %id, unit_id = %contract.unit_id, "Contract terminated");

    Ok(ApiResponse::ok(contract))
}

pub async fn delete_contract(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Delete)?;
    let company_id = scope.company_id();

    let mut tx = state.db.begin().await?;

    let contract = Contract::find(&mut *tx, company_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contract"))?;

    Contract::delete(&mut *tx, company_id, id).await?;

    if contract.is_active() {
        Unit::release_if_vacant(&mut *tx, company_id, contract.unit_id).await?;
    }

    tx.commit().await?;
    state.dashboard_cache.invalidate(&company_id).await;

    tracing::info!(%company_id, contract_id = %id, "Contract deleted");

    Ok(Deleted::yes())
}
