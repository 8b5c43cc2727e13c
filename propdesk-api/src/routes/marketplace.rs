//! Marketplace endpoints
//!
//! - `/v1/marketplace/services` CRUD (filters: `category`, `active`)
//! - `/v1/marketplace/bookings` CRUD (filters: `status`, `service_id`)
//! - `GET /v1/marketplace/commissions?from=YYYY-MM-DD&to=YYYY-MM-DD`
//!
//! A booking copies the service's commission rate when it is created, and
//! its amount defaults to the service's base price.

use super::ensure_reference;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, CompanyScope, ValidJson},
    response::{ApiResponse, Deleted},
};
use axum::{extract::State, routing::get, Router};
use chrono::NaiveDate;
use propdesk_shared::{
    analytics::commission::{self, CommissionReport},
    auth::authorization::ResourcePermission,
    models::{
        marketplace::{
            BookingFilter, CreateBooking, CreateService, MarketplaceBooking, MarketplaceService, ServiceFilter,
            UpdateBooking, UpdateService,
        },
        Pagination,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services).post(create_service))
        .route(
            "/services/:id",
            get(get_service).patch(update_service).delete(delete_service),
        )
        .route("/bookings", get(list_bookings).post(create_booking))
        .route(
            "/bookings/:id",
            get(get_booking).patch(update_booking).delete(delete_booking),
        )
        .route("/commissions", get(get_commissions))
}

pub async fn list_services(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(page): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<ServiceFilter>,
) -> ApiResult<ApiResponse<Vec<MarketplaceService>>> {
    scope.require(ResourcePermission::Read)?;

    let services = MarketplaceService::list(&state.db, scope.company_id(), &filter, page).await?;
    Ok(ApiResponse::ok(services))
}

pub async fn create_service(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<CreateService>,
) -> ApiResult<ApiResponse<MarketplaceService>> {
    scope.require(ResourcePermission::Write)?;

    let service = MarketplaceService::create(&state.db, scope.company_id(), req).await?;

    tracing::info!(
        company_id = %scope.company_id(),
        service_id = %service.id,
        category = %service.category,
        "Marketplace service created"
    );

    Ok(ApiResponse::created(service))
}

pub async fn get_service(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<MarketplaceService>> {
    scope.require(ResourcePermission::Read)?;

    let service = MarketplaceService::find(&state.db, scope.company_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service"))?;

    Ok(ApiResponse::ok(service))
}

pub async fn update_service(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateService>,
) -> ApiResult<ApiResponse<MarketplaceService>> {
    scope.require(ResourcePermission::Write)?;

    let service = MarketplaceService::update(&state.db, scope.company_id(), id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Service"))?;

    Ok(ApiResponse::ok(service))
}

pub async fn delete_service(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Delete)?;

    if !MarketplaceService::delete(&state.db, scope.company_id(), id).await? {
        return Err(ApiError::not_found("Service"));
    }

    Ok(Deleted::yes())
}

pub async fn list_bookings(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(page): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<BookingFilter>,
) -> ApiResult<ApiResponse<Vec<MarketplaceBooking>>> {
    scope.require(ResourcePermission::Read)?;

    let bookings = MarketplaceBooking::list(&state.db, scope.company_id(), &filter, page).await?;
    Ok(ApiResponse::ok(bookings))
}

pub async fn create_booking(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<CreateBooking>,
) -> ApiResult<ApiResponse<MarketplaceBooking>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    let service = MarketplaceService::find(&state.db, company_id, req.service_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Service {} does not exist in this company", req.service_id)))?;

    if !service.active {
        return Err(ApiError::BadRequest(format!("Service {} is not active", service.id)));
    }

    if let Some(tenant_id) = req.tenant_id {
        ensure_reference(&state.db, "tenants", "Tenant", tenant_id, company_id).await?;
    }

    let booking = MarketplaceBooking::create(&state.db, company_id, &service, req).await?;

    tracing::info!(
        %company_id,
        booking_id = %booking.id,
        service_id = %service.id,
        amount = %booking.amount,
        commission_rate = %booking.commission_rate,
        "Booking created"
    );

    Ok(ApiResponse::created(booking))
}

pub async fn get_booking(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<MarketplaceBooking>> {
    scope.require(ResourcePermission::Read)?;

    let booking = MarketplaceBooking::find(&state.db, scope.company_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    Ok(ApiResponse::ok(booking))
}

pub async fn update_booking(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateBooking>,
) -> ApiResult<ApiResponse<MarketplaceBooking>> {
    scope.require(ResourcePermission::Write)?;

    let booking = MarketplaceBooking::update(&state.db, scope.company_id(), id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    Ok(ApiResponse::ok(booking))
}

pub async fn delete_booking(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Delete)?;

    if !MarketplaceBooking::delete(&state.db, scope.company_id(), id).await? {
        return Err(ApiError::not_found("Booking"));
    }

    Ok(Deleted::yes())
}

/// Inclusive date range of the commission report; both ends optional
#[derive(Debug, Default, Deserialize)]
pub struct CommissionQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CommissionResponse {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(flatten)]
    pub report: CommissionReport,
}

pub async fn get_commissions(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(range): ApiQuery<CommissionQuery>,
) -> ApiResult<ApiResponse<CommissionResponse>> {
    scope.require(ResourcePermission::Read)?;

    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(ApiError::BadRequest("`from` must not be after `to`".to_string()));
        }
    }

    let lines = MarketplaceBooking::lines_between(&state.db, scope.company_id(), range.from, range.to).await?;
    let report = commission::aggregate(&lines);

    tracing::debug!(
        company_id = %scope.company_id(),
        lines = lines.len(),
        billable = report.totals.bookings,
        "Commission report built"
    );

    Ok(ApiResponse::ok(CommissionResponse {
        from: range.from,
        to: range.to,
        report,
    }))
}
