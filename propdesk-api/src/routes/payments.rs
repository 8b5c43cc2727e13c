//! Payment endpoints
//!
//! Filters: `status`, `contract_id`, `period`.
//!
//! `POST /v1/payments/:id/pay` records a payment (`paid_at` defaults to
//! now). Cancelled and already paid payments answer 409.

use super::ensure_reference;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, CompanyScope, ValidJson},
    response::{ApiResponse, Deleted},
};
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Router,
};
use propdesk_shared::{
    auth::authorization::ResourcePermission,
    models::{
        payment::{CreatePayment, MarkPaid, Payment, PaymentFilter, PaymentStatus, UpdatePayment},
        Pagination,
    },
};
use uuid::Uuid;
use validator::Validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments).post(create_payment))
        .route(
            "/:id",
            get(get_payment).patch(update_payment).delete(delete_payment),
        )
        .route("/:id/pay", post(pay_payment))
}

pub async fn list_payments(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiQuery(page): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<PaymentFilter>,
) -> ApiResult<ApiResponse<Vec<Payment>>> {
    scope.require(ResourcePermission::Read)?;

    let payments = Payment::list(&state.db, scope.company_id(), &filter, page).await?;
    Ok(ApiResponse::ok(payments))
}

pub async fn create_payment(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<CreatePayment>,
) -> ApiResult<ApiResponse<Payment>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    ensure_reference(&state.db, "contracts", "Contract", req.contract_id, company_id).await?;

    let payment = Payment::create(&state.db, company_id, req).await?;
    state.dashboard_cache.invalidate(&company_id).await;

    tracing::info!(%company_id, payment_id = %payment.id, period = %payment.period, "Payment created");

    Ok(ApiResponse::created(payment))
}

pub async fn get_payment(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Payment>> {
    scope.require(ResourcePermission::Read)?;

    let payment = Payment::find(&state.db, scope.company_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment"))?;

    Ok(ApiResponse::ok(payment))
}

pub async fn update_payment(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdatePayment>,
) -> ApiResult<ApiResponse<Payment>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    let payment = Payment::update(&state.db, company_id, id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment"))?;
    state.dashboard_cache.invalidate(&company_id).await;

    Ok(ApiResponse::ok(payment))
}

pub async fn pay_payment(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
    body: Bytes,
) -> ApiResult<ApiResponse<Payment>> {
    scope.require(ResourcePermission::Write)?;
    let company_id = scope.company_id();

    // An empty body means "paid now"
    let req: MarkPaid = if body.iter().all(u8::is_ascii_whitespace) {
        MarkPaid::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?
    };
    req.validate()?;

    let Some(payment) = Payment::mark_paid(&state.db, company_id, id, req).await? else {
        let existing = Payment::find(&state.db, company_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Payment"))?;

        return Err(match existing.status {
            PaymentStatus::Cancelled => ApiError::Conflict("Cannot pay a cancelled payment".to_string()),
            status => ApiError::Conflict(format!("Payment is already {}", status.as_str())),
        });
    };

    state.dashboard_cache.invalidate(&company_id).await;

    tracing::info!(%company_id, payment_id = %id, amount = %payment.amount, "Payment recorded");

    Ok(ApiResponse::ok(payment))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Delete)?;
    let company_id = scope.company_id();

    if !Payment::delete(&state.db, company_id, id).await? {
        return Err(ApiError::not_found("Payment"));
    }
    state.dashboard_cache.invalidate(&company_id).await;

    Ok(Deleted::yes())
}
