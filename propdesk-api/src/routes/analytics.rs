//! Tenant risk analytics
//!
//! - `GET /v1/analytics/morosidad`: every tenant of the company, riskiest first
//! - `GET /v1/analytics/morosidad/:tenant_id`: one tenant

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, CompanyScope},
    response::ApiResponse,
};
use axum::{extract::State, routing::get, Router};
use chrono::{NaiveDate, Utc};
use propdesk_shared::{
    auth::authorization::ResourcePermission,
    models::{contract::Contract, payment::Payment, tenant::Tenant},
    scoring::{features_from_payments, score, TenantRisk},
};
use std::collections::HashMap;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/morosidad", get(list_morosidad))
        .route("/morosidad/:tenant_id", get(get_morosidad))
}

fn tenant_risk(tenant: &Tenant, payments: &[Payment], contracts: &[Contract], as_of: NaiveDate) -> TenantRisk {
    let features = features_from_payments(payments, contracts, as_of);
    TenantRisk {
        tenant_id: tenant.id,
        full_name: tenant.full_name.clone(),
        score: score(&features),
    }
}

/// Groups company-wide rows by tenant and scores each tenant, highest score
/// first. Ties are ordered by name.
fn rank_tenants(tenants: &[Tenant], contracts: Vec<Contract>, payments: Vec<Payment>, as_of: NaiveDate) -> Vec<TenantRisk> {
    let tenant_of: HashMap<Uuid, Uuid> = contracts.iter().map(|c| (c.id, c.tenant_id)).collect();

    let mut payments_by_tenant: HashMap<Uuid, Vec<Payment>> = HashMap::new();
    for payment in payments {
        if let Some(tenant_id) = tenant_of.get(&payment.contract_id) {
            payments_by_tenant.entry(*tenant_id).or_default().push(payment);
        }
    }

    let mut contracts_by_tenant: HashMap<Uuid, Vec<Contract>> = HashMap::new();
    for contract in contracts {
        contracts_by_tenant.entry(contract.tenant_id).or_default().push(contract);
    }

    let mut ranked: Vec<TenantRisk> = tenants
        .iter()
        .map(|tenant| {
            let payments = payments_by_tenant.get(&tenant.id).map(Vec::as_slice).unwrap_or(&[]);
            let contracts = contracts_by_tenant.get(&tenant.id).map(Vec::as_slice).unwrap_or(&[]);
            tenant_risk(tenant, payments, contracts, as_of)
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .score
            .cmp(&a.score.score)
            .then_with(|| a.full_name.cmp(&b.full_name))
    });

    ranked
}

pub async fn list_morosidad(
    State(state): State<AppState>,
    scope: CompanyScope,
) -> ApiResult<ApiResponse<Vec<TenantRisk>>> {
    scope.require(ResourcePermission::Read)?;
    let company_id = scope.company_id();

    let tenants = Tenant::all_for_company(&state.db, company_id).await?;
    let contracts = Contract::all_for_company(&state.db, company_id).await?;
    let payments = Payment::all_for_company(&state.db, company_id).await?;

    let ranked = rank_tenants(&tenants, contracts, payments, Utc::now().date_naive());

    tracing::debug!(%company_id, tenants = ranked.len(), "Morosidad scores computed");

    Ok(ApiResponse::ok(ranked))
}

pub async fn get_morosidad(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(tenant_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<TenantRisk>> {
    scope.require(ResourcePermission::Read)?;
    let company_id = scope.company_id();

    let tenant = Tenant::find(&state.db, company_id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant"))?;

    let contracts = Contract::list_for_tenant(&state.db, company_id, tenant_id).await?;
    let payments = Payment::list_for_tenant(&state.db, company_id, tenant_id).await?;

    let risk = tenant_risk(&tenant, &payments, &contracts, Utc::now().date_naive());

    tracing::debug!(
        %company_id,
        %tenant_id,
        score = risk.score.score,
        level = risk.score.level.as_str(),
        "Morosidad score computed"
    );

    Ok(ApiResponse::ok(risk))
}
