//! API route handlers, one module per resource
//!
//! Every business route takes a [`crate::extract::CompanyScope`] and checks
//! the role the operation needs before touching the database. Queries are
//! always filtered by the scoped company, so records of other companies
//! answer 404.

pub mod analytics;
pub mod auth;
pub mod buildings;
pub mod companies;
pub mod contracts;
pub mod crm;
pub mod dashboard;
pub mod health;
pub mod maintenance;
pub mod marketplace;
pub mod payments;
pub mod tenants;
pub mod units;

use crate::error::{ApiError, ApiResult};
use sqlx::PgPool;
use uuid::Uuid;

/// Rejects references to records outside the company with 400.
pub(crate) async fn ensure_reference(
    db: &PgPool,
    table: &'static str,
    what: &str,
    id: Uuid,
    company_id: Uuid,
) -> ApiResult<()> {
    if propdesk_shared::models::exists_in_company(db, table, id, company_id).await? {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("{what} {id} does not exist in this company")))
    }
}
