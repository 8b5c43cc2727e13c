//! Database models
//!
//! Every business record carries a `company_id`, and every query on those
//! records takes the company as an explicit argument: a record of another
//! company is indistinguishable from a missing one.
//!
//! - `company`, `user`, `membership`: organisations, accounts and roles
//! - `building`, `unit`, `tenant`, `contract`, `payment`: rental portfolio
//! - `maintenance`: maintenance requests against units
//! - `marketplace`: provider services and bookings with commission snapshots
//! - `crm`: sales leads
//!
//! Status columns are Postgres enum types mapped with `sqlx::Type`.

pub mod building;
pub mod company;
pub mod contract;
pub mod crm;
pub mod maintenance;
pub mod marketplace;
pub mod membership;
pub mod payment;
pub mod tenant;
pub mod unit;
pub mod user;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgExecutor;
use uuid::Uuid;
use validator::ValidationError;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: i64 = 200;

/// `limit`/`offset` paging shared by list queries
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Checks that a referenced record exists and belongs to `company_id`.
///
/// `table` must be one of the company-scoped tables; it is never taken from
/// request input.
pub async fn exists_in_company<'e, E>(
    executor: E,
    table: &'static str,
    id: Uuid,
    company_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1 AND company_id = $2)"
    ))
    .bind(id)
    .bind(company_id)
    .fetch_one(executor)
    .await
}

/// Validator for money fields
pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Amount must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Validator for commission rates expressed in percent
pub fn percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("percentage");
        err.message = Some("Rate must be between 0 and 100".into());
        return Err(err);
    }
    Ok(())
}
