//! Lease contracts
//!
//! A contract binds a tenant to a unit for a date range. Status changes
//! ripple to the unit: see [`super::unit::Unit::set_status`] and
//! [`super::unit::Unit::release_if_vacant`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contract_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Draft,
    Active,
    Expired,
    Terminated,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Active => "active",
            ContractStatus::Expired => "expired",
            ContractStatus::Terminated => "terminated",
        }
    }
}

impl ContractStatus {
    /// Expired and terminated contracts are final
    pub fn is_closed(&self) -> bool {
        matches!(self, ContractStatus::Expired | ContractStatus::Terminated)
    }
}

const COLUMNS: &str = "id, company_id, unit_id, tenant_id, start_date, end_date, monthly_rent, deposit, \
                       status, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub company_id: Uuid,
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub deposit: Decimal,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_create_dates"))]
pub struct CreateContract {
    pub unit_id: Uuid,
    pub tenant_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[validate(custom(function = "super::non_negative"))]
    pub monthly_rent: Decimal,

    #[serde(default)]
    #[validate(custom(function = "super::non_negative"))]
    pub deposit: Decimal,

    pub status: Option<ContractStatus>,
}

impl CreateContract {
    pub fn status(&self) -> ContractStatus {
        self.status.unwrap_or(ContractStatus::Draft)
    }
}

fn validate_create_dates(data: &CreateContract) -> Result<(), ValidationError> {
    check_dates(data.start_date, data.end_date)
}

fn check_dates(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end <= start {
        let mut err = ValidationError::new("date_range");
        err.message = Some("end_date must be after start_date".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_update_dates"))]
pub struct UpdateContract {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    #[validate(custom(function = "super::non_negative"))]
    pub monthly_rent: Option<Decimal>,

    #[validate(custom(function = "super::non_negative"))]
    pub deposit: Option<Decimal>,

    pub status: Option<ContractStatus>,
}

fn validate_update_dates(data: &UpdateContract) -> Result<(), ValidationError> {
    // Partial ranges are checked by the table constraint.
    match (data.start_date, data.end_date) {
        (Some(start), Some(end)) => check_dates(start, end),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub unit_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
}

impl Contract {
    pub async fn create<'e, E>(executor: E, company_id: Uuid, data: CreateContract) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let status = data.status();

        sqlx::query_as::<_, Contract>(&format!(
            "INSERT INTO contracts (company_id, unit_id, tenant_id, start_date, end_date, monthly_rent, deposit, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        ))
        .bind(company_id)
        .bind(data.unit_id)
        .bind(data.tenant_id)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.monthly_rent)
        .bind(data.deposit)
        .bind(status)
        .fetch_one(executor)
        .await
    }

    pub async fn find<'e, E>(executor: E, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {COLUMNS} FROM contracts WHERE id = $1 AND company_id = $2"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &ContractFilter,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM contracts WHERE company_id = "));
        qb.push_bind(company_id);

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(unit_id) = filter.unit_id {
            qb.push(" AND unit_id = ").push_bind(unit_id);
        }
        if let Some(tenant_id) = filter.tenant_id {
            qb.push(" AND tenant_id = ").push_bind(tenant_id);
        }

        qb.push(" ORDER BY start_date DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<Contract>().fetch_all(pool).await
    }

    pub async fn list_for_tenant(pool: &PgPool, company_id: Uuid, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {COLUMNS} FROM contracts
             WHERE company_id = $1 AND tenant_id = $2
             ORDER BY start_date ASC"
        ))
        .bind(company_id)
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    pub async fn all_for_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {COLUMNS} FROM contracts WHERE company_id = $1 ORDER BY start_date ASC"
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        company_id: Uuid,
        id: Uuid,
        data: UpdateContract,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE contracts SET updated_at = NOW()");

        if let Some(start_date) = data.start_date {
            qb.push(", start_date = ").push_bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            qb.push(", end_date = ").push_bind(end_date);
        }
        if let Some(rent) = data.monthly_rent {
            qb.push(", monthly_rent = ").push_bind(rent);
        }
        if let Some(deposit) = data.deposit {
            qb.push(", deposit = ").push_bind(deposit);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND company_id = ").push_bind(company_id);
        qb.push(" RETURNING ").push(COLUMNS);

        qb.build_query_as::<Contract>().fetch_optional(executor).await
    }

    /// Marks the contract terminated. Already closed contracts are left as is
    /// and `None` is returned for them as for missing ones.
    pub async fn terminate<'e, E>(executor: E, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Contract>(&format!(
            "UPDATE contracts SET status = 'terminated', updated_at = NOW()
             WHERE id = $1 AND company_id = $2 AND status IN ('draft', 'active')
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(executor)
        .await
    }

    /// Expires every active contract whose end date is before `today`,
    /// across all companies. Returns the expired rows.
    pub async fn expire_ended<'e, E>(executor: E, today: NaiveDate) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Contract>(&format!(
            "UPDATE contracts SET status = 'expired', updated_at = NOW()
             WHERE status = 'active' AND end_date < $1
             RETURNING {COLUMNS}"
        ))
        .bind(today)
        .fetch_all(executor)
        .await
    }

    /// Payments of the contract are deleted with it.
    pub async fn delete<'e, E>(executor: E, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM contracts WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
