//! Rent payments
//!
//! One row per contract and billing period (`YYYY-MM`). The worker moves
//! pending payments past their due date to `overdue`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl PaymentStatus {
    /// Still owed by the tenant
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Overdue)
    }
}

const COLUMNS: &str = "id, company_id, contract_id, period, amount, due_date, paid_at, method, status, \
                       created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub contract_id: Uuid,

    /// Billing period as `YYYY-MM`
    pub period: String,

    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub method: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validates a `YYYY-MM` period string
pub fn valid_period(period: &str) -> Result<(), ValidationError> {
    let ok = period.len() == 7
        && period.as_bytes()[4] == b'-'
        && NaiveDate::parse_from_str(&format!("{period}-01"), "%Y-%m-%d").is_ok();

    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("period");
        err.message = Some("Period must be formatted as YYYY-MM".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePayment {
    pub contract_id: Uuid,

    #[validate(custom(function = "valid_period"))]
    pub period: String,

    #[validate(custom(function = "super::non_negative"))]
    pub amount: Decimal,

    pub due_date: NaiveDate,

    #[validate(length(max = 32))]
    pub method: Option<String>,

    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePayment {
    #[validate(custom(function = "valid_period"))]
    pub period: Option<String>,

    #[validate(custom(function = "super::non_negative"))]
    pub amount: Option<Decimal>,

    pub due_date: Option<NaiveDate>,

    #[validate(length(max = 32))]
    pub method: Option<String>,

    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MarkPaid {
    pub paid_at: Option<DateTime<Utc>>,

    #[validate(length(max = 32))]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub contract_id: Option<Uuid>,
    pub period: Option<String>,
}

impl Payment {
    pub async fn create(pool: &PgPool, company_id: Uuid, data: CreatePayment) -> Result<Self, sqlx::Error> {
        let status = data.status.unwrap_or(PaymentStatus::Pending);
        let paid_at = (status == PaymentStatus::Paid).then(Utc::now);

        sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments (company_id, contract_id, period, amount, due_date, paid_at, method, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        ))
        .bind(company_id)
        .bind(data.contract_id)
        .bind(data.period)
        .bind(data.amount)
        .bind(data.due_date)
        .bind(paid_at)
        .bind(data.method)
        .bind(status)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {COLUMNS} FROM payments WHERE id = $1 AND company_id = $2"))
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &PaymentFilter,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM payments WHERE company_id = "));
        qb.push_bind(company_id);

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(contract_id) = filter.contract_id {
            qb.push(" AND contract_id = ").push_bind(contract_id);
        }
        if let Some(period) = &filter.period {
            qb.push(" AND period = ").push_bind(period.clone());
        }

        qb.push(" ORDER BY due_date DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<Payment>().fetch_all(pool).await
    }

    pub async fn all_for_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {COLUMNS} FROM payments WHERE company_id = $1 ORDER BY due_date ASC"
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    /// Payments of every contract the tenant ever held.
    pub async fn list_for_tenant(pool: &PgPool, company_id: Uuid, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let columns = COLUMNS
            .split(", ")
            .map(|c| format!("p.{c}"))
            .collect::<Vec<_>>()
            .join(", ");

        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {columns} FROM payments p
             JOIN contracts c ON c.id = p.contract_id
             WHERE p.company_id = $1 AND c.tenant_id = $2
             ORDER BY p.due_date ASC"
        ))
        .bind(company_id)
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: UpdatePayment,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE payments SET updated_at = NOW()");

        if let Some(period) = data.period {
            qb.push(", period = ").push_bind(period);
        }
        if let Some(amount) = data.amount {
            qb.push(", amount = ").push_bind(amount);
        }
        if let Some(due_date) = data.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }
        if let Some(method) = data.method {
            qb.push(", method = ").push_bind(method);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
            if status == PaymentStatus::Paid {
                qb.push(", paid_at = COALESCE(paid_at, NOW())");
            }
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND company_id = ").push_bind(company_id);
        qb.push(" RETURNING ").push(COLUMNS);

        qb.build_query_as::<Payment>().fetch_optional(pool).await
    }

    /// Records the payment as paid. Only open payments change; the caller
    /// decides what a cancelled or already paid payment means.
    pub async fn mark_paid(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: MarkPaid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let paid_at = data.paid_at.unwrap_or_else(Utc::now);

        sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments
             SET status = 'paid', paid_at = $1, method = COALESCE($2, method), updated_at = NOW()
             WHERE id = $3 AND company_id = $4 AND status IN ('pending', 'overdue')
             RETURNING {COLUMNS}"
        ))
        .bind(paid_at)
        .bind(data.method)
        .bind(id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
    }

    /// Moves pending payments due before `today` to overdue, across all
    /// companies. Returns the number of rows changed.
    pub async fn mark_overdue<'e, E>(executor: E, today: NaiveDate) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE payments SET status = 'overdue', updated_at = NOW()
             WHERE status = 'pending' AND due_date < $1",
        )
        .bind(today)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
