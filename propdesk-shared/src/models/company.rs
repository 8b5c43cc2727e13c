//! Company model
//!
//! A company is the unit of tenant isolation: every building, unit, contract
//! and the rest of the portfolio belongs to exactly one company. Users reach
//! companies through memberships.
//!
//! ```sql
//! CREATE TABLE companies (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(255) NOT NULL,
//!     tax_id VARCHAR(64) UNIQUE,
//!     email VARCHAR(255),
//!     phone VARCHAR(64),
//!     address TEXT,
//!     plan company_plan NOT NULL DEFAULT 'trial',
//!     active BOOLEAN NOT NULL DEFAULT TRUE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Subscription plan of a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "company_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CompanyPlan {
    Trial,
    Basic,
    Professional,
    Enterprise,
}

impl CompanyPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyPlan::Trial => "trial",
            CompanyPlan::Basic => "basic",
            CompanyPlan::Professional => "professional",
            CompanyPlan::Enterprise => "enterprise",
        }
    }
}

impl Default for CompanyPlan {
    fn default() -> Self {
        CompanyPlan::Trial
    }
}

const COLUMNS: &str =
    "id, name, tax_id, email, phone, address, plan, active, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,

    /// Fiscal identifier (CIF/NIF), unique across the platform
    pub tax_id: Option<String>,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub plan: CompanyPlan,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub plan: CompanyPlan,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub plan: Option<CompanyPlan>,
    pub active: Option<bool>,
}

impl Company {
    /// Inserts a company. Takes any executor so registration can run it
    /// inside its transaction.
    pub async fn create<'e, E>(executor: E, data: CreateCompany) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Company>(&format!(
            "INSERT INTO companies (name, tax_id, email, phone, address, plan)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        ))
        .bind(data.name)
        .bind(data.tax_id)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.address)
        .bind(data.plan)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!("SELECT {COLUMNS} FROM companies WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Applies the non-`None` fields; returns `None` if the company does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCompany,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE companies SET updated_at = NOW()");

        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(tax_id) = data.tax_id {
            qb.push(", tax_id = ").push_bind(tax_id);
        }
        if let Some(email) = data.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(phone) = data.phone {
            qb.push(", phone = ").push_bind(phone);
        }
        if let Some(address) = data.address {
            qb.push(", address = ").push_bind(address);
        }
        if let Some(plan) = data.plan {
            qb.push(", plan = ").push_bind(plan);
        }
        if let Some(active) = data.active {
            qb.push(", active = ").push_bind(active);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(COLUMNS);

        qb.build_query_as::<Company>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
