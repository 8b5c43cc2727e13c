//! Tenants (renters)
//!
//! Not to be confused with the owning organisation, which is a
//! [`super::company::Company`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::Pagination;

const COLUMNS: &str = "id, company_id, full_name, email, phone, document_id, notes, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub company_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,

    /// National id or passport number
    pub document_id: Option<String>,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTenant {
    #[validate(length(min = 1, max = 255, message = "Full name must be 1-255 characters"))]
    pub full_name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 64))]
    pub phone: Option<String>,

    #[validate(length(max = 64))]
    pub document_id: Option<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTenant {
    #[validate(length(min = 1, max = 255, message = "Full name must be 1-255 characters"))]
    pub full_name: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 64))]
    pub phone: Option<String>,

    #[validate(length(max = 64))]
    pub document_id: Option<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantFilter {
    /// Case-insensitive match on name or email
    pub search: Option<String>,
}

impl Tenant {
    pub async fn create(pool: &PgPool, company_id: Uuid, data: CreateTenant) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(&format!(
            "INSERT INTO tenants (company_id, full_name, email, phone, document_id, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        ))
        .bind(company_id)
        .bind(data.full_name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.document_id)
        .bind(data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(&format!("SELECT {COLUMNS} FROM tenants WHERE id = $1 AND company_id = $2"))
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &TenantFilter,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM tenants WHERE company_id = "));
        qb.push_bind(company_id);

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (full_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY full_name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<Tenant>().fetch_all(pool).await
    }

    pub async fn all_for_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {COLUMNS} FROM tenants WHERE company_id = $1 ORDER BY full_name ASC"
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: UpdateTenant,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tenants SET updated_at = NOW()");

        if let Some(full_name) = data.full_name {
            qb.push(", full_name = ").push_bind(full_name);
        }
        if let Some(email) = data.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(phone) = data.phone {
            qb.push(", phone = ").push_bind(phone);
        }
        if let Some(document_id) = data.document_id {
            qb.push(", document_id = ").push_bind(document_id);
        }
        if let Some(notes) = data.notes {
            qb.push(", notes = ").push_bind(notes);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND company_id = ").push_bind(company_id);
        qb.push(" RETURNING ").push(COLUMNS);

        qb.build_query_as::<Tenant>().fetch_optional(pool).await
    }

    /// Fails with a foreign key violation while contracts reference the tenant.
    pub async fn delete(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ana"), "ana");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_email_validation() {
        let data = CreateTenant {
            full_name: "Lucía Ferrer".to_string(),
            email: Some("not-an-email".to_string()),
            phone: None,
            document_id: None,
            notes: None,
        };
        let errors = data.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }
}
