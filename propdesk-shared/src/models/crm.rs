//! CRM leads: prospective owners and tenants moving through a sales pipeline

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lead_stage", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeadStage {
    New,
    Contacted,
    Qualified,
    Proposal,
    Won,
    Lost,
}

impl LeadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStage::New => "new",
            LeadStage::Contacted => "contacted",
            LeadStage::Qualified => "qualified",
            LeadStage::Proposal => "proposal",
            LeadStage::Won => "won",
            LeadStage::Lost => "lost",
        }
    }
}

const COLUMNS: &str = "id, company_id, name, email, phone, source, stage, estimated_value, assigned_to, notes, \
                       created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CrmLead {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,

    /// Free-form acquisition channel ("web", "referral", ...)
    pub source: Option<String>,

    pub stage: LeadStage,
    pub estimated_value: Option<Decimal>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLead {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 64))]
    pub phone: Option<String>,

    #[validate(length(max = 64))]
    pub source: Option<String>,

    pub stage: Option<LeadStage>,

    #[validate(custom(function = "super::non_negative"))]
    pub estimated_value: Option<Decimal>,

    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLead {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 64))]
    pub phone: Option<String>,

    #[validate(length(max = 64))]
    pub source: Option<String>,

    pub stage: Option<LeadStage>,

    #[validate(custom(function = "super::non_negative"))]
    pub estimated_value: Option<Decimal>,

    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    pub stage: Option<LeadStage>,
    pub assigned_to: Option<Uuid>,
}

impl CrmLead {
    pub async fn create(pool: &PgPool, company_id: Uuid, data: CreateLead) -> Result<Self, sqlx::Error> {
        let stage = data.stage.unwrap_or(LeadStage::New);

        sqlx::query_as::<_, CrmLead>(&format!(
            "INSERT INTO crm_leads (company_id, name, email, phone, source, stage, estimated_value, assigned_to, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        ))
        .bind(company_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.source)
        .bind(stage)
        .bind(data.estimated_value)
        .bind(data.assigned_to)
        .bind(data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CrmLead>(&format!("SELECT {COLUMNS} FROM crm_leads WHERE id = $1 AND company_id = $2"))
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &LeadFilter,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM crm_leads WHERE company_id = "));
        qb.push_bind(company_id);

        if let Some(stage) = filter.stage {
            qb.push(" AND stage = ").push_bind(stage);
        }
        if let Some(assigned_to) = filter.assigned_to {
            qb.push(" AND assigned_to = ").push_bind(assigned_to);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<CrmLead>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: UpdateLead,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE crm_leads SET updated_at = NOW()");

        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(email) = data.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(phone) = data.phone {
            qb.push(", phone = ").push_bind(phone);
        }
        if let Some(source) = data.source {
            qb.push(", source = ").push_bind(source);
        }
        if let Some(stage) = data.stage {
            qb.push(", stage = ").push_bind(stage);
        }
        if let Some(value) = data.estimated_value {
            qb.push(", estimated_value = ").push_bind(value);
        }
        if let Some(assigned_to) = data.assigned_to {
            qb.push(", assigned_to = ").push_bind(assigned_to);
        }
        if let Some(notes) = data.notes {
            qb.push(", notes = ").push_bind(notes);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND company_id = ").push_bind(company_id);
        qb.push(" RETURNING ").push(COLUMNS);

        qb.build_query_as::<CrmLead>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM crm_leads WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_wire_names() {
        let stage: LeadStage = serde_json::from_str("\"qualified\"").unwrap();
        assert_eq!(stage, LeadStage::Qualified);
        assert_eq!(serde_json::to_string(&LeadStage::Won).unwrap(), format!("\"{}\"", LeadStage::Won.as_str()));
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let result: Result<CreateLead, _> =
            serde_json::from_value(serde_json::json!({ "name": "Grupo Ibérica", "stage": "maybe" }));
        assert!(result.is_err());
    }
}
