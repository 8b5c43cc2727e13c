//! Maintenance requests raised against units

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "maintenance_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MaintenancePriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl MaintenancePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenancePriority::Low => "low",
            MaintenancePriority::Medium => "medium",
            MaintenancePriority::High => "high",
            MaintenancePriority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "maintenance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Open => "open",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Resolved => "resolved",
            MaintenanceStatus::Closed => "closed",
        }
    }
}

impl MaintenanceStatus {
    /// Work still pending
    pub fn is_open(&self) -> bool {
        matches!(self, MaintenanceStatus::Open | MaintenanceStatus::InProgress)
    }
}

const COLUMNS: &str = "id, company_id, unit_id, title, description, priority, status, reported_by, \
                       resolved_at, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MaintenanceRequest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub unit_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub reported_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMaintenance {
    pub unit_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[serde(default = "default_priority")]
    pub priority: MaintenancePriority,
}

fn default_priority() -> MaintenancePriority {
    MaintenancePriority::Medium
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMaintenance {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub priority: Option<MaintenancePriority>,
    pub status: Option<MaintenanceStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenanceFilter {
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<MaintenancePriority>,
    pub unit_id: Option<Uuid>,
}

impl MaintenanceRequest {
    pub async fn create(
        pool: &PgPool,
        company_id: Uuid,
        reported_by: Uuid,
        data: CreateMaintenance,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(&format!(
            "INSERT INTO maintenance_requests (company_id, unit_id, title, description, priority, reported_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        ))
        .bind(company_id)
        .bind(data.unit_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(reported_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(&format!(
            "SELECT {COLUMNS} FROM maintenance_requests WHERE id = $1 AND company_id = $2"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &MaintenanceFilter,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM maintenance_requests WHERE company_id = "
        ));
        qb.push_bind(company_id);

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND priority = ").push_bind(priority);
        }
        if let Some(unit_id) = filter.unit_id {
            qb.push(" AND unit_id = ").push_bind(unit_id);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<MaintenanceRequest>().fetch_all(pool).await
    }

    /// Open and in-progress requests of the company.
    pub async fn open_for_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRequest>(&format!(
            "SELECT {COLUMNS} FROM maintenance_requests
             WHERE company_id = $1 AND status IN ('open', 'in_progress')"
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: UpdateMaintenance,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE maintenance_requests SET updated_at = NOW()");

        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(priority) = data.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
            if status.is_open() {
                qb.push(", resolved_at = NULL");
            } else {
                qb.push(", resolved_at = COALESCE(resolved_at, NOW())");
            }
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND company_id = ").push_bind(company_id);
        qb.push(" RETURNING ").push(COLUMNS);

        qb.build_query_as::<MaintenanceRequest>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM maintenance_requests WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
