//! Company memberships
//!
//! Many-to-many between users and companies with a role per pair.
//!
//! ```sql
//! CREATE TYPE company_role AS ENUM ('admin', 'manager', 'operator', 'viewer');
//!
//! CREATE TABLE memberships (
//!     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     role company_role NOT NULL DEFAULT 'viewer',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     PRIMARY KEY (company_id, user_id)
//! );
//! ```
//!
//! # Roles
//!
//! - **admin**: company settings and members, everything below
//! - **manager**: deletes records, everything below
//! - **operator**: creates and edits records
//! - **viewer**: read-only

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "company_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CompanyRole {
    Admin,
    Manager,
    Operator,
    Viewer,
}

impl CompanyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyRole::Admin => "admin",
            CompanyRole::Manager => "manager",
            CompanyRole::Operator => "operator",
            CompanyRole::Viewer => "viewer",
        }
    }

    /// Hierarchy: Admin > Manager > Operator > Viewer
    pub fn has_permission(&self, required: &CompanyRole) -> bool {
        self.level() >= required.level()
    }

    fn level(&self) -> u8 {
        match self {
            CompanyRole::Admin => 4,
            CompanyRole::Manager => 3,
            CompanyRole::Operator => 2,
            CompanyRole::Viewer => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub role: CompanyRole,
    pub created_at: DateTime<Utc>,
}

/// Member listing row joined with the user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MemberSummary {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: CompanyRole,
    pub created_at: DateTime<Utc>,
}

/// Company listing row for the company switcher
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CompanyMembership {
    pub company_id: Uuid,
    pub company_name: String,
    pub role: CompanyRole,
}

impl Membership {
    pub async fn create<'e, E>(
        executor: E,
        company_id: Uuid,
        user_id: Uuid,
        role: CompanyRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(
            "INSERT INTO memberships (company_id, user_id, role)
             VALUES ($1, $2, $3)
             RETURNING company_id, user_id, role, created_at",
        )
        .bind(company_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
    }

    pub async fn get_role<'e, E>(
        executor: E,
        company_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CompanyRole>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, CompanyRole>(
            "SELECT role FROM memberships WHERE company_id = $1 AND user_id = $2",
        )
        .bind(company_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Inserts or changes the role of an existing member
    pub async fn upsert<'e, E>(
        executor: E,
        company_id: Uuid,
        user_id: Uuid,
        role: CompanyRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(
            "INSERT INTO memberships (company_id, user_id, role)
             VALUES ($1, $2, $3)
             ON CONFLICT (company_id, user_id) DO UPDATE SET role = EXCLUDED.role
             RETURNING company_id, user_id, role, created_at",
        )
        .bind(company_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, company_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM memberships WHERE company_id = $1 AND user_id = $2")
            .bind(company_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_members(pool: &PgPool, company_id: Uuid) -> Result<Vec<MemberSummary>, sqlx::Error> {
        sqlx::query_as::<_, MemberSummary>(
            "SELECT u.id AS user_id, u.email, u.name, m.role, m.created_at
             FROM memberships m
             JOIN users u ON u.id = m.user_id
             WHERE m.company_id = $1
             ORDER BY m.created_at ASC",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    /// Companies of a user, oldest membership first. The first entry is the
    /// user's home company at login.
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<CompanyMembership>, sqlx::Error> {
        sqlx::query_as::<_, CompanyMembership>(
            "SELECT c.id AS company_id, c.name AS company_name, m.role
             FROM memberships m
             JOIN companies c ON c.id = m.company_id
             WHERE m.user_id = $1 AND c.active
             ORDER BY m.created_at ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Admin user ids of a company, row-locked until the transaction ends.
    ///
    /// Role changes and removals that could drop the last admin take this
    /// lock first, so two of them cannot both see the other admin.
    pub async fn lock_admins(
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM memberships
             WHERE company_id = $1 AND role = 'admin'
             FOR UPDATE",
        )
        .bind(company_id)
        .fetch_all(&mut **tx)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(CompanyRole::Admin.has_permission(&CompanyRole::Viewer));
        assert!(CompanyRole::Manager.has_permission(&CompanyRole::Operator));
        assert!(CompanyRole::Operator.has_permission(&CompanyRole::Operator));
        assert!(!CompanyRole::Operator.has_permission(&CompanyRole::Manager));
        assert!(!CompanyRole::Viewer.has_permission(&CompanyRole::Operator));
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&CompanyRole::Manager).unwrap(), "\"manager\"");
        let role: CompanyRole = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, CompanyRole::Viewer);
        assert_eq!(CompanyRole::Operator.as_str(), "operator");
    }
}
