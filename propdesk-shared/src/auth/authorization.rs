//! Company membership and role checks
//!
//! Permission model:
//!
//! 1. The user must hold a membership in the active company, unless they are
//!    a platform super admin (treated as `admin` in every company).
//! 2. Each operation requires a minimum [`CompanyRole`]; roles are ordered
//!    `admin > manager > operator > viewer`.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::company::Company;
use crate::models::membership::{CompanyRole, Membership};
use crate::models::user::User;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Not a member of company {0}")]
    NotMember(Uuid),

    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole {
        required: CompanyRole,
        actual: CompanyRole,
    },

    #[error("Company {0} not found")]
    CompanyNotFound(Uuid),

    #[error("User account is disabled")]
    UserDisabled,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Operation classes used by route handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePermission {
    /// List and fetch
    Read,

    /// Create and update
    Write,

    /// Delete records
    Delete,

    /// Company settings and members
    Manage,
}

impl ResourcePermission {
    pub fn min_role(&self) -> CompanyRole {
        match self {
            ResourcePermission::Read => CompanyRole::Viewer,
            ResourcePermission::Write => CompanyRole::Operator,
            ResourcePermission::Delete => CompanyRole::Manager,
            ResourcePermission::Manage => CompanyRole::Admin,
        }
    }
}

/// The caller's standing in one company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompanyAccess {
    pub company_id: Uuid,
    pub role: CompanyRole,

    /// Granted through platform super admin rather than a membership
    pub super_admin: bool,
}

impl CompanyAccess {
    pub fn require(&self, permission: ResourcePermission) -> Result<(), AuthzError> {
        require_role(self.role, permission.min_role())
    }
}

pub fn require_role(actual: CompanyRole, required: CompanyRole) -> Result<(), AuthzError> {
    if !actual.has_permission(&required) {
        return Err(AuthzError::InsufficientRole { required, actual });
    }
    Ok(())
}

/// Resolves the role of `user_id` in `company_id`.
///
/// # Errors
///
/// - `UserDisabled` when the account is missing or inactive
/// - `NotMember` when there is no membership and the user is not a super admin
/// - `CompanyNotFound` when a super admin targets a company that does not exist
pub async fn resolve_company_access(
    pool: &PgPool,
    user_id: Uuid,
    company_id: Uuid,
) -> Result<CompanyAccess, AuthzError> {
    if let Some(role) = Membership::get_role(pool, company_id, user_id).await? {
        return Ok(CompanyAccess {
            company_id,
            role,
            super_admin: false,
        });
    }

    let user = User::find_by_id(pool, user_id)
        .await?
        .filter(|u| u.active)
        .ok_or(AuthzError::UserDisabled)?;

    if !user.is_super_admin {
        return Err(AuthzError::NotMember(company_id));
    }

    if Company::find_by_id(pool, company_id).await?.is_none() {
        return Err(AuthzError::CompanyNotFound(company_id));
    }

    tracing::debug!(%user_id, %company_id, "Super admin company access");

    Ok(CompanyAccess {
        company_id,
        role: CompanyRole::Admin,
        super_admin: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_min_role() {
        assert_eq!(ResourcePermission::Read.min_role(), CompanyRole::Viewer);
        assert_eq!(ResourcePermission::Write.min_role(), CompanyRole::Operator);
        assert_eq!(ResourcePermission::Delete.min_role(), CompanyRole::Manager);
        assert_eq!(ResourcePermission::Manage.min_role(), CompanyRole::Admin);
    }

    #[test]
    fn test_access_require() {
        let access = CompanyAccess {
            company_id: Uuid::new_v4(),
            role: CompanyRole::Operator,
            super_admin: false,
        };

        assert!(access.require(ResourcePermission::Read).is_ok());
        assert!(access.require(ResourcePermission::Write).is_ok());
        assert!(matches!(
            access.require(ResourcePermission::Delete),
            Err(AuthzError::InsufficientRole {
                required: CompanyRole::Manager,
                actual: CompanyRole::Operator
            })
        ));
    }

    #[test]
    fn test_viewer_is_read_only() {
        assert!(require_role(CompanyRole::Viewer, CompanyRole::Viewer).is_ok());
        assert!(require_role(CompanyRole::Viewer, CompanyRole::Operator).is_err());
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::NotMember(Uuid::nil());
        assert!(err.to_string().contains("Not a member"));
        assert!(AuthzError::UserDisabled.to_string().contains("disabled"));
    }
}
