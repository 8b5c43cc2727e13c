//! Company and membership endpoints
//!
//! ```text
//! GET    /v1/companies                          companies of the caller
//! POST   /v1/companies                          create; caller becomes admin
//! POST   /v1/companies/switch                   set the active company cookie
//! GET    /v1/companies/current                  active company
//! PATCH  /v1/companies/current                  admin
//! GET    /v1/companies/current/members          viewer+
//! POST   /v1/companies/current/members          admin
//! DELETE /v1/companies/current/members/:user_id admin
//! ```

use super::auth::company_cookie;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, CompanyScope, CurrentUser, ValidJson},
    response::{ApiResponse, Deleted},
};
use axum::extract::State;
use axum_extra::extract::CookieJar;
use propdesk_shared::{
    auth::authorization::{resolve_company_access, ResourcePermission},
    models::{
        company::{Company, CompanyPlan, CreateCompany, UpdateCompany},
        membership::{CompanyMembership, CompanyRole, MemberSummary, Membership},
        user::User,
    },
    scope::ScopeSource,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(max = 64, message = "Tax id must be at most 64 characters"))]
    pub tax_id: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 64, message = "Phone must be at most 64 characters"))]
    pub phone: Option<String>,

    pub address: Option<String>,

    pub plan: Option<CompanyPlan>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 64, message = "Tax id must be at most 64 characters"))]
    pub tax_id: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 64, message = "Phone must be at most 64 characters"))]
    pub phone: Option<String>,

    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SwitchCompanyRequest {
    pub company_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub role: CompanyRole,
}

/// A company together with the caller's role in it
#[derive(Debug, Serialize)]
pub struct CompanyView {
    #[serde(flatten)]
    pub company: Company,
    pub role: CompanyRole,
}

#[derive(Debug, Serialize)]
pub struct CurrentCompany {
    #[serde(flatten)]
    pub company: Company,
    pub role: CompanyRole,
    pub super_admin: bool,

    /// Which request input selected the company
    pub resolved_from: ScopeSource,
}

/// True when changing or removing a member with role `current` would leave
/// the company without an admin.
fn removes_last_admin(current: CompanyRole, new_role: Option<CompanyRole>, admins: usize) -> bool {
    current == CompanyRole::Admin && new_role != Some(CompanyRole::Admin) && admins <= 1
}

pub async fn list_companies(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> ApiResult<ApiResponse<Vec<CompanyMembership>>> {
    let companies = Membership::list_for_user(&state.db, ctx.user_id).await?;
    Ok(ApiResponse::ok(companies))
}

pub async fn create_company(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    ValidJson(req): ValidJson<CreateCompanyRequest>,
) -> ApiResult<ApiResponse<CompanyView>> {
    let mut tx = state.db.begin().await?;

    let company = Company::create(
        &mut *tx,
        CreateCompany {
            name: req.name,
            tax_id: req.tax_id,
            email: req.email,
            phone: req.phone,
            address: req.address,
            plan: req.plan.unwrap_or_default(),
        },
    )
    .await?;

    let membership = Membership::create(&mut *tx, company.id, ctx.user_id, CompanyRole::Admin).await?;

    tx.commit().await?;

    tracing::info!(user_id = %ctx.user_id, company_id = %company.id, "Company created");

    Ok(ApiResponse::created(CompanyView {
        company,
        role: membership.role,
    }))
}

/// Makes `company_id` the active company through the switcher cookie.
///
/// # Errors
///
/// - `403` caller is not a member
/// - `404` company does not exist
pub async fn switch_company(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    jar: CookieJar,
    ValidJson(req): ValidJson<SwitchCompanyRequest>,
) -> ApiResult<(CookieJar, ApiResponse<CompanyView>)> {
    let access = resolve_company_access(&state.db, ctx.user_id, req.company_id).await?;

    let company = Company::find_by_id(&state.db, req.company_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company"))?;

    tracing::info!(user_id = %ctx.user_id, company_id = %company.id, "Active company switched");

    let jar = jar.add(company_cookie(&state.config, company.id));

    Ok((
        jar,
        ApiResponse::ok(CompanyView {
            company,
            role: access.role,
        }),
    ))
}

pub async fn get_current_company(
    State(state): State<AppState>,
    scope: CompanyScope,
) -> ApiResult<ApiResponse<CurrentCompany>> {
    scope.require(ResourcePermission::Read)?;

    let company = Company::find_by_id(&state.db, scope.company_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Company"))?;

    Ok(ApiResponse::ok(CurrentCompany {
        company,
        role: scope.access.role,
        super_admin: scope.access.super_admin,
        resolved_from: scope.source,
    }))
}

pub async fn update_current_company(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<UpdateCompanyRequest>,
) -> ApiResult<ApiResponse<CompanyView>> {
    scope.require(ResourcePermission::Manage)?;

    let company = Company::update(
        &state.db,
        scope.company_id(),
        UpdateCompany {
            name: req.name,
            tax_id: req.tax_id,
            email: req.email,
            phone: req.phone,
            address: req.address,
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Company"))?;

    tracing::info!(company_id = %company.id, user_id = %scope.user_id, "Company updated");

    Ok(ApiResponse::ok(CompanyView {
        company,
        role: scope.access.role,
    }))
}

pub async fn list_members(
    State(state): State<AppState>,
    scope: CompanyScope,
) -> ApiResult<ApiResponse<Vec<MemberSummary>>> {
    scope.require(ResourcePermission::Read)?;

    let members = Membership::list_members(&state.db, scope.company_id()).await?;
    Ok(ApiResponse::ok(members))
}

/// Adds an existing user by email, or changes the role of a current member.
///
/// # Errors
///
/// - `404` no user with that email
/// - `409` the change would leave the company without an admin
pub async fn add_member(
    State(state): State<AppState>,
    scope: CompanyScope,
    ValidJson(req): ValidJson<AddMemberRequest>,
) -> ApiResult<ApiResponse<Membership>> {
    scope.require(ResourcePermission::Manage)?;
    let company_id = scope.company_id();

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let mut tx = state.db.begin().await?;
    let admins = Membership::lock_admins(&mut tx, company_id).await?;
    let current = Membership::get_role(&mut *tx, company_id, user.id).await?;

    if let Some(current) = current {
        if removes_last_admin(current, Some(req.role), admins.len()) {
            return Err(ApiError::Conflict("A company needs at least one admin".to_string()));
        }
    }

    let membership = Membership::upsert(&mut *tx, company_id, user.id, req.role).await?;
    tx.commit().await?;

    tracing::info!(
        %company_id,
        user_id = %user.id,
        role = req.role.as_str(),
        added_by = %scope.user_id,
        "Member saved"
    );

    let response = if current.is_some() {
        ApiResponse::ok(membership)
    } else {
        ApiResponse::created(membership)
    };

    Ok(response)
}

pub async fn remove_member(
    State(state): State<AppState>,
    scope: CompanyScope,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    scope.require(ResourcePermission::Manage)?;
    let company_id = scope.company_id();

    let mut tx = state.db.begin().await?;
    let admins = Membership::lock_admins(&mut tx, company_id).await?;
    let role = Membership::get_role(&mut *tx, company_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Member"))?;

    if removes_last_admin(role, None, admins.len()) {
        return Err(ApiError::Conflict("Cannot remove the last admin".to_string()));
    }

    if !Membership::delete(&mut *tx, company_id, user_id).await? {
        return Err(ApiError::not_found("Member"));
    }
    tx.commit().await?;

    tracing::info!(%company_id, %user_id, removed_by = %scope.user_id, "Member removed");

    Ok(Deleted::yes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_admin_guard() {
        assert!(removes_last_admin(CompanyRole::Admin, None, 1));
        assert!(removes_last_admin(CompanyRole::Admin, Some(CompanyRole::Manager), 1));
        assert!(!removes_last_admin(CompanyRole::Admin, Some(CompanyRole::Admin), 1));
        assert!(!removes_last_admin(CompanyRole::Admin, None, 2));
        assert!(!removes_last_admin(CompanyRole::Viewer, None, 1));
    }

    #[test]
    fn test_add_member_request() {
        let req: AddMemberRequest =
            serde_json::from_str(r#"{"email":"luis@example.com","role":"operator"}"#).unwrap();
        assert_eq!(req.role, CompanyRole::Operator);
        assert!(req.validate().is_ok());

        let bad: AddMemberRequest = serde_json::from_str(r#"{"email":"nope","role":"viewer"}"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let parsed = serde_json::from_str::<AddMemberRequest>(r#"{"email":"a@b.co","role":"owner"}"#);
        assert!(parsed.is_err());
    }
}
