//! Authentication endpoints
//!
//! - `POST /v1/auth/register`: user, company and admin membership in one transaction
//! - `POST /v1/auth/login`: password login
//! - `POST /v1/auth/refresh`: refresh token for a new access token
//! - `POST /v1/auth/logout`: clears the session and company cookies
//! - `GET /v1/auth/me`: current user and companies
//!
//! Login and registration return the token pair in the body and also set
//! the access token as an `HttpOnly` session cookie for browser clients.

use crate::{
    app::AppState,
    config::Config,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{CurrentUser, ValidJson},
    response::ApiResponse,
};
use axum::extract::State;
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use propdesk_shared::{
    auth::{jwt, password},
    models::{
        company::{Company, CompanyPlan, CreateCompany},
        membership::{CompanyMembership, CompanyRole, Membership},
        user::{CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked for strength after the field validation
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Company name must be 1-255 characters"))]
    pub company_name: Option<String>,

    #[validate(length(max = 64, message = "Tax id must be at most 64 characters"))]
    pub tax_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,

    /// Company embedded in the tokens, if the user has any
    pub company_id: Option<Uuid>,

    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub companies: Vec<CompanyMembership>,
    pub session_company_id: Option<Uuid>,
}

/// Session cookie carrying the access token
pub(crate) fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((config.session.session_cookie.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.api.production)
        .build()
}

/// Company switcher cookie; readable by the front end
pub(crate) fn company_cookie(config: &Config, company_id: Uuid) -> Cookie<'static> {
    Cookie::build((config.session.company_cookie.clone(), company_id.to_string()))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(config.api.production)
        .build()
}

/// Expired, empty cookie. Sent unconditionally so clients drop it even when
/// the request did not carry it.
fn removal(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), "")).path("/").build();
    cookie.make_removal();
    cookie
}

fn default_company_name(req: &RegisterRequest) -> String {
    match req.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{name}'s company"),
        None => "My company".to_string(),
    }
}

/// Register a new user
///
/// ```text
/// POST /v1/auth/register
/// { "email": "ana@example.com", "password": "S3cure!pass", "name": "Ana", "company_name": "Fincas Ana" }
/// ```
///
/// # Errors
///
/// - `422` validation failed or weak password
/// - `409` email or tax id already registered
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<(CookieJar, ApiResponse<SessionResponse>)> {
    password::validate_password_strength(&req.password).map_err(|message| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;
    let company_name = req
        .company_name
        .clone()
        .unwrap_or_else(|| default_company_name(&req));

    let mut tx = state.db.begin().await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
        },
    )
    .await?;

    let company = Company::create(
        &mut *tx,
        CreateCompany {
            name: company_name,
            tax_id: req.tax_id,
            plan: CompanyPlan::Trial,
            ..Default::default()
        },
    )
    .await?;

    Membership::create(&mut *tx, company.id, user.id, CompanyRole::Admin).await?;

    tx.commit().await?;

    let tokens = jwt::issue_token_pair(user.id, Some(company.id), state.jwt_secret())?;

    tracing::info!(user_id = %user.id, company_id = %company.id, "User registered");

    let jar = jar
        .add(session_cookie(&state.config, tokens.access_token.clone()))
        .add(company_cookie(&state.config, company.id));

    Ok((
        jar,
        ApiResponse::created(SessionResponse {
            user,
            company_id: Some(company.id),
            tokens,
        }),
    ))
}

/// Password login
///
/// The first (oldest) membership becomes the token's company. Users without
/// any membership still log in, with no company in the token.
///
/// # Errors
///
/// - `401` unknown email, wrong password or disabled account
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse<SessionResponse>)> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    if !user.active {
        return Err(ApiError::Unauthorized("User account is disabled".to_string()));
    }

    let company_id = Membership::list_for_user(&state.db, user.id)
        .await?
        .first()
        .map(|m| m.company_id);

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, company_id, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, company_id = ?company_id, "User logged in");

    let mut jar = jar.add(session_cookie(&state.config, tokens.access_token.clone()));
    if let Some(company_id) = company_id {
        jar = jar.add(company_cookie(&state.config, company_id));
    }

    Ok((jar, ApiResponse::ok(SessionResponse { user, company_id, tokens })))
}

/// Exchanges a refresh token for a new access token and renews the session cookie.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> ApiResult<(CookieJar, ApiResponse<RefreshResponse>)> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    let jar = jar.add(session_cookie(&state.config, access_token.clone()));

    Ok((
        jar,
        ApiResponse::ok(RefreshResponse {
            access_token,
            expires_in: jwt::TokenType::Access.default_expiration().num_seconds(),
        }),
    ))
}

/// Clears both cookies. Tokens are stateless and stay valid until they expire.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, ApiResponse<LogoutResponse>) {
    let jar = jar
        .add(removal(&state.config.session.session_cookie))
        .add(removal(&state.config.session.company_cookie));

    (jar, ApiResponse::ok(LogoutResponse { logged_out: true }))
}

pub async fn me(State(state): State<AppState>, CurrentUser(ctx): CurrentUser) -> ApiResult<ApiResponse<MeResponse>> {
    let user = User::find_by_id(&state.db, ctx.user_id)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| ApiError::Unauthorized("User account is disabled".to_string()))?;

    let companies = Membership::list_for_user(&state.db, user.id).await?;

    Ok(ApiResponse::ok(MeResponse {
        user,
        companies,
        session_company_id: ctx.session_company_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, CacheConfig, DatabaseConfig, JwtConfig, SessionConfig};

    fn config(production: bool) -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/propdesk".to_string(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long!".to_string(),
            },
            session: SessionConfig::default(),
            cache: CacheConfig { ttl_secs: 30 },
        }
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(&config(true), "abc".to_string());
        assert_eq!(cookie.name(), "session_token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_company_cookie_not_secure_in_development() {
        let id = Uuid::new_v4();
        let cookie = company_cookie(&config(false), id);
        assert_eq!(cookie.name(), "activeCompanyId");
        assert_eq!(cookie.value(), id.to_string());
        assert_eq!(cookie.secure(), Some(false));
        assert_ne!(cookie.http_only(), Some(true));
    }

    #[test]
    fn test_default_company_name() {
        let mut req = RegisterRequest {
            email: "ana@example.com".to_string(),
            password: "S3cure!pass".to_string(),
            name: Some("Ana".to_string()),
            company_name: None,
            tax_id: None,
        };
        assert_eq!(default_company_name(&req), "Ana's company");

        req.name = Some("   ".to_string());
        assert_eq!(default_company_name(&req), "My company");
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            name: None,
            company_name: Some(String::new()),
            tax_id: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("company_name"));
    }
}
