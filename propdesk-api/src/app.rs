//! Application state and router builder

use crate::{
    cache::DashboardCache,
    config::Config,
    error::ApiError,
    middleware::security::SecurityHeadersLayer,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use axum_extra::extract::CookieJar;
use propdesk_shared::auth::{
    context::{AuthContext, SessionSource},
    jwt,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub dashboard_cache: DashboardCache,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let dashboard_cache = DashboardCache::with_ttl(Duration::from_secs(config.cache.ttl_secs));

        Self {
            db,
            config: Arc::new(config),
            dashboard_cache,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /health                                   public
/// /v1/auth/{register,login,refresh,logout}  public
/// /v1/auth/me                               session
/// /v1/companies[/current[/members]|/switch] session
/// /v1/{buildings,units,tenants,contracts,payments,maintenance}
/// /v1/marketplace/{services,bookings,commissions}
/// /v1/crm/leads
/// /v1/analytics/morosidad[/:tenant_id]
/// /v1/dashboard                             session + company scope
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout));

    let session_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .nest("/companies", company_routes())
        .nest("/buildings", routes::buildings::router())
        .nest("/units", routes::units::router())
        .nest("/tenants", routes::tenants::router())
        .nest("/contracts", routes::contracts::router())
        .nest("/payments", routes::payments::router())
        .nest("/maintenance", routes::maintenance::router())
        .nest("/marketplace", routes::marketplace::router())
        .nest("/crm", routes::crm::router())
        .nest("/analytics", routes::analytics::router())
        .route("/dashboard", get(routes::dashboard::get_dashboard))
        .layer(axum::middleware::from_fn_with_state(state.clone(), session_auth_layer));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes)
        .merge(session_routes);

    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::HeaderName::from_static(propdesk_shared::scope::COMPANY_HEADER),
            ])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn company_routes() -> Router<AppState> {
    use crate::routes::companies;

    Router::new()
        .route("/", get(companies::list_companies).post(companies::create_company))
        .route("/switch", post(companies::switch_company))
        .route(
            "/current",
            get(companies::get_current_company).patch(companies::update_current_company),
        )
        .route(
            "/current/members",
            get(companies::list_members).post(companies::add_member),
        )
        .route("/current/members/:user_id", delete(companies::remove_member))
}

/// Session authentication middleware
///
/// Accepts an access token from the `Authorization: Bearer` header or, when
/// the header is absent, from the session cookie. Inserts [`AuthContext`]
/// into the request extensions.
async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (token, source) = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;
            (token.to_string(), SessionSource::Bearer)
        }
        None => {
            let jar = CookieJar::from_headers(req.headers());
            let token = jar
                .get(&state.config.session.session_cookie)
                .map(|c| c.value().to_string())
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ApiError::Unauthorized("Missing session".to_string()))?;
            (token, SessionSource::Cookie)
        }
    };

    let claims = jwt::validate_access_token(&token, state.jwt_secret())?;
    req.extensions_mut().insert(AuthContext::from_claims(&claims, source));

    Ok(next.run(req).await)
}
