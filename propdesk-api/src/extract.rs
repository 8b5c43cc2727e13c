//! Request extractors
//!
//! - [`CompanyScope`]: authenticated user plus the active company and the
//!   user's role in it
//! - [`ValidJson`]: JSON body that has passed `validator` checks
//! - [`ApiQuery`], [`ApiPath`]: query and path extraction whose rejections
//!   render as the error envelope

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Extension, Json, RequestPartsExt,
};
use axum_extra::extract::CookieJar;
use propdesk_shared::{
    auth::{
        authorization::{resolve_company_access, CompanyAccess, ResourcePermission},
        context::AuthContext,
    },
    scope::{
        resolve_company_id, ScopeError, ScopeInputs, ScopeSource, COMPANY_HEADER,
        COMPANY_QUERY_PARAM,
    },
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Authenticated user of the request, inserted by the session layer.
pub struct CurrentUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Extension(ctx) = parts
            .extract::<Extension<AuthContext>>()
            .await
            .map_err(|_| ApiError::Unauthorized("Authentication required".to_string()))?;
        Ok(CurrentUser(ctx))
    }
}

/// The company a request acts on, with the caller's access to it
#[derive(Debug, Clone)]
pub struct CompanyScope {
    pub user_id: Uuid,
    pub access: CompanyAccess,
    pub source: ScopeSource,
}

impl CompanyScope {
    pub fn company_id(&self) -> Uuid {
        self.access.company_id
    }

    pub fn require(&self, permission: ResourcePermission) -> ApiResult<()> {
        self.access.require(permission).map_err(ApiError::from)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CompanyScope {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(ctx) = CurrentUser::from_request_parts(parts, state).await?;

        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        // A header that is not visible ASCII is a malformed value, not an absent one
        let header = match parts.headers.get(COMPANY_HEADER) {
            Some(value) => Some(value.to_str().map_err(|_| ScopeError::Malformed {
                origin: ScopeSource::Header,
                value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            })?),
            None => None,
        };
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(&state.config.session.company_cookie).map(|c| c.value());
        let jwt = ctx.session_company_id.map(|id| id.to_string());

        let (company_id, source) = resolve_company_id(ScopeInputs {
            query: query.get(COMPANY_QUERY_PARAM).map(String::as_str),
            header,
            cookie,
            jwt: jwt.as_deref(),
        })?;

        let access = resolve_company_access(&state.db, ctx.user_id, company_id).await?;

        tracing::debug!(user_id = %ctx.user_id, %company_id, %source, role = access.role.as_str(), "Company scope resolved");

        Ok(CompanyScope {
            user_id: ctx.user_id,
            access,
            source,
        })
    }
}

/// JSON body validated with [`Validate`]
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// Query string with enveloped rejections
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

/// Path parameters with enveloped rejections
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}
