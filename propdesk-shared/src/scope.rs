//! Active company resolution
//!
//! A user can belong to several companies, so every request has to say which
//! one it acts on. Four inputs can carry that choice, checked in this order:
//!
//! 1. `companyId` query parameter
//! 2. `X-Company-Id` header
//! 3. `activeCompanyId` cookie (set by the company switcher)
//! 4. `company_id` claim of the session token
//!
//! The first present, non-blank value wins. Resolution only picks the value;
//! whether the user may act on that company is decided by
//! [`crate::auth::authorization::resolve_company_access`].

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Query parameter carrying an explicit company
pub const COMPANY_QUERY_PARAM: &str = "companyId";

/// Header carrying an explicit company
pub const COMPANY_HEADER: &str = "x-company-id";

/// Default name of the company switcher cookie
pub const DEFAULT_COMPANY_COOKIE: &str = "activeCompanyId";

/// Which input the active company came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeSource {
    Query,
    Header,
    Cookie,
    Jwt,
}

impl fmt::Display for ScopeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeSource::Query => "query parameter",
            ScopeSource::Header => "header",
            ScopeSource::Cookie => "cookie",
            ScopeSource::Jwt => "session",
        };
        f.write_str(name)
    }
}

/// Raw candidate values for one request
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeInputs<'a> {
    pub query: Option<&'a str>,
    pub header: Option<&'a str>,
    pub cookie: Option<&'a str>,
    pub jwt: Option<&'a str>,
}

/// The winning candidate, not yet parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedScope<'a> {
    pub company_id: &'a str,
    pub source: ScopeSource,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("No active company: pass companyId, X-Company-Id or select a company")]
    Missing,

    #[error("Malformed company id in {origin}: {value}")]
    Malformed { origin: ScopeSource, value: String },
}

/// Picks the active company candidate by precedence.
///
/// Blank values (empty or whitespace) count as absent; values are trimmed.
pub fn resolve_company_scope<'a>(inputs: ScopeInputs<'a>) -> Option<ResolvedScope<'a>> {
    [
        (inputs.query, ScopeSource::Query),
        (inputs.header, ScopeSource::Header),
        (inputs.cookie, ScopeSource::Cookie),
        (inputs.jwt, ScopeSource::Jwt),
    ]
    .into_iter()
    .find_map(|(value, source)| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|company_id| ResolvedScope { company_id, source })
    })
}

/// Parses the winning candidate.
///
/// A malformed value is an error even when a lower-precedence input holds a
/// valid id.
pub fn parse_company_id(scope: &ResolvedScope<'_>) -> Result<Uuid, ScopeError> {
    Uuid::parse_str(scope.company_id).map_err(|_| ScopeError::Malformed {
        origin: scope.source,
        value: scope.company_id.to_string(),
    })
}

/// Resolve and parse in one step.
pub fn resolve_company_id(inputs: ScopeInputs<'_>) -> Result<(Uuid, ScopeSource), ScopeError> {
    let scope = resolve_company_scope(inputs).ok_or(ScopeError::Missing)?;
    let id = parse_company_id(&scope)?;
    Ok((id, scope.source))
}
