//! Authenticated principal
//!
//! Produced by the API's session layer after a token has been validated and
//! inserted into the request extensions. Company access is decided later,
//! per request, by the scope resolver.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::Claims;

/// Where the session token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    /// `Authorization: Bearer` header
    Bearer,

    /// Session cookie
    Cookie,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,

    /// Company embedded in the session token
    pub session_company_id: Option<Uuid>,

    pub source: SessionSource,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims, source: SessionSource) -> Self {
        Self {
            user_id: claims.sub,
            session_company_id: claims.company_id,
            source,
        }
    }
}
