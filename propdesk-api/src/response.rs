//! Success envelope
//!
//! ```json
//! { "success": true, "data": { ... } }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

/// A successful response: status plus enveloped payload
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }

    pub fn with_status(status: StatusCode, data: T) -> Self {
        Self { status, data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Json(Envelope {
            success: true,
            data: self.data,
        });
        (self.status, body).into_response()
    }
}

/// Payload of delete endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

impl Deleted {
    pub fn yes() -> ApiResponse<Deleted> {
        ApiResponse::ok(Deleted { deleted: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_created_envelope() {
        let response = ApiResponse::created(serde_json::json!({ "id": 7 })).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "success": true, "data": { "id": 7 } }));
    }

    #[tokio::test]
    async fn test_deleted_payload() {
        let response = Deleted::yes().into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Envelope<Deleted> = serde_json::from_slice(&bytes).unwrap();
        assert!(body.success);
        assert!(body.data.deleted);
    }
}
