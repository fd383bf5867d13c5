//! Success envelope.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// A successful response body. Failures are rendered by [`crate::RpcError`].
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope(Value);

impl Envelope {
    /// `{"success": true, "result": <result>}`
    pub fn success(result: Value) -> Self {
        Self(json!({ "success": true, "result": result }))
    }

    /// A body whose shape is decided by the caller; it must carry `success`.
    pub fn with_body(body: Value) -> Self {
        Self(body)
    }

    pub fn body(&self) -> &Value {
        &self.0
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}
