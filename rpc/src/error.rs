//! RPC error types, rendered as failure envelopes.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledgerway_identity::TokenError;
use ledgerway_ledger::LedgerError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    /// A required field is missing, empty or malformed. Holds the quoted
    /// field name, e.g. `'peer'`.
    #[error("{0} field is missing or Invalid in the request")]
    Validation(&'static str),

    #[error(
        "Failed to authenticate token. Make sure to include the token returned \
         from /identity call in the authorization header as a Bearer token"
    )]
    Authentication { reason: String },

    #[error("{}", .0.client_message())]
    Ledger(#[from] LedgerError),

    #[error("No such organisation in config: {0}")]
    UnknownOrganization(String),

    #[error("request did not complete within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Self::Ledger(_) => StatusCode::BAD_GATEWAY,
            Self::UnknownOrganization(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for RpcError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::MissingField(field) => RpcError::Validation(field),
            TokenError::Signing(reason) => RpcError::Internal(reason),
            other => RpcError::Authentication {
                reason: other.to_string(),
            },
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "message": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}
