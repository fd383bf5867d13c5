//! Token gate applied to every route except identity issuance, and the
//! envelope for timed-out requests.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ledgerway_identity::TokenService;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::RpcError;

/// The only path served without a token.
pub const IDENTITY_PATH: &str = "/identity";

#[derive(Deserialize)]
struct AccessTokenQuery {
    access_token: Option<String>,
}

/// Verify the caller's bearer token and attach the resulting
/// [`Identity`](ledgerway_types::Identity) to the request extensions.
///
/// A missing or invalid token ends the request with an authentication
/// failure envelope; the downstream handler does not run.
pub async fn require_identity(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == IDENTITY_PATH {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(&request) else {
        warn!(path = %request.uri().path(), "request without bearer token");
        return RpcError::Authentication {
            reason: "missing bearer token".into(),
        }
        .into_response();
    };

    match tokens.verify(&token) {
        Ok(identity) => {
            debug!(
                username = %identity.username,
                org = %identity.organization,
                "decoded identity from token"
            );
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            warn!(path = %request.uri().path(), error = %e, "rejecting token");
            RpcError::from(e).into_response()
        }
    }
}

/// Replace the bare status the timeout layer answers with by a failure
/// envelope. Handlers never produce 408 themselves.
pub async fn timeout_envelope(State(limit): State<Duration>, response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    warn!(limit_secs = limit.as_secs(), "request timed out");
    RpcError::Timeout(limit).into_response()
}

/// The token from `Authorization: Bearer <token>`, falling back to the
/// `access_token` query parameter (browser WebSocket clients cannot set
/// headers).
pub fn bearer_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim().to_string());

    from_header
        .or_else(|| {
            Query::<AccessTokenQuery>::try_from_uri(request.uri())
                .ok()
                .and_then(|Query(query)| query.access_token)
        })
        .filter(|token| !token.is_empty())
}
