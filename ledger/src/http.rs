//! HTTP client for an out-of-process ledger adapter.
//!
//! The adapter hosts the actual ledger SDK. Contract:
//! - `POST {base}/users` with `{"username", "orgName"}` enrolls a user.
//! - `POST {base}/ops/{operation}` with `{"identity", "request"}` runs one
//!   operation.
//!
//! A JSON reply carrying `"success": false` is a rejection; its `message` is
//! relayed verbatim.

use std::time::Duration;

use async_trait::async_trait;
use ledgerway_types::Identity;
use serde_json::{json, Value};
use tracing::debug;

use crate::{LedgerClient, LedgerError, LedgerRequest};

/// Default timeout for a single adapter call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`LedgerClient`] backed by a ledger adapter reachable over HTTP.
#[derive(Clone)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLedgerClient {
    /// Create a client targeting `base_url` (e.g. `http://127.0.0.1:7059`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Unreachable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, LedgerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "calling ledger adapter");

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                LedgerError::Unreachable(format!("request timed out: {e}"))
            } else {
                LedgerError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status();
        let reply: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("HTTP {status}: {e}")))?;

        check_reply(reply)
    }
}

/// Turn an adapter reply into a result, honouring its `success` flag.
fn check_reply(reply: Value) -> Result<Value, LedgerError> {
    if reply.get("success").and_then(Value::as_bool) == Some(false) {
        let message = match reply.get("message") {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => "ledger operation failed".to_string(),
        };
        return Err(LedgerError::Rejected(message));
    }
    Ok(reply)
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn enroll(&self, username: &str, organization: &str) -> Result<Value, LedgerError> {
        self.post(
            "/users",
            json!({ "username": username, "orgName": organization }),
        )
        .await
    }

    async fn execute(
        &self,
        request: LedgerRequest,
        identity: &Identity,
    ) -> Result<Value, LedgerError> {
        let path = format!("/ops/{}", request.operation());
        self.post(&path, json!({ "identity": identity, "request": request }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ListChannels;
    use axum::{routing::post, Json, Router};

    async fn spawn_adapter(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn failure_reply_becomes_rejection() {
        let result = check_reply(json!({ "success": false, "message": "channel exists" }));
        assert_eq!(result, Err(LedgerError::Rejected("channel exists".into())));
    }

    #[test]
    fn reply_without_flag_is_success() {
        let reply = json!({ "height": 7 });
        assert_eq!(check_reply(reply.clone()), Ok(reply));
    }

    #[tokio::test]
    async fn execute_posts_to_operation_path() {
        let router = Router::new().route(
            "/ops/list_channels",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "channels": [body["request"]["peer"].clone()],
                    "caller": body["identity"]["username"].clone(),
                }))
            }),
        );
        let base = spawn_adapter(router).await;
        let client = HttpLedgerClient::new(base, DEFAULT_TIMEOUT).unwrap();

        let reply = client
            .execute(
                LedgerRequest::ListChannels(ListChannels {
                    peer: "peer1".into(),
                }),
                &Identity::new("alice", "org1"),
            )
            .await
            .unwrap();

        assert_eq!(reply["channels"][0], "peer1");
        assert_eq!(reply["caller"], "alice");
    }

    #[tokio::test]
    async fn unreachable_adapter_is_reported() {
        let client = HttpLedgerClient::new("http://127.0.0.1:1", DEFAULT_TIMEOUT).unwrap();
        let result = client.enroll("alice", "org1").await;
        assert!(matches!(result, Err(LedgerError::Unreachable(_))));
    }
}
