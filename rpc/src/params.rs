//! Parameter extraction and presence checks shared by the handlers.
//!
//! Bodies, query strings and path segments are read through the extractors
//! here rather than axum's own, so a bad request always gets a failure
//! envelope. Fields are looked up one at a time: a field that is missing,
//! empty or of the wrong type is reported under its own name.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::args::normalize_list;
use crate::RpcError;

/// Field names are carried quoted (`'peer'`) for error messages.
fn key(field: &'static str) -> &'static str {
    field.trim_matches('\'')
}

/// A JSON object body, read field by field.
#[derive(Debug, Default)]
pub struct JsonBody(Map<String, Value>);

impl JsonBody {
    /// An empty body reads as `{}` so that missing fields are reported by
    /// name rather than as a malformed body.
    pub fn parse(body: &Bytes) -> Result<Self, RpcError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice(&body[..]) {
            Ok(Value::Object(fields)) => Ok(Self(fields)),
            _ => Err(RpcError::Validation("'body'")),
        }
    }

    /// A string field. `null` reads as absent; any other non-string is
    /// invalid.
    pub fn string(&self, field: &'static str) -> Result<Option<String>, RpcError> {
        match self.0.get(key(field)) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(RpcError::Validation(field)),
        }
    }

    /// A list field. `null` reads as absent; any other non-array is invalid.
    pub fn list(&self, field: &'static str) -> Result<Option<Vec<Value>>, RpcError> {
        match self.0.get(key(field)) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(values)) => Ok(Some(values.clone())),
            Some(_) => Err(RpcError::Validation(field)),
        }
    }

    pub fn require(&self, field: &'static str) -> Result<String, RpcError> {
        require(field, self.string(field)?)
    }

    pub fn optional(&self, field: &'static str) -> Result<Option<String>, RpcError> {
        Ok(optional(self.string(field)?))
    }

    pub fn require_list(&self, field: &'static str) -> Result<Vec<String>, RpcError> {
        require_list(field, self.list(field)?)
    }

    pub fn require_present_list(&self, field: &'static str) -> Result<Vec<String>, RpcError> {
        require_present_list(field, self.list(field)?)
    }

    pub fn optional_list(&self, field: &'static str) -> Result<Vec<String>, RpcError> {
        optional_list(field, self.list(field)?)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for JsonBody {
    type Rejection = RpcError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state).await.map_err(|e| {
            debug!(error = %e, "unreadable request body");
            RpcError::Validation("'body'")
        })?;
        Self::parse(&bytes)
    }
}

/// The query string as ordered pairs. A field given more than once is
/// invalid.
#[derive(Debug, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn string(&self, field: &'static str) -> Result<Option<String>, RpcError> {
        let mut values = self
            .0
            .iter()
            .filter(|(name, _)| name == key(field))
            .map(|(_, value)| value);
        match (values.next(), values.next()) {
            (None, _) => Ok(None),
            (Some(value), None) => Ok(Some(value.clone())),
            (Some(_), Some(_)) => Err(RpcError::Validation(field)),
        }
    }

    pub fn require(&self, field: &'static str) -> Result<String, RpcError> {
        require(field, self.string(field)?)
    }

    pub fn optional(&self, field: &'static str) -> Result<Option<String>, RpcError> {
        Ok(optional(self.string(field)?))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for QueryParams {
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| Self(pairs))
            .map_err(|e| {
                debug!(error = %e, "malformed query string");
                RpcError::Validation("'query'")
            })
    }
}

/// Path segments, with decoding failures rendered as a failure envelope.
#[derive(Debug)]
pub struct PathParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(segments)| Self(segments))
            .map_err(|e| {
                debug!(error = %e, "undecodable path segment");
                RpcError::Validation("'path'")
            })
    }
}

/// A present, non-empty string.
pub fn require(field: &'static str, value: Option<String>) -> Result<String, RpcError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RpcError::Validation(field)),
    }
}

/// A present, non-empty list of scalars.
pub fn require_list(field: &'static str, value: Option<Vec<Value>>) -> Result<Vec<String>, RpcError> {
    match value {
        Some(values) if !values.is_empty() => normalize_list(field, values),
        _ => Err(RpcError::Validation(field)),
    }
}

/// A present list of scalars, possibly empty.
pub fn require_present_list(
    field: &'static str,
    value: Option<Vec<Value>>,
) -> Result<Vec<String>, RpcError> {
    match value {
        Some(values) => normalize_list(field, values),
        None => Err(RpcError::Validation(field)),
    }
}

/// An optional list of scalars; absent reads as empty.
pub fn optional_list(field: &'static str, value: Option<Vec<Value>>) -> Result<Vec<String>, RpcError> {
    normalize_list(field, value.unwrap_or_default())
}

/// An optional string, with empty treated as absent.
pub fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
