//! Decoding of chaincode argument lists.
//!
//! Query arguments arrive in the URL as a list literal that may use single
//! quotes, e.g. `args=['a','b']`. This module is the only place that looks at
//! that raw encoding; handlers receive a plain `Vec<String>`.

use serde_json::Value;

use crate::RpcError;

const ARGS: &str = "'args'";

/// Decode a string-encoded argument list into its elements.
pub fn decode_query_args(raw: &str) -> Result<Vec<String>, RpcError> {
    let normalized = raw.replace('\'', "\"");
    let values: Vec<Value> =
        serde_json::from_str(&normalized).map_err(|_| RpcError::Validation(ARGS))?;
    normalize_list(ARGS, values)
}

/// Flatten JSON scalars into strings. Nested arrays, objects and nulls are
/// rejected as invalid `field`.
pub fn normalize_list(field: &'static str, values: Vec<Value>) -> Result<Vec<String>, RpcError> {
    values
        .into_iter()
        .map(|value| match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(RpcError::Validation(field)),
        })
        .collect()
}
