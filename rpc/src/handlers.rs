//! Ledger operation handlers.
//!
//! Each handler checks its required fields in a fixed order and fails on the
//! first missing one without touching the ledger collaborator. Once every
//! field is present the operation is dispatched with the caller's identity
//! and the collaborator's result becomes the response envelope.

use std::sync::Arc;

use axum::extract::State;
use axum::Extension;
use ledgerway_ledger::{
    BlockByHash, BlockByNumber, ChainInfo, CreateChannel, InstallChaincode, InstallType,
    InstantiateChaincode, InvokeChaincode, JoinChannel, LedgerError, LedgerRequest,
    ListChaincodes, ListChannels, QueryChaincode, TransactionById,
};
use ledgerway_types::Identity;
use serde_json::{json, Value};
use tracing::{debug, warn, Instrument};

use crate::args::decode_query_args;
use crate::params::{require, JsonBody, PathParams, QueryParams};
use crate::tracing_spans::{identity_span, ledger_op_span};
use crate::{Envelope, RpcError, RpcState};

type RpcResult = Result<Envelope, RpcError>;

/// Hand a validated request to the collaborator and envelope the outcome.
async fn dispatch(state: &RpcState, identity: &Identity, request: LedgerRequest) -> RpcResult {
    let span = ledger_op_span(request.operation(), identity);
    async move {
        match state.ledger.execute(request, identity).await {
            Ok(result) => {
                debug!("ledger operation succeeded");
                Ok(Envelope::success(result))
            }
            Err(e) => {
                warn!(error = %e, "ledger operation failed");
                Err(RpcError::Ledger(e))
            }
        }
    }
    .instrument(span)
    .await
}

// ── Identity ─────────────────────────────────────────────────────────────

/// `POST /identity`: sign a token and enroll the user with the ledger.
pub async fn issue_identity(State(state): State<Arc<RpcState>>, body: JsonBody) -> RpcResult {
    let username = body.require("'username'")?;
    let org_name = body.require("'orgName'")?;

    let span = identity_span(&username, &org_name);
    async move {
        debug!("issuing identity token");
        let token = state.tokens.issue(&username, &org_name)?;
        let response = state.ledger.enroll(&username, &org_name).await?;
        enrollment_envelope(response, token)
    }
    .instrument(span)
    .await
}

/// Merge the signed token into the enrollment response.
///
/// A bare string (or nothing) from the collaborator describes a failure.
fn enrollment_envelope(response: Value, token: String) -> RpcResult {
    match response {
        Value::Object(mut fields) => {
            fields.insert("token".into(), Value::String(token));
            fields.entry("success").or_insert(Value::Bool(true));
            Ok(Envelope::with_body(Value::Object(fields)))
        }
        Value::String(message) => Err(LedgerError::Rejected(message).into()),
        Value::Null => Err(LedgerError::Rejected("user enrollment returned no response".into()).into()),
        other => Ok(Envelope::with_body(
            json!({ "success": true, "token": token, "result": other }),
        )),
    }
}

// ── Channels ─────────────────────────────────────────────────────────────

/// `POST /channels`
pub async fn create_channel(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    body: JsonBody,
) -> RpcResult {
    debug!(?body, "create channel");
    let request = CreateChannel {
        channel_name: body.require("'channelName'")?,
        channel_config_path: body.require("'channelConfigPath'")?,
    };
    dispatch(&state, &identity, LedgerRequest::CreateChannel(request)).await
}

/// `POST /channels/:channel_name/peers`
pub async fn join_channel(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    PathParams(channel_name): PathParams<String>,
    body: JsonBody,
) -> RpcResult {
    debug!(channel = %channel_name, ?body, "join channel");
    let request = JoinChannel {
        channel_name: require("'channelName'", Some(channel_name))?,
        peers: body.require_list("'peers'")?,
    };
    dispatch(&state, &identity, LedgerRequest::JoinChannel(request)).await
}

// ── Chaincode lifecycle ──────────────────────────────────────────────────

/// `POST /chaincodes`
pub async fn install_chaincode(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    body: JsonBody,
) -> RpcResult {
    debug!(?body, "install chaincode");
    let request = InstallChaincode {
        peers: body.require_list("'peers'")?,
        chaincode_name: body.require("'chaincodeName'")?,
        chaincode_path: body.require("'chaincodePath'")?,
        chaincode_version: body.require("'chaincodeVersion'")?,
    };
    dispatch(&state, &identity, LedgerRequest::InstallChaincode(request)).await
}

/// `POST /channels/:channel_name/chaincodes`
pub async fn instantiate_chaincode(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    PathParams(channel_name): PathParams<String>,
    body: JsonBody,
) -> RpcResult {
    debug!(channel = %channel_name, ?body, "instantiate chaincode");
    let chaincode_name = body.require("'chaincodeName'")?;
    let chaincode_version = body.require("'chaincodeVersion'")?;
    let channel_name = require("'channelName'", Some(channel_name))?;
    let args = body.require_present_list("'args'")?;
    let request = InstantiateChaincode {
        channel_name,
        chaincode_name,
        chaincode_version,
        fcn: body.optional("'fcn'")?,
        args,
    };
    dispatch(&state, &identity, LedgerRequest::InstantiateChaincode(request)).await
}

/// `POST /channels/:channel_name/chaincodes/:chaincode_name`
pub async fn invoke_chaincode(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    PathParams((channel_name, chaincode_name)): PathParams<(String, String)>,
    body: JsonBody,
) -> RpcResult {
    debug!(channel = %channel_name, chaincode = %chaincode_name, ?body, "invoke chaincode");
    let chaincode_name = require("'chaincodeName'", Some(chaincode_name))?;
    let channel_name = require("'channelName'", Some(channel_name))?;
    let fcn = body.require("'fcn'")?;
    let args = body.require_present_list("'args'")?;
    let request = InvokeChaincode {
        peers: body.optional_list("'peers'")?,
        channel_name,
        chaincode_name,
        fcn,
        args,
    };
    dispatch(&state, &identity, LedgerRequest::InvokeChaincode(request)).await
}

/// `GET /channels/:channel_name/chaincodes/:chaincode_name?fcn=&args=&peer=`
pub async fn query_chaincode(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    PathParams((channel_name, chaincode_name)): PathParams<(String, String)>,
    params: QueryParams,
) -> RpcResult {
    debug!(channel = %channel_name, chaincode = %chaincode_name, ?params, "query chaincode");
    let chaincode_name = require("'chaincodeName'", Some(chaincode_name))?;
    let channel_name = require("'channelName'", Some(channel_name))?;
    let fcn = params.require("'fcn'")?;
    let args = decode_query_args(&params.require("'args'")?)?;
    let request = QueryChaincode {
        peer: params.optional("'peer'")?,
        channel_name,
        chaincode_name,
        fcn,
        args,
    };
    dispatch(&state, &identity, LedgerRequest::QueryChaincode(request)).await
}

// ── Blocks and transactions ──────────────────────────────────────────────

/// `GET /channels/:channel_name/blocks/:block_id?peer=`
pub async fn block_by_number(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    PathParams((channel_name, block_id)): PathParams<(String, String)>,
    params: QueryParams,
) -> RpcResult {
    debug!(channel = %channel_name, block = %block_id, ?params, "get block by number");
    let request = BlockByNumber {
        block_id: require("'blockId'", Some(block_id))?,
        peer: params.optional("'peer'")?,
        channel_name,
    };
    dispatch(&state, &identity, LedgerRequest::BlockByNumber(request)).await
}

/// `GET /channels/:channel_name/blocks?hash=&peer=`
pub async fn block_by_hash(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    PathParams(channel_name): PathParams<String>,
    params: QueryParams,
) -> RpcResult {
    debug!(channel = %channel_name, ?params, "get block by hash");
    let request = BlockByHash {
        hash: params.require("'hash'")?,
        peer: params.optional("'peer'")?,
        channel_name,
    };
    dispatch(&state, &identity, LedgerRequest::BlockByHash(request)).await
}

/// `GET /channels/:channel_name/transactions/:trxn_id?peer=`
pub async fn transaction_by_id(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    PathParams((channel_name, trxn_id)): PathParams<(String, String)>,
    params: QueryParams,
) -> RpcResult {
    debug!(channel = %channel_name, trxn = %trxn_id, "get transaction by id");
    let request = TransactionById {
        trxn_id: require("'trxnId'", Some(trxn_id))?,
        peer: params.optional("'peer'")?,
        channel_name,
    };
    dispatch(&state, &identity, LedgerRequest::TransactionById(request)).await
}

/// `GET /channels/:channel_name?peer=`
pub async fn chain_info(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    PathParams(channel_name): PathParams<String>,
    params: QueryParams,
) -> RpcResult {
    debug!(channel = %channel_name, "get channel information");
    let request = ChainInfo {
        peer: params.optional("'peer'")?,
        channel_name,
    };
    dispatch(&state, &identity, LedgerRequest::ChainInfo(request)).await
}

// ── Listings ─────────────────────────────────────────────────────────────

/// `GET /chaincodes?peer=&type=installed|instantiated`
pub async fn list_chaincodes(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    params: QueryParams,
) -> RpcResult {
    debug!(?params, "list chaincodes");
    let install_type: InstallType = params
        .require("'type'")?
        .parse()
        .map_err(|_| RpcError::Validation("'type'"))?;
    let request = ListChaincodes {
        peer: params.require("'peer'")?,
        install_type,
    };
    dispatch(&state, &identity, LedgerRequest::ListChaincodes(request)).await
}

/// `GET /channels?peer=`
pub async fn list_channels(
    State(state): State<Arc<RpcState>>,
    Extension(identity): Extension<Identity>,
    params: QueryParams,
) -> RpcResult {
    debug!(?params, "list channels");
    let request = ListChannels {
        peer: params.require("'peer'")?,
    };
    dispatch(&state, &identity, LedgerRequest::ListChannels(request)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrollment_object_gains_token_and_success() {
        let envelope =
            enrollment_envelope(json!({ "secret": "s3cr3t" }), "tok".into()).unwrap();
        assert_eq!(
            envelope.body(),
            &json!({ "secret": "s3cr3t", "token": "tok", "success": true })
        );
    }

    #[test]
    fn enrollment_string_is_a_failure() {
        let err = enrollment_envelope(json!("user already registered"), "tok".into()).unwrap_err();
        assert_eq!(err.to_string(), "user already registered");
    }

    #[test]
    fn enrollment_null_is_a_failure() {
        assert!(enrollment_envelope(Value::Null, "tok".into()).is_err());
    }

    #[test]
    fn enrollment_scalar_is_wrapped() {
        let envelope = enrollment_envelope(json!(42), "tok".into()).unwrap();
        assert_eq!(
            envelope.body(),
            &json!({ "success": true, "token": "tok", "result": 42 })
        );
    }
}
