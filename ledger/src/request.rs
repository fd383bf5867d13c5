//! Validated ledger operation requests.
//!
//! Each struct is constructed only after every required field has been
//! checked for presence, so malformed input never reaches a collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannel {
    pub channel_name: String,
    pub channel_config_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChannel {
    pub channel_name: String,
    pub peers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallChaincode {
    pub peers: Vec<String>,
    pub chaincode_name: String,
    pub chaincode_path: String,
    pub chaincode_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantiateChaincode {
    pub channel_name: String,
    pub chaincode_name: String,
    pub chaincode_version: String,
    pub fcn: Option<String>,
    pub args: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeChaincode {
    /// Target peers; empty means the collaborator picks its defaults.
    pub peers: Vec<String>,
    pub channel_name: String,
    pub chaincode_name: String,
    pub fcn: String,
    pub args: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryChaincode {
    pub peer: Option<String>,
    pub channel_name: String,
    pub chaincode_name: String,
    pub fcn: String,
    pub args: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockByNumber {
    pub peer: Option<String>,
    pub channel_name: String,
    pub block_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockByHash {
    pub peer: Option<String>,
    pub channel_name: String,
    pub hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionById {
    pub peer: Option<String>,
    pub channel_name: String,
    pub trxn_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub peer: Option<String>,
    pub channel_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChannels {
    pub peer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChaincodes {
    pub peer: String,
    pub install_type: InstallType,
}

/// Which chaincode listing to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallType {
    Installed,
    Instantiated,
}

impl InstallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Instantiated => "instantiated",
        }
    }
}

impl fmt::Display for InstallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "installed" => Ok(Self::Installed),
            "instantiated" => Ok(Self::Instantiated),
            _ => Err(()),
        }
    }
}

/// One ledger operation, ready for dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum LedgerRequest {
    CreateChannel(CreateChannel),
    JoinChannel(JoinChannel),
    InstallChaincode(InstallChaincode),
    InstantiateChaincode(InstantiateChaincode),
    InvokeChaincode(InvokeChaincode),
    QueryChaincode(QueryChaincode),
    BlockByNumber(BlockByNumber),
    BlockByHash(BlockByHash),
    TransactionById(TransactionById),
    ChainInfo(ChainInfo),
    ListChannels(ListChannels),
    ListChaincodes(ListChaincodes),
}

impl LedgerRequest {
    /// Stable operation name used for logging, metrics and adapter routing.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateChannel(_) => "create_channel",
            Self::JoinChannel(_) => "join_channel",
            Self::InstallChaincode(_) => "install_chaincode",
            Self::InstantiateChaincode(_) => "instantiate_chaincode",
            Self::InvokeChaincode(_) => "invoke_chaincode",
            Self::QueryChaincode(_) => "query_chaincode",
            Self::BlockByNumber(_) => "block_by_number",
            Self::BlockByHash(_) => "block_by_hash",
            Self::TransactionById(_) => "transaction_by_id",
            Self::ChainInfo(_) => "chain_info",
            Self::ListChannels(_) => "list_channels",
            Self::ListChaincodes(_) => "list_chaincodes",
        }
    }
}
