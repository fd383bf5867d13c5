use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The collaborator ran the operation and reported failure. The message
    /// is relayed to clients verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("ledger adapter unreachable: {0}")]
    Unreachable(String),

    #[error("invalid ledger adapter response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// Message placed in a failure envelope.
    pub fn client_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
