use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// A required issuance argument was missing or empty. Holds the quoted
    /// request field name, e.g. `'username'`.
    #[error("{0} field is missing or Invalid in the request")]
    MissingField(&'static str),

    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}
