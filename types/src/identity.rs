//! Caller identity carried through a single request.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The `(username, organization)` pair extracted from a verified token.
///
/// Owned by the in-flight request and dropped with it; nothing about an
/// identity is stored server-side.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub organization: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            organization: organization.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.organization)
    }
}
