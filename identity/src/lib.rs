//! Identity token service.
//!
//! Issues and verifies HS256 tokens binding a `(username, organization)` pair
//! with an expiry. The service keeps no per-user state: a token's validity is
//! decided entirely by its signature and expiry at verification time.

pub mod error;
pub mod token;

pub use error::TokenError;
pub use token::{Claims, TokenService, DEFAULT_TOKEN_TTL_SECS};
