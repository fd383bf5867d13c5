//! Token issuance and verification.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ledgerway_types::{Clock, Identity, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TokenError;

/// Default token lifetime (10 hours).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 36_000;

/// Claims carried inside every token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub username: String,
    #[serde(rename = "orgName")]
    pub org_name: String,
    /// Expiry, Unix seconds.
    pub exp: u64,
    /// Issue time, Unix seconds.
    pub iat: u64,
    /// Unique token id, so two tokens for the same pair never collide.
    pub jti: String,
}

/// Issues and verifies identity tokens with a shared secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
            clock,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Sign a token for `(username, organization)` expiring `ttl` seconds from now.
    pub fn issue(&self, username: &str, organization: &str) -> Result<String, TokenError> {
        if username.is_empty() {
            return Err(TokenError::MissingField("'username'"));
        }
        if organization.is_empty() {
            return Err(TokenError::MissingField("'orgName'"));
        }

        let now = self.clock.now();
        let claims = Claims {
            username: username.to_string(),
            org_name: organization.to_string(),
            exp: now.plus_secs(self.ttl_secs).as_secs(),
            iat: now.as_secs(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check the signature and expiry of `token` and return the identity it binds.
    ///
    /// Expiry is judged against the service clock with no leeway, so an
    /// expired token is reported as [`TokenError::Expired`] even when its
    /// signature is valid.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let claims = self.decode_claims(token)?;
        if Timestamp::new(claims.exp).is_reached_by(self.clock.now()) {
            return Err(TokenError::Expired);
        }
        Ok(Identity::new(claims.username, claims.org_name))
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock in `verify`.
        validation.validate_exp = false;
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerway_nullables::NullClock;

    const SECRET: &[u8] = b"test-secret";

    fn service(clock: &Arc<NullClock>, ttl: u64) -> TokenService {
        TokenService::new(SECRET, ttl, clock.clone())
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let clock = Arc::new(NullClock::new(1_000));
        let tokens = service(&clock, 60);
        let token = tokens.issue("alice", "org1").unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), Identity::new("alice", "org1"));
    }

    #[test]
    fn empty_username_is_rejected() {
        let clock = Arc::new(NullClock::new(1_000));
        let tokens = service(&clock, 60);
        assert_eq!(
            tokens.issue("", "org1"),
            Err(TokenError::MissingField("'username'"))
        );
    }

    #[test]
    fn empty_organization_is_rejected() {
        let clock = Arc::new(NullClock::new(1_000));
        let tokens = service(&clock, 60);
        assert_eq!(
            tokens.issue("alice", ""),
            Err(TokenError::MissingField("'orgName'"))
        );
    }

    #[test]
    fn token_expires_after_ttl() {
        let clock = Arc::new(NullClock::new(1_000));
        let tokens = service(&clock, 60);
        let token = tokens.issue("alice", "org1").unwrap();

        clock.advance(59);
        assert!(tokens.verify(&token).is_ok());

        clock.advance(1);
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let clock = Arc::new(NullClock::new(1_000));
        let other = TokenService::new(b"another-secret", 60, clock.clone());
        let token = other.issue("alice", "org1").unwrap();
        let result = service(&clock, 60).verify(&token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let clock = Arc::new(NullClock::new(1_000));
        let result = service(&clock, 60).verify("not.a.token");
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn tokens_for_same_pair_are_distinct_and_expire_independently() {
        let clock = Arc::new(NullClock::new(1_000));
        let tokens = service(&clock, 60);
        let first = tokens.issue("alice", "org1").unwrap();
        clock.advance(30);
        let second = tokens.issue("alice", "org1").unwrap();
        assert_ne!(first, second);

        clock.advance(30);
        assert_eq!(tokens.verify(&first), Err(TokenError::Expired));
        assert_eq!(
            tokens.verify(&second).unwrap(),
            Identity::new("alice", "org1")
        );
    }

    #[test]
    fn same_second_tokens_still_differ() {
        let clock = Arc::new(NullClock::new(1_000));
        let tokens = service(&clock, 60);
        let a = tokens.issue("alice", "org1").unwrap();
        let b = tokens.issue("alice", "org1").unwrap();
        assert_ne!(a, b);
    }
}
