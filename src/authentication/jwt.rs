use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    error::ApiError,
    schema::{Id, User},
};

/// Claims of an API token. Tokens do not expire, logout revokes them by
/// dropping the stored key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    jti: String,
}

impl TokenClaims {
    pub fn new(id: Id, email: String) -> Self {
        Self {
            user_id: id,
            email,
            iat: Utc::now().timestamp(),
            jti: Alphanumeric.sample_string(&mut rand::thread_rng(), 16),
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("Invalid signing key: {e}")))
}

pub fn generate_token(user: &User, secret: &str) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = TokenClaims::new(user.id, user.email.to_owned());

    claims
        .sign_with_key(&key)
        .map_err(|e| ApiError::Internal(format!("Could not sign token: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<TokenClaims, ApiError> {
    let key = signing_key(secret)?;

    token
        .verify_with_key(&key)
        .map_err(|_| ApiError::InvalidToken)
}
