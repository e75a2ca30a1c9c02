//! Bearer token issuing and validation
//!
//! Tokens use the compact HS256 JWT layout:
//! `base64url(header).base64url(claims).base64url(hmac_sha256(header.claims))`
//! with claims `{sub, exp, jti}`. `jti` is random per issue, so two logins in
//! the same second still yield distinct tokens. A token is only accepted while it is also the
//! token stored in the principal's session row, so a new login or a logout
//! revokes every token issued before it.

use crate::db::repositories::SessionRepository;
use crate::db::StoreError;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Why a credential was refused
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Not a well-formed token, or the signature does not verify
    #[error("Invalid token")]
    InvalidFormat,

    /// Signature is valid but `exp` has passed
    #[error("Token expired")]
    Expired,

    /// Token is no longer the principal's current session token
    #[error("Token revoked")]
    Revoked,

    /// The session store could not be consulted
    #[error("Session lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Stable machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidFormat => "TOKEN_INVALID",
            AuthError::Expired => "TOKEN_EXPIRED",
            AuthError::Revoked => "TOKEN_REVOKED",
            AuthError::Store(_) => "INTERNAL_ERROR",
        }
    }
}

/// Signed claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal (user) ID
    pub sub: i64,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Unique token ID
    pub jti: String,
}

impl Claims {
    /// Claims for `sub` expiring at `exp` with a fresh random `jti`
    pub fn new(sub: i64, exp: i64) -> Self {
        let mut id = [0u8; 16];
        OsRng.fill_bytes(&mut id);
        Self {
            sub,
            exp,
            jti: BASE64URL_NOPAD.encode(&id),
        }
    }
}

/// A freshly minted token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks bearer tokens.
///
/// Validation performs exactly one session lookup and caches nothing.
pub struct TokenValidator {
    secret: Vec<u8>,
    sessions: Arc<dyn SessionRepository>,
}

impl TokenValidator {
    pub fn new(secret: impl Into<Vec<u8>>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            secret: secret.into(),
            sessions,
        }
    }

    /// Mint a token for `user_id` valid for `ttl`.
    ///
    /// The caller is responsible for storing it as the user's session.
    pub fn issue(&self, user_id: i64, ttl: Duration) -> anyhow::Result<IssuedToken> {
        let expires_at = Utc::now() + ttl;
        let token = self.sign(&Claims::new(user_id, expires_at.timestamp()))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Encode and sign arbitrary claims
    pub fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        let header = BASE64URL_NOPAD.encode(HEADER.as_bytes());
        let payload = BASE64URL_NOPAD.encode(&serde_json::to_vec(claims)?);
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = BASE64URL_NOPAD.encode(&mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Check signature and structure only, returning the claims
    pub fn decode(&self, credential: &str) -> Result<Claims, AuthError> {
        let mut parts = credential.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidFormat);
        };

        let signature = BASE64URL_NOPAD
            .decode(signature.as_bytes())
            .map_err(|_| AuthError::InvalidFormat)?;

        let mut mac = self.mac().map_err(|_| AuthError::InvalidFormat)?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidFormat)?;

        let header_json = BASE64URL_NOPAD
            .decode(header.as_bytes())
            .map_err(|_| AuthError::InvalidFormat)?;
        let header: serde_json::Value =
            serde_json::from_slice(&header_json).map_err(|_| AuthError::InvalidFormat)?;
        if header.get("alg").and_then(|v| v.as_str()) != Some("HS256") {
            return Err(AuthError::InvalidFormat);
        }

        let claims_json = BASE64URL_NOPAD
            .decode(payload.as_bytes())
            .map_err(|_| AuthError::InvalidFormat)?;
        serde_json::from_slice(&claims_json).map_err(|_| AuthError::InvalidFormat)
    }

    /// Validate a presented credential and return its principal ID.
    ///
    /// Order: signature and format, then expiry, then the session record.
    pub async fn validate(&self, credential: &str) -> Result<i64, AuthError> {
        let claims = self.decode(credential)?;

        if Utc::now().timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }

        match self.sessions.get_token(claims.sub).await? {
            Some(stored) if !stored.is_empty() && stored == credential => Ok(claims.sub),
            _ => Err(AuthError::Revoked),
        }
    }

    fn mac(&self) -> anyhow::Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| anyhow::anyhow!("Invalid signing key: {}", e))
    }
}
