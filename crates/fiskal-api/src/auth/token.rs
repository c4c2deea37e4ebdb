//! Token issuance and verification
//!
//! Implements signed, time-bounded identity tokens with HMAC-SHA256.
//! Tokens carry a fixed 7-day lifetime and are validated against a single
//! process-wide secret plus configured issuer and audience values.
//!
//! A legacy token shape from before the signed scheme is still accepted
//! behind [`TokenService::verify_any`]; that path is migration scaffolding
//! and is meant to be deleted once no legacy tokens remain in circulation.

use base64::Engine;
use chrono::Utc;
use fiskal_core::{AuthConfig, Identity, Role};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Claim set embedded in the current token format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Token audience
    pub aud: String,
    /// Subject - user ID
    pub sub: String,
    /// User's email address
    pub email: String,
    /// User's display name
    pub name: String,
    /// User's role
    pub role: Role,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch); always iat + fixed TTL
    pub exp: u64,
}

/// Claim set of the legacy token format
///
/// The legacy shape predates the signed scheme: a base64url JSON payload
/// with a keyed SHA-256 tag appended. It carries no issuer or audience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyClaims {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub exp: u64,
}

/// Verification outcome distinguishing token generations
///
/// Tagged so legacy acceptance stays measurable until the compatibility
/// path is removed.
#[derive(Debug, Clone)]
pub enum VerifiedToken {
    Current(Claims),
    Legacy(LegacyClaims),
}

impl VerifiedToken {
    /// Normalize either generation into the same [`Identity`] shape.
    ///
    /// `active` is provisionally true; only a directory re-read
    /// (verify-and-refresh) can observe deactivation.
    pub fn identity(&self) -> Identity {
        match self {
            Self::Current(claims) => Identity {
                id: claims.sub.clone(),
                email: claims.email.clone(),
                display_name: claims.name.clone(),
                role: claims.role,
                active: true,
            },
            Self::Legacy(claims) => Identity {
                id: claims.user_id.clone(),
                email: claims.email.clone(),
                display_name: claims.display_name.clone(),
                role: claims.role,
                active: true,
            },
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }
}

/// Token verification and issuance errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token issuer or audience mismatch")]
    IssuerMismatch,

    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

/// Issues and verifies identity tokens.
///
/// Verification is a pure function of the encoded token and the current
/// time; it never consults the user directory.
#[derive(Clone)]
pub struct TokenService {
    config: AuthConfig,
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.config.token_ttl_secs
    }

    /// Build, sign, and encode a claim set for an identity.
    pub fn issue(&self, identity: &Identity) -> Result<(Claims, String), TokenError> {
        let now = Utc::now().timestamp() as u64;

        let claims = Claims {
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            sub: identity.id.clone(),
            email: identity.email.clone(),
            name: identity.display_name.clone(),
            role: identity.role,
            iat: now,
            exp: now + self.config.token_ttl_secs,
        };

        let encoded = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok((claims, encoded))
    }

    /// Verify a token of the current format.
    ///
    /// Checks signature, expiry, issuer, and audience, and maps failures to
    /// the typed reasons callers log server-side.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::BadSignature,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer
            | jsonwebtoken::errors::ErrorKind::InvalidAudience => TokenError::IssuerMismatch,
            _ => TokenError::Malformed,
        })?;

        Ok(token_data.claims)
    }

    /// Verify against the current scheme first, then fall back to the
    /// legacy decode path if one is configured.
    ///
    /// The original failure from the current scheme is preserved when the
    /// legacy path also rejects, so callers log the more meaningful reason.
    pub fn verify_any(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let current_err = match self.verify(token) {
            Ok(claims) => return Ok(VerifiedToken::Current(claims)),
            Err(e) => e,
        };

        if let Some(legacy_secret) = &self.config.legacy_secret {
            if let Ok(claims) = verify_legacy_token(legacy_secret, token) {
                return Ok(VerifiedToken::Legacy(claims));
            }
        }

        Err(current_err)
    }
}

fn legacy_tag(secret: &str, payload_b64: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b".");
    hasher.update(payload_b64.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Encode claims in the legacy format: `base64url(json).hex(sha256(key))`.
///
/// Exists so the migration path stays testable; no new tokens of this shape
/// are issued.
pub fn encode_legacy_token(secret: &str, claims: &LegacyClaims) -> String {
    let payload = serde_json::to_vec(claims).unwrap_or_default();
    let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload);
    let tag = legacy_tag(secret, &payload_b64);
    format!("{payload_b64}.{tag}")
}

/// Decode and check a legacy-format token.
///
/// The keyed SHA-256 tag is the only integrity check the legacy format
/// supports; it is still enforced, so legacy acceptance never widens trust
/// to unauthenticated payloads.
pub fn verify_legacy_token(secret: &str, token: &str) -> Result<LegacyClaims, TokenError> {
    let (payload_b64, tag) = token.split_once('.').ok_or(TokenError::Malformed)?;
    if tag.contains('.') {
        // Three segments means a JWT, not the legacy shape.
        return Err(TokenError::Malformed);
    }

    let expected = legacy_tag(secret, payload_b64);
    if expected.as_bytes().ct_eq(tag.as_bytes()).unwrap_u8() == 0 {
        return Err(TokenError::BadSignature);
    }

    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| TokenError::Malformed)?;
    let claims: LegacyClaims =
        serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

    let now = Utc::now().timestamp() as u64;
    if claims.exp <= now {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}
