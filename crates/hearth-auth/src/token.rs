//! JWT access/refresh token issuance and verification, plus opaque
//! one-time token generation and digesting.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Which half of a token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: account ID (UUID string).
    pub sub: String,
    pub iss: String,
    pub aud: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID, keeps two pairs minted in the same second apart.
    pub jti: String,
    pub token_use: TokenUse,
}

/// A freshly minted access/refresh pair.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Signs and verifies EdDSA (Ed25519) tokens for a single issuer and
/// audience.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_lifetime: TimeDelta,
    refresh_lifetime: TimeDelta,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let encoding = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;
        let decoding = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;
        Ok(Self {
            encoding,
            decoding,
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            access_lifetime: config.access_token_lifetime()?,
            refresh_lifetime: config.refresh_token_lifetime()?,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    fn claims_for(&self, account_id: Uuid, token_use: TokenUse, lifetime: TimeDelta) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: account_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + lifetime.num_seconds(),
            jti: Uuid::new_v4().to_string(),
            token_use,
        }
    }

    /// Mint a new access/refresh pair for `account_id`.
    pub fn issue(&self, account_id: Uuid) -> Result<TokenPair, AuthError> {
        let access = self.claims_for(account_id, TokenUse::Access, self.access_lifetime);
        let refresh = self.claims_for(account_id, TokenUse::Refresh, self.refresh_lifetime);
        Ok(TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            expires_in: self.access_lifetime.num_seconds().unsigned_abs(),
        })
    }

    /// Decode a token, checking signature, expiry, issuer, audience and
    /// that it is the expected half of the pair.
    pub fn decode(&self, token: &str, expected: TokenUse) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })?;

        if claims.token_use != expected {
            return Err(AuthError::TokenInvalid(format!(
                "expected {expected:?} token, got {:?}",
                claims.token_use
            )));
        }
        Ok(claims)
    }

    fn subject(claims: &Claims) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&claims.sub)
            .map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))
    }

    /// Stateless check of an access token. No store lookup.
    pub fn verify_access(&self, token: &str) -> Result<Uuid, AuthError> {
        Self::subject(&self.decode(token, TokenUse::Access)?)
    }

    /// Signature and expiry check of a refresh token. The caller must
    /// still compare it against the stored session.
    pub fn verify_refresh(&self, token: &str) -> Result<Uuid, AuthError> {
        Self::subject(&self.decode(token, TokenUse::Refresh)?)
    }
}

/// Generate a cryptographically random opaque token
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_opaque_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 digest of a raw token, hex-encoded.
///
/// This is the only form in which tokens are persisted.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
