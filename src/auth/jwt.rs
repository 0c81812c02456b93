//! JWT Token Handler
//! Mission: Issue and validate time-bounded bearer tokens

use crate::auth::models::{Claims, Identity};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use tracing::debug;

/// Process-wide token settings, built once at startup
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    pub expiration_hours: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>, expiration_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours,
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("expiration_hours", &self.expiration_hours)
            .finish()
    }
}

/// Token validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is malformed")]
    Malformed,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration_hours: i64,
}

impl JwtHandler {
    /// Create a new JWT handler from the startup token config
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is dead the second exp passes
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(&config.secret),
            decoding_key: DecodingKey::from_secret(&config.secret),
            validation,
            expiration_hours: config.expiration_hours,
        }
    }

    /// Issue a token for an identity; returns the token and its lifetime in seconds
    pub fn generate_token(&self, identity: &Identity) -> Result<(String, i64), TokenError> {
        let now = Utc::now().timestamp();
        let expires_in = self.expiration_hours * 3600;

        let claims = Claims {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            role: identity.role,
            iat: now,
            exp: now + expires_in,
        };

        debug!(
            "Generating JWT for {} ({}), expires in {}h",
            identity.email, identity.id, self.expiration_hours
        );

        let token = self.sign(&claims)?;
        Ok((token, expires_in))
    }

    /// Sign arbitrary claims with the process key
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate a JWT token and extract claims
    ///
    /// An expired token reports `Expired` even when its signature is also bad.
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(decoded) => {
                debug!("Validated JWT for {}", decoded.claims.email);
                Ok(decoded.claims)
            }
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::InvalidKeyFormat => {
                    if self.is_expired_unverified(token) {
                        Err(TokenError::Expired)
                    } else {
                        Err(TokenError::InvalidSignature)
                    }
                }
                _ => Err(TokenError::Malformed),
            },
        }
    }

    /// Read `exp` without trusting the signature
    fn is_expired_unverified(&self, token: &str) -> bool {
        let mut insecure = Validation::new(Algorithm::HS256);
        insecure.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        insecure.insecure_disable_signature_validation();
        insecure.validate_exp = false;
        insecure.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &self.decoding_key, &insecure)
            .map(|d| d.claims.exp < Utc::now().timestamp())
            .unwrap_or(false)
    }
}
