//! Access Gate
//! Mission: Protect API endpoints with JWT validation and role checks

use crate::auth::{
    jwt::{JwtHandler, TokenError},
    models::{Claims, Role},
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Roles readers of the catalog may hold
pub const READERS: &[Role] = &[Role::User, Role::Admin];

/// Roles allowed to modify the catalog
pub const ADMINS: &[Role] = &[Role::Admin];

/// Per-route-group gate state: token validator plus the roles it admits
#[derive(Clone)]
pub struct AccessGate {
    jwt_handler: Arc<JwtHandler>,
    allowed: &'static [Role],
}

impl AccessGate {
    pub fn new(jwt_handler: Arc<JwtHandler>, allowed: &'static [Role]) -> Self {
        Self {
            jwt_handler,
            allowed,
        }
    }

    /// Validate a token and check its role against the allowed set
    pub fn authorize(&self, token: &str) -> Result<Claims, AccessError> {
        let claims = self
            .jwt_handler
            .validate_token(token)
            .map_err(AccessError::from)?;

        if !self.allowed.contains(&claims.role) {
            warn!(
                email = %claims.email,
                role = %claims.role,
                "Access denied: role not permitted"
            );
            return Err(AccessError::Forbidden);
        }

        Ok(claims)
    }
}

/// Pull the bearer token out of the Authorization header
fn bearer_token(headers: &HeaderMap) -> Result<&str, AccessError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AccessError::MissingToken)?
        .to_str()
        .map_err(|_| AccessError::InvalidFormat)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AccessError::InvalidFormat)
}

/// Auth middleware that validates JWT tokens and enforces the gate's roles
pub async fn access_gate(
    State(gate): State<AccessGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AccessError> {
    let claims = {
        let token = bearer_token(req.headers())?;
        gate.authorize(token)?
    };

    debug!(email = %claims.email, path = %req.uri().path(), "Access granted");

    // Add claims to request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extract claims from request (use after the access gate)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}

/// Access gate error types
#[derive(Debug, PartialEq, Eq)]
pub enum AccessError {
    MissingToken,
    InvalidFormat,
    MalformedToken,
    Expired,
    InvalidSignature,
    Forbidden,
}

impl From<TokenError> for AccessError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AccessError::Expired,
            TokenError::InvalidSignature => AccessError::InvalidSignature,
            TokenError::Malformed | TokenError::Signing(_) => AccessError::MalformedToken,
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AccessError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AccessError::InvalidFormat => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization format. Use: Bearer {token}",
            ),
            AccessError::MalformedToken => (StatusCode::UNAUTHORIZED, "Malformed token"),
            AccessError::Expired => (StatusCode::UNAUTHORIZED, "Token has expired"),
            AccessError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "Token signature is invalid")
            }
            AccessError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
