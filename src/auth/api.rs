//! Authentication API Endpoints
//! Mission: Provide register, login and role-probe endpoints

use crate::auth::{
    middleware::extract_claims,
    models::{
        IdentityResponse, LoginRequest, LoginResponse, MeResponse, RegisterRequest,
        RegisterResponse, Role,
    },
    service::{AuthError, Authenticator, INVALID_CREDENTIALS},
};
use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<Authenticator>,
}

impl AuthState {
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self { authenticator }
    }
}

/// Register endpoint - POST /api/auth/register
pub async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, AuthApiError> {
    let Json(payload) = payload?;
    let role = match payload.role.as_deref() {
        None | Some("") => Role::default(),
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| AuthApiError::Validation(e.to_string()))?,
    };

    // PBKDF2 is CPU-bound; keep it off the async workers
    let authenticator = state.authenticator.clone();
    let identity = tokio::task::spawn_blocking(move || {
        authenticator.register(&payload.full_name, &payload.email, &payload.password, role)
    })
    .await
    .map_err(|e| AuthApiError::Internal(e.to_string()))??;

    Ok(Json(RegisterResponse {
        message: "User registered successfully".to_string(),
        user: IdentityResponse::from_identity(&identity),
    }))
}

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    let Json(payload) = payload?;
    let authenticator = state.authenticator.clone();
    let response =
        tokio::task::spawn_blocking(move || authenticator.login(&payload.email, &payload.password))
            .await
            .map_err(|e| AuthApiError::Internal(e.to_string()))??;

    Ok(Json(response))
}

/// Get current caller - GET /api/auth/me
/// Built from JWT claims, no store lookup
pub async fn get_current_user(req: Request) -> Result<Json<MeResponse>, AuthApiError> {
    let claims = extract_claims(&req).ok_or(AuthApiError::Unauthorized)?;
    Ok(Json(MeResponse::from_claims(claims)))
}

/// GET /api/auth/user (User, Admin)
pub async fn user_endpoint() -> &'static str {
    "User access granted"
}

/// GET /api/auth/admin (Admin only)
pub async fn admin_endpoint() -> &'static str {
    "Admin access granted"
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    Validation(String),
    Conflict,
    InvalidCredentials,
    Unauthorized,
    Internal(String),
}

impl From<AuthError> for AuthApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => AuthApiError::Validation(msg),
            AuthError::Conflict => AuthApiError::Conflict,
            AuthError::InvalidCredentials => AuthApiError::InvalidCredentials,
            AuthError::Store(e) => AuthApiError::Internal(e.to_string()),
            AuthError::Internal(msg) => AuthApiError::Internal(msg),
        }
    }
}

// Undecodable bodies are validation failures, not axum's plain-text 415/422
impl From<JsonRejection> for AuthApiError {
    fn from(rejection: JsonRejection) -> Self {
        AuthApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthApiError::Conflict => (StatusCode::BAD_REQUEST, "User already exists".to_string()),
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string())
            }
            AuthApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AuthApiError::Internal(detail) => {
                error!("Auth internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
