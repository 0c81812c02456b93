//! Authentication Flow
//! Mission: Register identities and exchange credentials for tokens
//!
//! Both operations are synchronous and CPU-heavy (PBKDF2); HTTP handlers run
//! them on the blocking pool.

use crate::auth::{
    jwt::{JwtHandler, TokenError},
    models::{Identity, LoginResponse, Role},
    password,
    user_store::{IdentityStore, StoreError},
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Message returned for every credential failure
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Authentication flow failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    Conflict,

    /// Unknown email and wrong password are deliberately the same variant
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Orchestrates identity lookup, hash verification and token issuance
pub struct Authenticator {
    store: Arc<dyn IdentityStore>,
    jwt: Arc<JwtHandler>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn IdentityStore>, jwt: Arc<JwtHandler>) -> Self {
        Self { store, jwt }
    }

    /// Register a new identity
    pub fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Identity, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        if self.store.exists_by_email(email)? {
            warn!(email = %email, "Registration rejected: email already registered");
            return Err(AuthError::Conflict);
        }

        let password_hash =
            password::hash_password(password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let identity = Identity {
            id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            password_hash,
            role,
            created_at: Utc::now().to_rfc3339(),
        };

        // The UNIQUE constraint closes the gap between the check above and this write
        let identity = self.store.insert(identity).map_err(|e| match e {
            StoreError::DuplicateEmail(_) => {
                warn!(email = %email, "Registration lost a race on unique email");
                AuthError::Conflict
            }
            other => AuthError::Store(other),
        })?;

        info!(email = %identity.email, role = %identity.role, "📝 Identity registered");
        Ok(identity)
    }

    /// Verify credentials and issue a token
    pub fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        info!(email = %email, "🔐 Login attempt");

        let identity = match self.store.find_by_email(email)? {
            Some(identity) => identity,
            None => {
                password::dummy_verify(password);
                warn!(email = %email, reason = "unknown_email", "❌ Invalid login attempt");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !password::verify_password(password, &identity.password_hash) {
            warn!(email = %email, reason = "bad_password", "❌ Invalid login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let (token, expires_in) = self.jwt.generate_token(&identity)?;

        info!(email = %email, role = %identity.role, "✅ Login successful");

        Ok(LoginResponse {
            token,
            expires_in,
            role: identity.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{jwt::TokenConfig, user_store::SqliteIdentityStore};

    fn authenticator() -> (Authenticator, Arc<SqliteIdentityStore>, Arc<JwtHandler>) {
        let store = Arc::new(SqliteIdentityStore::in_memory().unwrap());
        let jwt = Arc::new(JwtHandler::new(&TokenConfig::new("test-secret-key-12345", 1)));
        let auth = Authenticator::new(store.clone(), jwt.clone());
        (auth, store, jwt)
    }

    #[test]
    fn test_register_then_login() {
        let (auth, _store, jwt) = authenticator();

        let identity = auth
            .register("Alice", "a@x.com", "Secret123", Role::User)
            .unwrap();
        assert_eq!(identity.full_name, "Alice");
        assert_ne!(identity.password_hash, "Secret123");

        let response = auth.login("a@x.com", "Secret123").unwrap();
        assert!(!response.token.is_empty());
        assert_eq!(response.role, Role::User);
        assert_eq!(response.expires_in, 3600);

        let claims = jwt.validate_token(&response.token).unwrap();
        assert_eq!(claims.sub, identity.id.to_string());
        assert_eq!(claims.email, "a@x.com");
    }

    #[test]
    fn test_register_requires_email_and_password() {
        let (auth, store, _) = authenticator();

        assert!(matches!(
            auth.register("Alice", "", "Secret123", Role::User),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.register("Alice", "a@x.com", "", Role::User),
            Err(AuthError::Validation(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_registration_conflicts() {
        let (auth, store, _) = authenticator();

        auth.register("Alice", "a@x.com", "Secret123", Role::User)
            .unwrap();
        let second = auth.register("Alice Again", "a@x.com", "Other456", Role::Admin);

        assert!(matches!(second, Err(AuthError::Conflict)));
        assert_eq!(store.count().unwrap(), 1);
    }

    /// Skips the pre-check so the insert itself has to catch the duplicate
    struct RacingStore(Arc<SqliteIdentityStore>);

    impl IdentityStore for RacingStore {
        fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
            self.0.find_by_email(email)
        }

        fn exists_by_email(&self, _email: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        fn insert(&self, identity: Identity) -> Result<Identity, StoreError> {
            self.0.insert(identity)
        }
    }

    #[test]
    fn test_unique_constraint_conflict_after_stale_check() {
        let inner = Arc::new(SqliteIdentityStore::in_memory().unwrap());
        let jwt = Arc::new(JwtHandler::new(&TokenConfig::new("test-secret-key-12345", 1)));
        let auth = Authenticator::new(Arc::new(RacingStore(inner.clone())), jwt);

        auth.register("Alice", "a@x.com", "Secret123", Role::User)
            .unwrap();
        let second = auth.register("Alice Again", "a@x.com", "Other456", Role::Admin);

        assert!(matches!(second, Err(AuthError::Conflict)));
        assert_eq!(inner.count().unwrap(), 1);
        assert_eq!(
            inner.find_by_email("a@x.com").unwrap().unwrap().role,
            Role::User
        );
    }

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let (auth, _, _) = authenticator();
        auth.register("Alice", "a@x.com", "Secret123", Role::User)
            .unwrap();

        let unknown = auth.login("nobody@x.com", "Secret123").unwrap_err();
        let wrong = auth.login("a@x.com", "wrong").unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.to_string(), INVALID_CREDENTIALS);
    }

    #[test]
    fn test_login_requires_fields() {
        let (auth, _, _) = authenticator();
        assert!(matches!(
            auth.login("", "pw"),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.login("a@x.com", ""),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_login_email_is_case_sensitive() {
        let (auth, _, _) = authenticator();
        auth.register("Alice", "a@x.com", "Secret123", Role::User)
            .unwrap();

        assert!(matches!(
            auth.login("A@X.COM", "Secret123"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_admin_role_carried_into_token() {
        let (auth, _, jwt) = authenticator();
        auth.register("Root", "root@x.com", "Sup3rSecret", Role::Admin)
            .unwrap();

        let response = auth.login("root@x.com", "Sup3rSecret").unwrap();
        assert_eq!(response.role, Role::Admin);
        assert_eq!(jwt.validate_token(&response.token).unwrap().role, Role::Admin);
    }
}
