//! Authentication Module
//! Mission: Credential hashing, JWT issuance and role-gated access

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod user_store;

pub use api::AuthState;
pub use jwt::{JwtHandler, TokenConfig};
pub use middleware::{access_gate, AccessGate};
pub use service::Authenticator;
pub use user_store::{IdentityStore, SqliteIdentityStore};
