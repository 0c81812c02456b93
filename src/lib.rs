//! Library Catalog Backend Library
//!
//! Exposes the auth, catalog and routing modules for the server binary and
//! integration tests.

pub mod api;
pub mod auth;
pub mod books;
pub mod config;
pub mod middleware;

pub use api::{create_router, AppState};
pub use config::Config;
