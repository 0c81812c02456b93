//! Identity Storage
//! Mission: Persist identities in SQLite with a store-level email uniqueness guarantee

use crate::auth::models::{Identity, Role};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// UNIQUE(email) rejected the write
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Persistence seam used by the authentication flow
pub trait IdentityStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    fn exists_by_email(&self, email: &str) -> Result<bool, StoreError>;

    fn insert(&self, identity: Identity) -> Result<Identity, StoreError>;
}

/// Identity storage with SQLite backend
pub struct SqliteIdentityStore {
    conn: Mutex<Connection>,
}

impl SqliteIdentityStore {
    /// Open (or create) the identity database at the given path
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        Self::init(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        // BINARY collation keeps email matching case-sensitive
        conn.execute(
            "CREATE TABLE IF NOT EXISTS identities (
                id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored identities
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM identities", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_identity(row: &Row<'_>) -> rusqlite::Result<Identity> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let role_str: String = row.get(4)?;
    Ok(Identity {
        id,
        full_name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        // Unknown role strings fall back to least privilege
        role: role_str.parse().unwrap_or_else(|_| {
            warn!(identity_id = %id, role = %role_str, "Unknown stored role, treating as User");
            Role::User
        }),
        created_at: row.get(5)?,
    })
}

impl IdentityStore for SqliteIdentityStore {
    fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let conn = self.conn.lock();

        let identity = conn
            .query_row(
                "SELECT id, full_name, email, password_hash, role, created_at
                 FROM identities WHERE email = ?1",
                params![email],
                row_to_identity,
            )
            .optional()?;

        Ok(identity)
    }

    fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM identities WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert(&self, identity: Identity) -> Result<Identity, StoreError> {
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO identities (id, full_name, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                identity.id.to_string(),
                identity.full_name,
                identity.email,
                identity.password_hash,
                identity.role.as_str(),
                identity.created_at,
            ],
        );

        match result {
            Ok(_) => {
                info!(
                    "✅ Stored identity: {} ({})",
                    identity.email,
                    identity.role.as_str()
                );
                Ok(identity)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                debug!("Unique constraint rejected {}", identity.email);
                Err(StoreError::DuplicateEmail(identity.email))
            }
            Err(e) => Err(e.into()),
        }
    }
}
