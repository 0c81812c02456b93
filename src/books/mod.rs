//! Book catalog: SQLite store, simulated review lookup and HTTP handlers

pub mod api;
pub mod external;
pub mod models;
pub mod store;

pub use api::BookState;
pub use external::ExternalBookService;
pub use store::BookStore;
