//! Persistence layer — libSQL-backed storage for settings and profiles.

pub mod libsql_backend;
pub(crate) mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{BusinessProfileRecord, Database};
