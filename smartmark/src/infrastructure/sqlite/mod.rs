// smartmark/src/infrastructure/sqlite/mod.rs
pub mod connection;
pub mod error;
pub mod migration;
pub mod model;
pub mod provider;
pub mod schema;

pub use provider::SqliteSessionProvider;
