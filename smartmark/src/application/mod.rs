// smartmark/src/application/mod.rs
pub mod error;
pub mod services;

pub use services::bookmark_store_client::BookmarkStoreClient;
