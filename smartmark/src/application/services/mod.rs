pub mod bookmark_store;
pub mod bookmark_store_client;
