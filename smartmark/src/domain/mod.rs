pub mod bookmark;
pub mod change;
pub mod clock;
pub mod error;
pub mod session_provider;
pub mod subscription;
pub mod user;
