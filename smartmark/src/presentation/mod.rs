// smartmark/src/presentation/mod.rs
pub mod form;
pub mod lifetime;
pub mod list_view;
pub mod notice;
pub mod page;
pub mod render;
pub mod session_view;

pub use notice::{Notice, NoticeLevel, Notifier};
pub use page::{Page, Step};
