// smartmark/src/application/services/bookmark_store.rs
use crate::application::error::ApplicationResult;
use crate::domain::bookmark::{Bookmark, BookmarkId};
use crate::domain::session_provider::{AuthProvider, AuthStateStream, ChangeStream};
use crate::domain::user::User;
use async_trait::async_trait;
use std::fmt::Debug;

/// Typed, error-normalised bookmark operations used by the presentation layer
#[async_trait]
pub trait BookmarkStore: Send + Sync + Debug {
    /// Validate and persist a bookmark for the signed-in user
    async fn add_bookmark(&self, title: &str, url: &str) -> ApplicationResult<Bookmark>;

    /// Remove a bookmark; every failure is reported as `DeleteFailed`
    async fn remove_bookmark(&self, id: BookmarkId) -> ApplicationResult<()>;

    /// Bookmarks of the signed-in user, newest first; empty when signed out
    async fn load_bookmarks(&self) -> ApplicationResult<Vec<Bookmark>>;

    async fn current_user(&self) -> ApplicationResult<Option<User>>;

    async fn sign_in(&self, provider: &AuthProvider) -> ApplicationResult<()>;

    async fn sign_out(&self) -> ApplicationResult<()>;

    fn auth_changes(&self) -> AuthStateStream;

    async fn subscribe(&self) -> ApplicationResult<ChangeStream>;
}
