// smartmark/src/domain/session_provider.rs
use crate::domain::bookmark::{Bookmark, BookmarkId, NewBookmark};
use crate::domain::change::ChangeEvent;
use crate::domain::error::ProviderResult;
use crate::domain::subscription::Subscription;
use crate::domain::user::{User, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;

/// Receives the new session identity on every sign-in or sign-out
pub type AuthStateStream = Subscription<Option<User>>;

/// Receives every insert and delete on the bookmarks collection
pub type ChangeStream = Subscription<ChangeEvent>;

/// Name of an external identity provider, e.g. `google`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthProvider(String);

impl AuthProvider {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn google() -> Self {
        Self::new("google")
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for AuthProvider {
    fn default() -> Self {
        Self::google()
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/*
   Session Provider
   Identity, bookmark storage and change notification behind one seam.
   Everything the application knows about users and stored bookmarks comes
   through here; ownership of records is enforced on this side of the seam.
*/
#[async_trait]
pub trait SessionProvider: Send + Sync + Debug {
    /// Signed-in user of the current session, `None` when signed out
    async fn get_current_user(&self) -> ProviderResult<Option<User>>;

    /// Starts the sign-in flow; completion is reported on the auth-state stream
    async fn sign_in_with_provider(&self, provider: &AuthProvider) -> ProviderResult<()>;

    /// Ends the session; completion is reported on the auth-state stream
    async fn sign_out(&self) -> ProviderResult<()>;

    /// Registers a listener for sign-in and sign-out
    fn on_auth_state_change(&self) -> AuthStateStream;

    /// All bookmarks of `user_id`, newest first
    async fn list_bookmarks(&self, user_id: &UserId) -> ProviderResult<Vec<Bookmark>>;

    /// Persists a bookmark and returns it with id and timestamp assigned
    async fn insert_bookmark(
        &self,
        user_id: &UserId,
        bookmark: &NewBookmark,
    ) -> ProviderResult<Bookmark>;

    /// Removes a bookmark of the caller; removing an absent record succeeds
    async fn delete_bookmark(&self, id: BookmarkId) -> ProviderResult<()>;

    /// Registers a listener for inserts and deletes on the bookmarks collection
    async fn subscribe_to_changes(&self) -> ProviderResult<ChangeStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_mixed_case_name_when_creating_provider_then_normalised() {
        assert_eq!(AuthProvider::new(" Google "), AuthProvider::google());
        assert_eq!(AuthProvider::default().name(), "google");
    }
}
