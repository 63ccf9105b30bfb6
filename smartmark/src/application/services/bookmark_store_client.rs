// smartmark/src/application/services/bookmark_store_client.rs
use std::sync::Arc;

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::bookmark_store::BookmarkStore;
use crate::domain::bookmark::{Bookmark, BookmarkId, NewBookmark};
use crate::domain::session_provider::{
    AuthProvider, AuthStateStream, ChangeStream, SessionProvider,
};
use crate::domain::user::User;
use async_trait::async_trait;
use tracing::{debug, error, instrument};

/// Thin client over a session provider; holds nothing but the provider handle
#[derive(Debug, Clone)]
pub struct BookmarkStoreClient {
    provider: Arc<dyn SessionProvider>,
}

impl BookmarkStoreClient {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn SessionProvider> {
        &self.provider
    }

    async fn require_user(&self) -> ApplicationResult<User> {
        self.current_user()
            .await?
            .ok_or(ApplicationError::Unauthenticated)
    }
}

#[async_trait]
impl BookmarkStore for BookmarkStoreClient {
    #[instrument(skip(self), level = "debug")]
    async fn add_bookmark(&self, title: &str, url: &str) -> ApplicationResult<Bookmark> {
        let draft = NewBookmark::parse(title, url)?;
        let user = self.require_user().await?;

        let bookmark = self
            .provider
            .insert_bookmark(&user.id, &draft)
            .await
            .map_err(|e| {
                error!("Error adding bookmark: {}", e);
                ApplicationError::Provider(e)
            })?;

        debug!("Added bookmark {}", bookmark);
        Ok(bookmark)
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove_bookmark(&self, id: BookmarkId) -> ApplicationResult<()> {
        self.provider.delete_bookmark(id).await.map_err(|source| {
            error!("Error deleting bookmark {}: {}", id, source);
            ApplicationError::DeleteFailed { id, source }
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn load_bookmarks(&self) -> ApplicationResult<Vec<Bookmark>> {
        let Some(user) = self.current_user().await? else {
            debug!("No session, nothing to load");
            return Ok(Vec::new());
        };

        self.provider.list_bookmarks(&user.id).await.map_err(|e| {
            error!("Error fetching bookmarks: {}", e);
            ApplicationError::Provider(e)
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn current_user(&self) -> ApplicationResult<Option<User>> {
        self.provider.get_current_user().await.map_err(|e| {
            error!("Error getting user: {}", e);
            ApplicationError::Provider(e)
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn sign_in(&self, provider: &AuthProvider) -> ApplicationResult<()> {
        self.provider
            .sign_in_with_provider(provider)
            .await
            .map_err(|e| {
                error!("Error signing in with {}: {}", provider, e);
                ApplicationError::Provider(e)
            })
    }

    #[instrument(skip(self), level = "debug")]
    async fn sign_out(&self) -> ApplicationResult<()> {
        self.provider.sign_out().await.map_err(|e| {
            error!("Error logging out: {}", e);
            ApplicationError::Provider(e)
        })
    }

    fn auth_changes(&self) -> AuthStateStream {
        self.provider.on_auth_state_change()
    }

    #[instrument(skip(self), level = "debug")]
    async fn subscribe(&self) -> ApplicationResult<ChangeStream> {
        self.provider.subscribe_to_changes().await.map_err(|e| {
            error!("Error subscribing to bookmark changes: {}", e);
            ApplicationError::Provider(e)
        })
    }
}
