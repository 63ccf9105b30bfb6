// smartmark/src/infrastructure/memory.rs
//! Process-local session provider.
//!
//! An `InMemoryBackend` owns identities, bookmarks and the change feed; each
//! `connect()` opens an independent session on it, the way two browser tabs
//! share one hosted backend but keep their own sign-in state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::domain::bookmark::{sort_newest_first, Bookmark, BookmarkBuilder, BookmarkId, NewBookmark};
use crate::domain::change::ChangeEvent;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::error::{ProviderError, ProviderResult};
use crate::domain::session_provider::{
    AuthProvider, AuthStateStream, ChangeStream, SessionProvider,
};
use crate::domain::user::{User, UserId};
use crate::infrastructure::accounts::AccountDirectory;
use crate::infrastructure::fanout::Fanout;
use crate::infrastructure::lock;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Provider calls, counted per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetCurrentUser,
    SignIn,
    SignOut,
    ListBookmarks,
    InsertBookmark,
    DeleteBookmark,
    SubscribeToChanges,
}

#[derive(Debug, Default)]
struct Storage {
    users: HashMap<UserId, User>,
    bookmarks: BTreeMap<BookmarkId, Bookmark>,
    last_id: i32,
}

impl Storage {
    fn upsert_user(&mut self, email: &str, full_name: Option<String>, avatar_url: Option<String>) -> User {
        let id = self
            .users
            .values()
            .find(|u| u.email == email)
            .map(|u| u.id.clone())
            .unwrap_or_else(UserId::generate);
        let user = User::new(id.clone(), email)
            .with_full_name(full_name)
            .with_avatar_url(avatar_url);
        self.users.insert(id, user.clone());
        user
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    storage: Arc<Mutex<Storage>>,
    changes: Fanout<ChangeEvent>,
    accounts: Arc<AccountDirectory>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBackend {
    pub fn new(accounts: AccountDirectory) -> Self {
        Self::with_clock(accounts, Arc::new(SystemClock))
    }

    pub fn with_clock(accounts: AccountDirectory, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(Storage::default())),
            changes: Fanout::new(),
            accounts: Arc::new(accounts),
            clock,
        }
    }

    /// Open a new, signed-out session on this backend
    pub fn connect(&self) -> InMemorySessionProvider {
        InMemorySessionProvider {
            backend: self.clone(),
            current: Mutex::new(None),
            auth_events: Fanout::new(),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashSet::new()),
        }
    }

    pub fn bookmark_count(&self) -> usize {
        lock(&self.storage).bookmarks.len()
    }

    pub fn change_listeners(&self) -> usize {
        self.changes.listener_count()
    }
}

#[derive(Debug)]
pub struct InMemorySessionProvider {
    backend: InMemoryBackend,
    current: Mutex<Option<UserId>>,
    auth_events: Fanout<Option<User>>,
    calls: Mutex<HashMap<Operation, usize>>,
    failures: Mutex<HashSet<Operation>>,
}

impl InMemorySessionProvider {
    pub fn calls(&self, operation: Operation) -> usize {
        lock(&self.calls).get(&operation).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    /// The next call of `operation` fails with `ProviderError::Unavailable`
    pub fn fail_next(&self, operation: Operation) {
        lock(&self.failures).insert(operation);
    }

    pub fn auth_listeners(&self) -> usize {
        self.auth_events.listener_count()
    }

    fn record(&self, operation: Operation) -> ProviderResult<()> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        if lock(&self.failures).remove(&operation) {
            return Err(ProviderError::Unavailable(format!(
                "injected failure for {:?}",
                operation
            )));
        }
        Ok(())
    }

    fn session_user(&self) -> Option<UserId> {
        lock(&self.current).clone()
    }

    fn require_session(&self) -> ProviderResult<UserId> {
        self.session_user().ok_or(ProviderError::NotSignedIn)
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn get_current_user(&self) -> ProviderResult<Option<User>> {
        self.record(Operation::GetCurrentUser)?;
        let Some(id) = self.session_user() else {
            return Ok(None);
        };
        Ok(lock(&self.backend.storage).users.get(&id).cloned())
    }

    #[instrument(skip(self), level = "debug")]
    async fn sign_in_with_provider(&self, provider: &AuthProvider) -> ProviderResult<()> {
        self.record(Operation::SignIn)?;
        let account = self.backend.accounts.resolve(provider)?;
        let user = lock(&self.backend.storage).upsert_user(
            &account.email,
            account.full_name.clone(),
            account.avatar_url.clone(),
        );
        *lock(&self.current) = Some(user.id.clone());
        debug!("Signed in {}", user);
        self.auth_events.publish(Some(user));
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn sign_out(&self) -> ProviderResult<()> {
        self.record(Operation::SignOut)?;
        *lock(&self.current) = None;
        self.auth_events.publish(None);
        Ok(())
    }

    fn on_auth_state_change(&self) -> AuthStateStream {
        self.auth_events.subscribe()
    }

    async fn list_bookmarks(&self, user_id: &UserId) -> ProviderResult<Vec<Bookmark>> {
        self.record(Operation::ListBookmarks)?;
        if self.session_user().as_ref() != Some(user_id) {
            return Ok(Vec::new());
        }
        let mut bookmarks: Vec<Bookmark> = lock(&self.backend.storage)
            .bookmarks
            .values()
            .filter(|b| b.is_owned_by(user_id))
            .cloned()
            .collect();
        sort_newest_first(&mut bookmarks);
        Ok(bookmarks)
    }

    #[instrument(skip(self), level = "debug")]
    async fn insert_bookmark(
        &self,
        user_id: &UserId,
        bookmark: &NewBookmark,
    ) -> ProviderResult<Bookmark> {
        self.record(Operation::InsertBookmark)?;
        let current = self.require_session()?;
        if &current != user_id {
            return Err(ProviderError::PermissionDenied(format!(
                "cannot insert for user {}",
                user_id
            )));
        }

        let created = {
            let mut storage = lock(&self.backend.storage);
            storage.last_id += 1;
            let created = BookmarkBuilder::default()
                .id(BookmarkId::new(storage.last_id))
                .user_id(user_id.clone())
                .title(bookmark.title())
                .url(bookmark.url())
                .created_at(self.backend.clock.now())
                .build()
                .map_err(|e| ProviderError::ConstraintViolation(e.to_string()))?;
            storage.bookmarks.insert(created.id, created.clone());
            created
        };

        self.backend.changes.publish(ChangeEvent::insert(created.clone()));
        Ok(created)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_bookmark(&self, id: BookmarkId) -> ProviderResult<()> {
        self.record(Operation::DeleteBookmark)?;
        let current = self.require_session()?;

        {
            let mut storage = lock(&self.backend.storage);
            match storage.bookmarks.get(&id) {
                None => {
                    debug!("Bookmark {} already gone", id);
                    return Ok(());
                }
                Some(existing) if !existing.is_owned_by(&current) => {
                    return Err(ProviderError::PermissionDenied(format!(
                        "bookmark {} belongs to another user",
                        id
                    )));
                }
                Some(_) => {
                    storage.bookmarks.remove(&id);
                }
            }
        }

        self.backend.changes.publish(ChangeEvent::delete(id));
        Ok(())
    }

    async fn subscribe_to_changes(&self) -> ProviderResult<ChangeStream> {
        self.record(Operation::SubscribeToChanges)?;
        Ok(self.backend.changes.subscribe())
    }
}
