// smartmark/src/infrastructure/sqlite/provider.rs
//! SQLite-backed session provider.
//!
//! The database file plays the hosted backend: it stores identities, the
//! signed-in session and bookmarks. Triggers append every insert and delete
//! to `bookmark_changes`; subscribers poll that log, so changes made by any
//! process sharing the file reach every open feed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use diesel::dsl::max;
use diesel::prelude::*;
use tracing::{debug, instrument, trace, warn};

use super::connection::{init_pool, with_conn, ConnectionPool};
use super::error::{SqliteRepositoryError, SqliteResult};
use super::model::{DbAuthSession, DbBookmark, DbChange, DbUser, NewDbBookmark};
use super::schema::{auth_session, bookmark_changes, bookmarks, users};
use crate::config::AccountSettings;
use crate::domain::bookmark::{sort_newest_first, Bookmark, BookmarkId, NewBookmark};
use crate::domain::change::ChangeEvent;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::error::ProviderResult;
use crate::domain::session_provider::{
    AuthProvider, AuthStateStream, ChangeStream, SessionProvider,
};
use crate::domain::subscription::{Registration, Subscription};
use crate::domain::user::{User, UserId};
use crate::infrastructure::accounts::AccountDirectory;
use crate::infrastructure::fanout::Fanout;

const SESSION_SLOT: i32 = 1;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Clone, Debug)]
pub struct SqliteSessionProvider {
    pool: ConnectionPool,
    accounts: Arc<AccountDirectory>,
    clock: Arc<dyn Clock>,
    auth_events: Fanout<Option<User>>,
    poll_interval: Duration,
}

impl SqliteSessionProvider {
    pub fn new(pool: ConnectionPool, accounts: AccountDirectory) -> Self {
        Self {
            pool,
            accounts: Arc::new(accounts),
            clock: Arc::new(SystemClock),
            auth_events: Fanout::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[instrument(skip_all, level = "debug")]
    pub fn from_url(database_url: &str, accounts: AccountDirectory) -> SqliteResult<Self> {
        let pool = init_pool(database_url)?;
        Ok(Self::new(pool, accounts))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn session_user(&self) -> SqliteResult<Option<User>> {
        with_conn(&self.pool, load_session_user).await
    }
}

fn load_session_user(conn: &mut SqliteConnection) -> SqliteResult<Option<User>> {
    let user = auth_session::table
        .inner_join(users::table)
        .select(DbUser::as_select())
        .first(conn)
        .optional()?;
    Ok(user.map(User::from))
}

fn require_session_user(conn: &mut SqliteConnection) -> SqliteResult<UserId> {
    load_session_user(conn)?
        .map(|u| u.id)
        .ok_or(SqliteRepositoryError::NotSignedIn)
}

fn upsert_user(conn: &mut SqliteConnection, account: &AccountSettings) -> SqliteResult<DbUser> {
    let existing: Option<DbUser> = users::table
        .filter(users::email.eq(&account.email))
        .select(DbUser::as_select())
        .first(conn)
        .optional()?;

    let user = DbUser {
        id: existing
            .map(|u| u.id)
            .unwrap_or_else(|| UserId::generate().to_string()),
        email: account.email.clone(),
        full_name: account.full_name.clone(),
        avatar_url: account.avatar_url.clone(),
    };

    diesel::insert_into(users::table)
        .values(&user)
        .on_conflict(users::id)
        .do_update()
        .set(&user)
        .execute(conn)?;
    Ok(user)
}

fn latest_change(conn: &mut SqliteConnection) -> SqliteResult<i32> {
    let seq: Option<i32> = bookmark_changes::table
        .select(max(bookmark_changes::seq))
        .first(conn)?;
    Ok(seq.unwrap_or(0))
}

fn changes_since(conn: &mut SqliteConnection, seq: i32) -> SqliteResult<Vec<DbChange>> {
    Ok(bookmark_changes::table
        .filter(bookmark_changes::seq.gt(seq))
        .order(bookmark_changes::seq.asc())
        .select(DbChange::as_select())
        .load(conn)?)
}

/// Forwards change-log rows after `last_seq` until the receiver goes away
async fn poll_changes(
    pool: ConnectionPool,
    sender: tokio::sync::mpsc::UnboundedSender<ChangeEvent>,
    mut last_seq: i32,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = sender.closed() => break,
            _ = ticker.tick() => {
                let rows = match with_conn(&pool, move |conn| changes_since(conn, last_seq)).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        warn!("Polling change log failed: {}", e);
                        continue;
                    }
                };
                for row in rows {
                    last_seq = row.seq;
                    match row.into_event() {
                        Ok(Some(event)) => {
                            if sender.send(event).is_err() {
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!("Skipping change {}: {}", last_seq, e),
                    }
                }
            }
        }
    }
    trace!("Change poller stopped at {}", last_seq);
}

#[async_trait]
impl SessionProvider for SqliteSessionProvider {
    #[instrument(skip(self), level = "debug")]
    async fn get_current_user(&self) -> ProviderResult<Option<User>> {
        Ok(self.session_user().await?)
    }

    #[instrument(skip(self), level = "debug")]
    async fn sign_in_with_provider(&self, provider: &AuthProvider) -> ProviderResult<()> {
        let account = self.accounts.resolve(provider)?.clone();
        let now = self.clock.now().naive_utc();

        let user = with_conn(&self.pool, move |conn| {
            conn.transaction::<_, SqliteRepositoryError, _>(|conn| {
                let user = upsert_user(conn, &account)?;
                diesel::replace_into(auth_session::table)
                    .values(&DbAuthSession {
                        slot: SESSION_SLOT,
                        user_id: &user.id,
                        signed_in_at: now,
                    })
                    .execute(conn)?;
                Ok(user)
            })
        })
        .await?;

        let user = User::from(user);
        debug!("Signed in {}", user);
        self.auth_events.publish(Some(user));
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn sign_out(&self) -> ProviderResult<()> {
        with_conn(&self.pool, |conn| {
            diesel::delete(auth_session::table).execute(conn)?;
            Ok(())
        })
        .await?;
        self.auth_events.publish(None);
        Ok(())
    }

    fn on_auth_state_change(&self) -> AuthStateStream {
        self.auth_events.subscribe()
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_bookmarks(&self, user_id: &UserId) -> ProviderResult<Vec<Bookmark>> {
        let owner = user_id.clone();
        let rows = with_conn(&self.pool, move |conn| {
            if load_session_user(conn)?.map(|u| u.id) != Some(owner.clone()) {
                return Ok(Vec::new());
            }
            Ok(bookmarks::table
                .filter(bookmarks::user_id.eq(owner.as_str()))
                .order((bookmarks::created_at.desc(), bookmarks::id.desc()))
                .select(DbBookmark::as_select())
                .load(conn)?)
        })
        .await?;

        let mut bookmarks = rows
            .into_iter()
            .map(Bookmark::try_from)
            .collect::<SqliteResult<Vec<_>>>()?;
        sort_newest_first(&mut bookmarks);
        Ok(bookmarks)
    }

    #[instrument(skip(self), level = "debug")]
    async fn insert_bookmark(
        &self,
        user_id: &UserId,
        bookmark: &NewBookmark,
    ) -> ProviderResult<Bookmark> {
        let owner = user_id.clone();
        let draft = bookmark.clone();
        let created_at = self.clock.now().naive_utc();

        let row = with_conn(&self.pool, move |conn| {
            conn.transaction::<_, SqliteRepositoryError, _>(|conn| {
                if require_session_user(conn)? != owner {
                    return Err(SqliteRepositoryError::PermissionDenied(format!(
                        "cannot insert for user {}",
                        owner
                    )));
                }
                let row = diesel::insert_into(bookmarks::table)
                    .values(&NewDbBookmark {
                        user_id: owner.as_str(),
                        title: draft.title(),
                        url: draft.url(),
                        created_at,
                    })
                    .returning(DbBookmark::as_returning())
                    .get_result(conn)?;
                Ok(row)
            })
        })
        .await?;

        debug!("Inserted {}", row);
        Ok(Bookmark::try_from(row)?)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_bookmark(&self, id: BookmarkId) -> ProviderResult<()> {
        with_conn(&self.pool, move |conn| {
            conn.transaction::<_, SqliteRepositoryError, _>(|conn| {
                let current = require_session_user(conn)?;
                let owner: Option<String> = bookmarks::table
                    .find(id.value())
                    .select(bookmarks::user_id)
                    .first(conn)
                    .optional()?;
                match owner {
                    None => {
                        debug!("Bookmark {} already gone", id);
                        Ok(())
                    }
                    Some(owner) if owner != current.as_str() => {
                        Err(SqliteRepositoryError::PermissionDenied(format!(
                            "bookmark {} belongs to another user",
                            id
                        )))
                    }
                    Some(_) => {
                        diesel::delete(bookmarks::table.find(id.value())).execute(conn)?;
                        Ok(())
                    }
                }
            })
        })
        .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn subscribe_to_changes(&self) -> ProviderResult<ChangeStream> {
        let last_seq = with_conn(&self.pool, latest_change).await?;
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = tokio::spawn(poll_changes(
            self.pool.clone(),
            tx,
            last_seq,
            self.poll_interval,
        ));
        debug!("Subscribed to change log after {}", last_seq);
        Ok(Subscription::new(rx, Registration::new(move || handle.abort())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::ChangeKind;
    use crate::domain::error::ProviderError;
    use crate::util::testing::{init_test_env, test_accounts};
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteSessionProvider) {
        init_test_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smartmark.db");
        let provider = SqliteSessionProvider::from_url(path.to_str().unwrap(), test_accounts())
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));
        (dir, provider)
    }

    fn draft(title: &str) -> NewBookmark {
        NewBookmark::parse(title, "https://example.com").unwrap()
    }

    async fn signed_in(provider: &SqliteSessionProvider) -> User {
        provider
            .sign_in_with_provider(&AuthProvider::google())
            .await
            .unwrap();
        provider.get_current_user().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn given_sign_in_when_get_current_user_then_profile_returned() {
        let (_dir, provider) = setup();
        let user = signed_in(&provider).await;
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.display_name(), "Jane Doe");
    }

    #[tokio::test]
    async fn given_repeated_sign_in_then_user_id_is_stable() {
        let (_dir, provider) = setup();
        let first = signed_in(&provider).await;
        provider.sign_out().await.unwrap();
        let second = signed_in(&provider).await;
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn given_sign_out_when_get_current_user_then_none() {
        let (_dir, provider) = setup();
        signed_in(&provider).await;
        provider.sign_out().await.unwrap();
        assert_eq!(provider.get_current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn given_inserts_when_list_then_newest_first() {
        let (_dir, provider) = setup();
        let user = signed_in(&provider).await;
        for title in ["a", "b", "c"] {
            provider.insert_bookmark(&user.id, &draft(title)).await.unwrap();
        }

        let titles: Vec<String> = provider
            .list_bookmarks(&user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn given_signed_out_when_insert_then_not_signed_in() {
        let (_dir, provider) = setup();
        let err = provider
            .insert_bookmark(&UserId::new("ghost"), &draft("x"))
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::NotSignedIn);
    }

    #[tokio::test]
    async fn given_foreign_user_id_when_insert_then_permission_denied() {
        let (_dir, provider) = setup();
        signed_in(&provider).await;
        let err = provider
            .insert_bookmark(&UserId::new("someone-else"), &draft("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn given_absent_id_when_delete_then_ok() {
        let (_dir, provider) = setup();
        signed_in(&provider).await;
        provider.delete_bookmark(BookmarkId::new(42)).await.unwrap();
    }

    #[tokio::test]
    async fn given_other_users_bookmark_when_delete_then_permission_denied() {
        let (_dir, provider) = setup();
        let jane = signed_in(&provider).await;
        let created = provider.insert_bookmark(&jane.id, &draft("mine")).await.unwrap();

        provider
            .sign_in_with_provider(&AuthProvider::new("github"))
            .await
            .unwrap();
        let err = provider.delete_bookmark(created.id).await.unwrap_err();
        assert!(matches!(err, ProviderError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn given_subscription_when_insert_and_delete_then_events_delivered() {
        let (_dir, provider) = setup();
        let user = signed_in(&provider).await;
        let before = provider.insert_bookmark(&user.id, &draft("old")).await.unwrap();
        let mut changes = provider.subscribe_to_changes().await.unwrap();

        let created = provider.insert_bookmark(&user.id, &draft("new")).await.unwrap();
        provider.delete_bookmark(before.id).await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), changes.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.event_type, ChangeKind::Insert);
        assert_eq!(first.new, Some(created));

        let second = tokio::time::timeout(Duration::from_secs(5), changes.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second, ChangeEvent::delete(before.id));
        changes.unsubscribe();
    }

    #[tokio::test]
    async fn given_sign_in_when_listening_then_auth_event() {
        let (_dir, provider) = setup();
        let mut auth = provider.on_auth_state_change();
        let user = signed_in(&provider).await;
        assert_eq!(auth.next().await, Some(Some(user)));
        provider.sign_out().await.unwrap();
        assert_eq!(auth.next().await, Some(None));
    }
}
