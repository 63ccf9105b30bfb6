// smartmark/src/presentation/page.rs
//! The bookmark page: session control, creation form and live list.
//!
//! A `Page` owns the three view states and every subscription it opens.
//! User actions start remote calls as tasks; their results, auth-state
//! notifications and change-feed events are applied one at a time by
//! `pump`. All of it stops at `teardown`.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, instrument, trace, warn};

use crate::application::error::ApplicationResult;
use crate::application::services::bookmark_store::BookmarkStore;
use crate::config::Settings;
use crate::domain::bookmark::{Bookmark, BookmarkId};
use crate::domain::session_provider::{AuthProvider, AuthStateStream, ChangeStream};
use crate::domain::subscription::Subscription;
use crate::domain::user::User;
use crate::presentation::form::{FormState, SubmitStart};
use crate::presentation::lifetime::Lifetime;
use crate::presentation::list_view::{ListEvent, ListState, PendingToken};
use crate::presentation::notice::{
    Notice, Notifier, AUTH_ERROR, DELETE_FAILED, LOGGED_OUT, LOGOUT_FAILED,
};
use crate::presentation::session_view::{AuthEvent, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
    pub pending_timeout: Duration,
    pub expiry_check: Duration,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            pending_timeout: Duration::from_secs(10),
            expiry_check: Duration::from_secs(1),
        }
    }
}

impl From<&Settings> for PageSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            pending_timeout: settings.pending_timeout(),
            ..Self::default()
        }
    }
}

/// What a call to `Page::pump` processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Completion,
    AuthChange,
    FeedEvent,
    Tick,
    Closed,
}

#[derive(Debug)]
enum Completion {
    SessionResolved(ApplicationResult<Option<User>>),
    Subscribed {
        generation: u64,
        result: ApplicationResult<ChangeStream>,
    },
    Loaded {
        generation: u64,
        result: ApplicationResult<Vec<Bookmark>>,
    },
    Added {
        token: PendingToken,
        result: ApplicationResult<Bookmark>,
    },
    Removed {
        id: BookmarkId,
        result: ApplicationResult<()>,
    },
    SignedIn(ApplicationResult<()>),
    SignedOut(ApplicationResult<()>),
}

enum Input {
    Completion(Completion),
    Auth(Option<Option<User>>),
    Feed(Option<crate::domain::change::ChangeEvent>),
    Tick,
}

async fn next_or_pending<T>(stream: Option<&mut Subscription<T>>) -> Option<T> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

pub struct Page {
    store: Arc<dyn BookmarkStore>,
    notifier: Arc<dyn Notifier>,
    settings: PageSettings,
    lifetime: Lifetime,
    session: SessionState,
    form: FormState,
    list: Option<ListState>,
    generation: u64,
    next_token: u64,
    auth: Option<AuthStateStream>,
    changes: Option<ChangeStream>,
    completions: mpsc::UnboundedSender<Completion>,
    inbox: mpsc::UnboundedReceiver<Completion>,
    last_notice: Option<Notice>,
    mounted: bool,
}

impl Page {
    pub fn new(
        store: Arc<dyn BookmarkStore>,
        notifier: Arc<dyn Notifier>,
        settings: PageSettings,
    ) -> Self {
        let (completions, inbox) = mpsc::unbounded_channel();
        Self {
            store,
            notifier,
            settings,
            lifetime: Lifetime::new(),
            session: SessionState::default(),
            form: FormState::new(),
            list: None,
            generation: 0,
            next_token: 0,
            auth: None,
            changes: None,
            completions,
            inbox,
            last_notice: None,
            mounted: false,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn list(&self) -> Option<&ListState> {
        self.list.as_ref()
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.last_notice.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.changes.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.lifetime.is_ended()
    }

    /// Registers for auth-state changes and resolves the current user
    #[instrument(skip(self), level = "debug")]
    pub fn mount(&mut self) {
        if self.mounted || self.is_closed() {
            return;
        }
        self.mounted = true;
        self.auth = Some(self.store.auth_changes());

        let store = self.store.clone();
        self.spawn(async move { Completion::SessionResolved(store.current_user().await) });
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.form.set_title(title);
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.form.set_url(url);
    }

    /// Returns true when a submission was started
    #[instrument(skip(self), level = "debug")]
    pub fn submit(&mut self) -> bool {
        let (title, url) = match self.form.begin_submit() {
            SubmitStart::Started { title, url } => (title, url),
            SubmitStart::Busy => {
                debug!("Submission already in flight");
                return false;
            }
            SubmitStart::Invalid(notice) => {
                self.emit(Some(notice));
                return false;
            }
        };

        self.next_token += 1;
        let token = PendingToken(self.next_token);
        if let Some(list) = self.list.as_mut() {
            list.apply(ListEvent::Submitted {
                token,
                title: title.clone(),
                url: url.clone(),
                at: Instant::now(),
            });
        }

        let store = self.store.clone();
        self.spawn(async move {
            let result = store.add_bookmark(&title, &url).await;
            Completion::Added { token, result }
        });
        true
    }

    /// The entry stays until the feed reports the DELETE
    #[instrument(skip(self), level = "debug")]
    pub fn delete(&mut self, id: BookmarkId) {
        let store = self.store.clone();
        self.spawn(async move {
            let result = store.remove_bookmark(id).await;
            Completion::Removed { id, result }
        });
    }

    #[instrument(skip(self), level = "debug")]
    pub fn sign_in(&mut self, provider: AuthProvider) {
        let store = self.store.clone();
        self.spawn(async move { Completion::SignedIn(store.sign_in(&provider).await) });
    }

    /// The session view changes only when the auth-state stream reports it
    #[instrument(skip(self), level = "debug")]
    pub fn sign_out(&mut self) {
        let store = self.store.clone();
        self.spawn(async move { Completion::SignedOut(store.sign_out().await) });
    }

    /// Ends the page: outstanding results are discarded and both
    /// subscriptions are released
    #[instrument(skip(self), level = "debug")]
    pub fn teardown(&mut self) {
        if self.is_closed() {
            return;
        }
        self.lifetime.end();
        if let Some(auth) = self.auth.take() {
            auth.unsubscribe();
        }
        self.release_feed();
        self.list = None;
    }

    /// Waits for the next event and applies it
    pub async fn pump(&mut self) -> Step {
        if self.is_closed() {
            return Step::Closed;
        }

        let input = {
            let auth = self.auth.as_mut();
            let changes = self.changes.as_mut();
            tokio::select! {
                Some(completion) = self.inbox.recv() => Input::Completion(completion),
                event = next_or_pending(auth) => Input::Auth(event),
                event = next_or_pending(changes) => Input::Feed(event),
                _ = tokio::time::sleep(self.settings.expiry_check) => Input::Tick,
            }
        };

        let step = match input {
            Input::Completion(completion) => {
                self.apply_completion(completion);
                Step::Completion
            }
            Input::Auth(Some(user)) => {
                self.apply_session(AuthEvent::Changed(user));
                Step::AuthChange
            }
            Input::Auth(None) => {
                debug!("Auth-state stream closed");
                self.auth = None;
                Step::AuthChange
            }
            Input::Feed(Some(change)) => {
                let notice = self
                    .list
                    .as_mut()
                    .and_then(|list| list.apply(ListEvent::Changed(change)));
                self.emit(notice);
                Step::FeedEvent
            }
            Input::Feed(None) => {
                debug!("Change feed closed");
                self.changes = None;
                Step::FeedEvent
            }
            Input::Tick => Step::Tick,
        };

        self.expire_pending();
        step
    }

    /// Pumps until `predicate` holds; false when the page closes or time runs out
    pub async fn wait_for(&mut self, timeout: Duration, predicate: impl Fn(&Page) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !predicate(self) {
            match tokio::time::timeout_at(deadline, self.pump()).await {
                Ok(Step::Closed) | Err(_) => return predicate(self),
                Ok(_) => {}
            }
        }
        true
    }

    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let token = self.lifetime.token();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            if let Some(completion) = token.guard(work).await {
                let _ = completions.send(completion);
            }
        });
    }

    fn apply_completion(&mut self, completion: Completion) {
        trace!("Applying {:?}", completion);
        match completion {
            Completion::SessionResolved(Ok(user)) => self.apply_session(AuthEvent::Resolved(user)),
            Completion::SessionResolved(Err(_)) => self.apply_session(AuthEvent::ResolveFailed),
            Completion::Subscribed { generation, result } => match result {
                Ok(stream) if generation == self.generation => {
                    self.release_feed();
                    self.changes = Some(stream);
                }
                Ok(stream) => stream.unsubscribe(),
                Err(e) => warn!("Live updates unavailable: {}", e),
            },
            Completion::Loaded { generation, result } => {
                if generation != self.generation {
                    return;
                }
                let event = match result {
                    Ok(bookmarks) => ListEvent::Loaded(bookmarks),
                    Err(_) => ListEvent::LoadFailed,
                };
                let notice = self.list.as_mut().and_then(|list| list.apply(event));
                self.emit(notice);
            }
            Completion::Added { token, result } => {
                let notice = self.form.finish(&result);
                self.emit(Some(notice));
                let event = match result {
                    Ok(bookmark) => ListEvent::Confirmed { token, bookmark },
                    Err(_) => ListEvent::Rejected(token),
                };
                if let Some(list) = self.list.as_mut() {
                    list.apply(event);
                }
            }
            Completion::Removed { id, result } => {
                if result.is_err() {
                    debug!("Delete of {} failed", id);
                    self.emit(Some(Notice::error(DELETE_FAILED)));
                }
            }
            Completion::SignedIn(result) => {
                if result.is_err() {
                    self.emit(Some(Notice::error(AUTH_ERROR)));
                }
            }
            Completion::SignedOut(result) => {
                let notice = match result {
                    Ok(()) => Notice::success(LOGGED_OUT),
                    Err(_) => Notice::error(LOGOUT_FAILED),
                };
                self.emit(Some(notice));
            }
        }
    }

    fn apply_session(&mut self, event: AuthEvent) {
        let notice = self.session.apply(event);
        self.emit(notice);
        self.sync_list();
    }

    /// Rebuilds list and feed whenever the signed-in user changes
    fn sync_list(&mut self) {
        let wanted = self.session.user().map(|u| u.id.clone());
        if wanted.as_ref() == self.list.as_ref().map(|l| l.owner()) {
            return;
        }

        self.release_feed();
        self.list = None;
        self.generation += 1;

        let Some(owner) = wanted else {
            return;
        };
        debug!("Mounting list for {}", owner);
        self.list = Some(ListState::new(owner));

        let generation = self.generation;
        let store = self.store.clone();
        let completions = self.completions.clone();
        // subscribe before loading so nothing between snapshot and feed is lost
        self.spawn(async move {
            let result = store.subscribe().await;
            let _ = completions.send(Completion::Subscribed { generation, result });
            let result = store.load_bookmarks().await;
            Completion::Loaded { generation, result }
        });
    }

    fn release_feed(&mut self) {
        if let Some(changes) = self.changes.take() {
            changes.unsubscribe();
        }
    }

    fn expire_pending(&mut self) {
        let timeout = self.settings.pending_timeout;
        if let Some(list) = self.list.as_mut() {
            if list.pending_count() > 0 {
                list.apply(ListEvent::Expire {
                    now: Instant::now(),
                    timeout,
                });
            }
        }
    }

    fn emit(&mut self, notice: Option<Notice>) {
        if let Some(notice) = notice {
            debug!("Notice: {}", notice);
            self.notifier.notify(&notice);
            self.last_notice = Some(notice);
        }
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::BookmarkStoreClient;
    use crate::domain::session_provider::SessionProvider;
    use crate::infrastructure::memory::{InMemoryBackend, InMemorySessionProvider, Operation};
    use crate::presentation::notice::{NoticeLog, AUTH_ERROR, LOAD_FAILED};
    use crate::util::testing::{init_test_env, test_backend};

    const WAIT: Duration = Duration::from_secs(5);

    fn page_for(session: &Arc<InMemorySessionProvider>) -> (Page, Arc<NoticeLog>) {
        let log = Arc::new(NoticeLog::new());
        let store = Arc::new(BookmarkStoreClient::new(session.clone()));
        (Page::new(store, log.clone(), PageSettings::default()), log)
    }

    async fn mounted(backend: &InMemoryBackend) -> (Page, Arc<NoticeLog>, Arc<InMemorySessionProvider>) {
        let session = Arc::new(backend.connect());
        let (mut page, log) = page_for(&session);
        page.mount();
        assert!(page.wait_for(WAIT, |p| !p.session().is_loading()).await);
        (page, log, session)
    }

    #[tokio::test]
    async fn given_signed_out_session_when_mounted_then_unauthenticated_without_list() {
        init_test_env();
        let backend = test_backend();
        let (page, _log, _session) = mounted(&backend).await;
        assert_eq!(page.session(), &SessionState::Unauthenticated);
        assert!(page.list().is_none());
    }

    #[tokio::test]
    async fn given_failing_lookup_when_mounted_then_auth_error() {
        init_test_env();
        let backend = test_backend();
        let session = Arc::new(backend.connect());
        session.fail_next(Operation::GetCurrentUser);
        let (mut page, log) = page_for(&session);

        page.mount();
        assert!(page.wait_for(WAIT, |p| !p.session().is_loading()).await);

        assert_eq!(page.session(), &SessionState::Unauthenticated);
        assert!(log.contains(AUTH_ERROR));
    }

    #[tokio::test]
    async fn given_sign_in_when_notified_then_list_mounted_and_live() {
        init_test_env();
        let backend = test_backend();
        let (mut page, _log, _session) = mounted(&backend).await;

        page.sign_in(AuthProvider::google());

        assert!(page.wait_for(WAIT, |p| p.is_live() && p.list().is_some_and(|l| !l.is_loading())).await);
        assert_eq!(
            page.session().user().map(|u| u.email.as_str()),
            Some("jane@example.com")
        );
    }

    #[tokio::test]
    async fn given_sign_out_when_confirmed_then_notice_and_list_released() {
        init_test_env();
        let backend = test_backend();
        let (mut page, log, _session) = mounted(&backend).await;
        page.sign_in(AuthProvider::google());
        assert!(page.wait_for(WAIT, |p| p.is_live()).await);

        page.sign_out();

        assert!(page.wait_for(WAIT, |p| p.list().is_none() && log.contains(LOGGED_OUT)).await);
        assert_eq!(page.session(), &SessionState::Unauthenticated);
        assert_eq!(backend.change_listeners(), 0);
    }

    #[tokio::test]
    async fn given_failed_load_when_signed_in_then_load_notice() {
        init_test_env();
        let backend = test_backend();
        let (mut page, log, session) = mounted(&backend).await;
        session.fail_next(Operation::ListBookmarks);

        page.sign_in(AuthProvider::google());

        assert!(page.wait_for(WAIT, |p| p.list().is_some_and(|l| !l.is_loading())).await);
        assert!(log.contains(LOAD_FAILED));
    }

    #[tokio::test]
    async fn given_submission_when_in_flight_then_pending_entry_shown() {
        init_test_env();
        let backend = test_backend();
        let (mut page, _log, _session) = mounted(&backend).await;
        page.sign_in(AuthProvider::google());
        assert!(page.wait_for(WAIT, |p| p.list().is_some_and(|l| !l.is_loading())).await);

        page.set_title("Example");
        page.set_url("https://example.com");
        assert!(page.submit());

        assert!(page.form().is_in_flight());
        assert_eq!(page.list().map(|l| l.pending_count()), Some(1));
        assert!(!page.submit());
    }

    #[tokio::test]
    async fn given_insert_failure_when_submitted_then_rolled_back_and_fields_kept() {
        init_test_env();
        let backend = test_backend();
        let (mut page, log, session) = mounted(&backend).await;
        page.sign_in(AuthProvider::google());
        assert!(page.wait_for(WAIT, |p| p.list().is_some_and(|l| !l.is_loading())).await);
        session.fail_next(Operation::InsertBookmark);

        page.set_title("Example");
        page.set_url("https://example.com");
        page.submit();

        assert!(page.wait_for(WAIT, |p| !p.form().is_in_flight()).await);
        assert!(log.contains(crate::presentation::notice::ADD_FAILED));
        assert_eq!(page.list().map(|l| l.len()), Some(0));
        assert_eq!(page.form().title(), "Example");
    }

    #[tokio::test]
    async fn given_delete_failure_then_generic_notice_and_entry_kept() {
        init_test_env();
        let backend = test_backend();
        let (mut page, log, session) = mounted(&backend).await;
        page.sign_in(AuthProvider::google());
        assert!(page.wait_for(WAIT, |p| p.is_live()).await);
        let user = session.get_current_user().await.unwrap().unwrap();
        let created = session
            .insert_bookmark(
                &user.id,
                &crate::domain::bookmark::NewBookmark::parse("a", "https://a.example").unwrap(),
            )
            .await
            .unwrap();
        assert!(page.wait_for(WAIT, |p| p.list().is_some_and(|l| l.contains(created.id))).await);

        session.fail_next(Operation::DeleteBookmark);
        page.delete(created.id);

        assert!(page.wait_for(WAIT, |_| log.contains(DELETE_FAILED)).await);
        assert!(page.list().is_some_and(|l| l.contains(created.id)));
    }

    #[tokio::test]
    async fn given_teardown_then_subscriptions_released_and_results_discarded() {
        init_test_env();
        let backend = test_backend();
        let (mut page, log, session) = mounted(&backend).await;
        page.sign_in(AuthProvider::google());
        assert!(page.wait_for(WAIT, |p| p.is_live()).await);
        assert_eq!(session.auth_listeners(), 1);
        assert_eq!(backend.change_listeners(), 1);
        log.clear();

        page.sign_out();
        page.teardown();

        assert_eq!(page.pump().await, Step::Closed);
        assert_eq!(session.auth_listeners(), 0);
        assert_eq!(backend.change_listeners(), 0);
        tokio::task::yield_now().await;
        assert!(log.notices().is_empty());
    }
}
