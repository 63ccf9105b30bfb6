// smartmark/src/presentation/list_view.rs
//! Reconciled list of the signed-in user's bookmarks.
//!
//! The list is fed from three directions: the initial snapshot, the change
//! feed and the creation form's optimistic entries. `ListState::apply` merges
//! them one event at a time:
//!
//! * an INSERT for an id already shown is dropped, and one matching a pending
//!   entry by title and url replaces that entry;
//! * an INSERT for an id the store confirmed before the feed reported it still
//!   raises the feed notice, once;
//! * a DELETE removes the id and leaves a tombstone, so an INSERT for that id
//!   arriving late stays dropped; only the most recent tombstones are kept;
//! * a snapshot keeps entries the feed added meanwhile and skips tombstoned ids;
//! * pending entries leave on confirmation, rejection or expiry.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::domain::bookmark::{Bookmark, BookmarkId};
use crate::domain::change::{ChangeEvent, ChangeKind};
use crate::domain::user::UserId;
use crate::presentation::notice::{Notice, FEED_DELETE, FEED_INSERT, LOAD_FAILED};
use tracing::{debug, trace};

/// Deleted ids remembered to drop late inserts
pub const TOMBSTONE_LIMIT: usize = 256;

/// Marks an optimistic entry until the store answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingToken(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    Saved(Bookmark),
    Pending {
        token: PendingToken,
        title: String,
        url: String,
        since: Instant,
    },
}

impl ListEntry {
    pub fn title(&self) -> &str {
        match self {
            ListEntry::Saved(b) => &b.title,
            ListEntry::Pending { title, .. } => title,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ListEntry::Saved(b) => &b.url,
            ListEntry::Pending { url, .. } => url,
        }
    }

    pub fn id(&self) -> Option<BookmarkId> {
        match self {
            ListEntry::Saved(b) => Some(b.id),
            ListEntry::Pending { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ListEntry::Pending { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    Loaded(Vec<Bookmark>),
    LoadFailed,
    Changed(ChangeEvent),
    Submitted {
        token: PendingToken,
        title: String,
        url: String,
        at: Instant,
    },
    Confirmed {
        token: PendingToken,
        bookmark: Bookmark,
    },
    Rejected(PendingToken),
    Expire {
        now: Instant,
        timeout: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct ListState {
    owner: UserId,
    loading: bool,
    entries: Vec<ListEntry>,
    tombstones: HashSet<BookmarkId>,
    tombstone_order: VecDeque<BookmarkId>,
    // confirmed by the store, not yet reported by the feed
    unannounced: HashSet<BookmarkId>,
}

impl ListState {
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            loading: true,
            entries: Vec::new(),
            tombstones: HashSet::new(),
            tombstone_order: VecDeque::new(),
            unannounced: HashSet::new(),
        }
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn saved(&self) -> impl Iterator<Item = &Bookmark> {
        self.entries.iter().filter_map(|e| match e {
            ListEntry::Saved(b) => Some(b),
            ListEntry::Pending { .. } => None,
        })
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    pub fn contains(&self, id: BookmarkId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    pub fn apply(&mut self, event: ListEvent) -> Option<Notice> {
        match event {
            ListEvent::Loaded(snapshot) => {
                self.merge_snapshot(snapshot);
                None
            }
            ListEvent::LoadFailed => {
                self.loading = false;
                Some(Notice::error(LOAD_FAILED))
            }
            ListEvent::Changed(change) => self.apply_change(change),
            ListEvent::Submitted {
                token,
                title,
                url,
                at,
            } => {
                self.entries.insert(
                    0,
                    ListEntry::Pending {
                        token,
                        title,
                        url,
                        since: at,
                    },
                );
                None
            }
            ListEvent::Confirmed { token, bookmark } => {
                self.remove_pending(token);
                if bookmark.is_owned_by(&self.owner) {
                    let id = bookmark.id;
                    if self.insert_saved(bookmark) {
                        self.unannounced.insert(id);
                    }
                }
                None
            }
            ListEvent::Rejected(token) => {
                self.remove_pending(token);
                None
            }
            ListEvent::Expire { now, timeout } => {
                let before = self.entries.len();
                self.entries.retain(|e| match e {
                    ListEntry::Pending { since, .. } => now.saturating_duration_since(*since) < timeout,
                    ListEntry::Saved(_) => true,
                });
                if self.entries.len() != before {
                    debug!("Expired {} pending entries", before - self.entries.len());
                }
                None
            }
        }
    }

    fn apply_change(&mut self, change: ChangeEvent) -> Option<Notice> {
        match change.event_type {
            ChangeKind::Insert => {
                let bookmark = change.new?;
                if !bookmark.is_owned_by(&self.owner) {
                    trace!("Ignoring insert of bookmark {} for another user", bookmark.id);
                    return None;
                }
                if self.tombstones.contains(&bookmark.id) {
                    return None;
                }
                if self.contains(bookmark.id) {
                    return self
                        .unannounced
                        .remove(&bookmark.id)
                        .then(|| Notice::success(FEED_INSERT));
                }
                if let Some(pos) = self.entries.iter().position(|e| {
                    e.is_pending() && e.title() == bookmark.title && e.url() == bookmark.url
                }) {
                    self.entries.remove(pos);
                }
                self.insert_saved(bookmark);
                Some(Notice::success(FEED_INSERT))
            }
            ChangeKind::Delete => {
                let id = change.old?.id;
                self.unannounced.remove(&id);
                self.bury(id);
                let pos = self.position_of(id)?;
                self.entries.remove(pos);
                Some(Notice::success(FEED_DELETE))
            }
            other => {
                trace!("Ignoring {} change", other);
                None
            }
        }
    }

    fn merge_snapshot(&mut self, snapshot: Vec<Bookmark>) {
        self.loading = false;
        for bookmark in snapshot {
            if bookmark.is_owned_by(&self.owner) && !self.tombstones.contains(&bookmark.id) {
                self.insert_saved(bookmark);
            }
        }
    }

    fn bury(&mut self, id: BookmarkId) {
        if !self.tombstones.insert(id) {
            return;
        }
        self.tombstone_order.push_back(id);
        if self.tombstone_order.len() > TOMBSTONE_LIMIT {
            if let Some(oldest) = self.tombstone_order.pop_front() {
                self.tombstones.remove(&oldest);
            }
        }
    }

    /// Keeps saved entries newest first; pending entries stay in place.
    /// An id already present is not added twice. Returns whether it was added.
    fn insert_saved(&mut self, bookmark: Bookmark) -> bool {
        if self.tombstones.contains(&bookmark.id) || self.contains(bookmark.id) {
            return false;
        }
        let key = (bookmark.created_at, bookmark.id);
        let pos = self
            .entries
            .iter()
            .position(|e| matches!(e, ListEntry::Saved(b) if (b.created_at, b.id) < key))
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, ListEntry::Saved(bookmark));
        true
    }

    fn remove_pending(&mut self, token: PendingToken) {
        self.entries
            .retain(|e| !matches!(e, ListEntry::Pending { token: t, .. } if *t == token));
    }

    fn position_of(&self, id: BookmarkId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == Some(id))
    }
}
