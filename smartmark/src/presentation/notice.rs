// smartmark/src/presentation/notice.rs
//! Transient one-line messages reporting the outcome of an operation.

use crate::application::error::ApplicationError;
use crate::domain::error::DomainError;
use crate::infrastructure::lock;
use std::fmt;
use std::io::Write;
use std::sync::Mutex;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::warn;

pub const FILL_ALL_FIELDS: &str = "Please fill in all fields";
pub const INVALID_URL: &str = "Please enter a valid URL";
pub const MUST_BE_LOGGED_IN: &str = "You must be logged in";
pub const BOOKMARK_ADDED: &str = "Bookmark added successfully!";
pub const ADD_FAILED: &str = "Failed to add bookmark";
pub const LOAD_FAILED: &str = "Failed to load bookmarks";
pub const DELETE_FAILED: &str = "Failed to delete bookmark";
pub const FEED_INSERT: &str = "New bookmark added!";
pub const FEED_DELETE: &str = "Bookmark deleted";
pub const LOGGED_OUT: &str = "Logged out successfully";
pub const LOGOUT_FAILED: &str = "Failed to log out";
pub const AUTH_ERROR: &str = "Authentication error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }

    /// Notice for a failed bookmark submission
    pub fn add_failure(err: &ApplicationError) -> Self {
        match err {
            ApplicationError::Validation(DomainError::MissingField(_)) => Self::error(FILL_ALL_FIELDS),
            ApplicationError::Validation(DomainError::InvalidUrl(_)) => Self::error(INVALID_URL),
            ApplicationError::Unauthenticated => Self::error(MUST_BE_LOGGED_IN),
            _ => Self::error(ADD_FAILED),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Sink for notices; the terminal prints them, tests collect them.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Prints notices to stderr, green for success and red for errors
#[derive(Debug)]
pub struct TerminalNotifier {
    color_choice: ColorChoice,
}

impl TerminalNotifier {
    pub fn new(color_choice: ColorChoice) -> Self {
        Self { color_choice }
    }

    fn write(&self, notice: &Notice) -> std::io::Result<()> {
        let mut stderr = StandardStream::stderr(self.color_choice);
        let color = match notice.level {
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Error => Color::Red,
        };
        stderr.set_color(ColorSpec::new().set_fg(Some(color)))?;
        writeln!(&mut stderr, "{}", notice.message)?;
        stderr.reset()
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: &Notice) {
        if let Err(e) = self.write(notice) {
            warn!("Cannot print notice '{}': {}", notice, e);
        }
    }
}

/// Keeps every notice in order of arrival
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.notices)
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn contains(&self, message: &str) -> bool {
        lock(&self.notices).iter().any(|n| n.message == message)
    }

    pub fn clear(&self) {
        lock(&self.notices).clear();
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: &Notice) {
        lock(&self.notices).push(notice.clone());
    }
}
