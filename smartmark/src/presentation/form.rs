// smartmark/src/presentation/form.rs
use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::bookmark::{Bookmark, NewBookmark};
use crate::presentation::notice::{Notice, BOOKMARK_ADDED};

pub const SUBMIT_LABEL: &str = "Add Bookmark";
pub const SUBMITTING_LABEL: &str = "Adding...";

/// Outcome of pressing submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStart {
    /// Submission accepted; the form is now in flight
    Started { title: String, url: String },
    /// A submission is already in flight
    Busy,
    /// Rejected locally, nothing was sent
    Invalid(Notice),
}

/// Creation form: two fields and an in-flight flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    title: String,
    url: String,
    in_flight: bool,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn submit_label(&self) -> &'static str {
        if self.in_flight {
            SUBMITTING_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    pub fn begin_submit(&mut self) -> SubmitStart {
        if self.in_flight {
            return SubmitStart::Busy;
        }
        if let Err(e) = NewBookmark::parse(&self.title, &self.url) {
            return SubmitStart::Invalid(Notice::add_failure(&ApplicationError::Validation(e)));
        }
        self.in_flight = true;
        SubmitStart::Started {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }

    /// Leaves the in-flight state; fields are cleared only on success
    pub fn finish(&mut self, result: &ApplicationResult<Bookmark>) -> Notice {
        self.in_flight = false;
        match result {
            Ok(_) => {
                self.title.clear();
                self.url.clear();
                Notice::success(BOOKMARK_ADDED)
            }
            Err(e) => Notice::add_failure(e),
        }
    }
}
