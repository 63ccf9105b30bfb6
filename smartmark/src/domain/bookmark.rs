// smartmark/src/domain/bookmark.rs
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::user::UserId;
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Provider-assigned bookmark identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(i32);

impl BookmarkId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookmarkId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i32>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(DomainError::InvalidBookmarkId(s.to_string())),
        }
    }
}

/// A bookmark draft that passed local validation.
///
/// Only a `NewBookmark` can be handed to a provider for insertion. The URL is
/// kept exactly as entered; parsing only decides whether it is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBookmark {
    title: String,
    url: String,
}

impl NewBookmark {
    /// Field presence is checked before URL syntax. Any non-empty title is
    /// accepted, whitespace included; an empty url counts as a missing field.
    pub fn parse(title: &str, url: &str) -> DomainResult<Self> {
        if title.is_empty() {
            return Err(DomainError::MissingField("title"));
        }
        if url.is_empty() {
            return Err(DomainError::MissingField("url"));
        }
        Url::parse(url).map_err(|_| DomainError::InvalidUrl(url.to_string()))?;

        Ok(Self {
            title: title.to_string(),
            url: url.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A persisted bookmark, owned by exactly one user
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct Bookmark {
    pub id: BookmarkId,
    pub user_id: UserId,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl BookmarkBuilder {
    fn validate(&self) -> Result<(), String> {
        if matches!(&self.title, Some(t) if t.is_empty()) {
            return Err("title must not be empty".to_string());
        }
        if matches!(&self.url, Some(u) if u.is_empty()) {
            return Err("url must not be empty".to_string());
        }
        Ok(())
    }
}

impl Bookmark {
    pub fn from_storage(
        id: i32,
        user_id: String,
        title: String,
        url: String,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let bookmark = BookmarkBuilder::default()
            .id(BookmarkId::new(id))
            .user_id(UserId::new(user_id))
            .title(title)
            .url(url)
            .created_at(created_at)
            .build()?;
        Ok(bookmark)
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.id, self.title, self.url)
    }
}

/// Newest first; equal timestamps fall back to the higher id.
pub fn sort_newest_first(bookmarks: &mut [Bookmark]) {
    bookmarks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn bookmark(id: i32, secs: i64) -> Bookmark {
        Bookmark::from_storage(
            id,
            "u1".to_string(),
            format!("title {}", id),
            "https://example.com".to_string(),
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn given_valid_input_when_parse_then_keeps_url_verbatim() {
        let draft = NewBookmark::parse("Example", "https://example.com").unwrap();
        assert_eq!(draft.title(), "Example");
        assert_eq!(draft.url(), "https://example.com");
    }

    #[rstest]
    #[case("", "https://example.com", DomainError::MissingField("title"))]
    #[case("Example", "", DomainError::MissingField("url"))]
    #[case("Example", "   ", DomainError::InvalidUrl("   ".to_string()))]
    #[case("Example", "not a url", DomainError::InvalidUrl("not a url".to_string()))]
    #[case("Example", "example.com", DomainError::InvalidUrl("example.com".to_string()))]
    #[case("Example", "/relative/path", DomainError::InvalidUrl("/relative/path".to_string()))]
    fn given_invalid_input_when_parse_then_rejects(
        #[case] title: &str,
        #[case] url: &str,
        #[case] expected: DomainError,
    ) {
        assert_eq!(NewBookmark::parse(title, url).unwrap_err(), expected);
    }

    #[test]
    fn given_whitespace_title_when_parse_then_kept_as_entered() {
        let draft = NewBookmark::parse("   ", "https://example.com").unwrap();
        assert_eq!(draft.title(), "   ");
    }

    #[rstest]
    #[case("mailto:jane@example.com")]
    #[case("ftp://files.example.com/a.txt")]
    #[case("http://localhost:8080/path?q=1#frag")]
    fn given_absolute_non_http_url_when_parse_then_accepts(#[case] url: &str) {
        assert!(NewBookmark::parse("t", url).is_ok());
    }

    #[test]
    fn given_empty_title_when_building_then_fails() {
        let result = Bookmark::from_storage(
            1,
            "u1".to_string(),
            String::new(),
            "https://example.com".to_string(),
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(DomainError::BookmarkOperationFailed(_))
        ));
    }

    #[test]
    fn given_mixed_timestamps_when_sorting_then_newest_first_with_id_tiebreak() {
        let mut bookmarks = vec![bookmark(1, 10), bookmark(3, 30), bookmark(2, 30), bookmark(4, 20)];
        sort_newest_first(&mut bookmarks);
        let ids: Vec<i32> = bookmarks.iter().map(|b| b.id.value()).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }

    #[rstest]
    #[case("7", Some(7))]
    #[case(" 12 ", Some(12))]
    #[case("0", None)]
    #[case("-3", None)]
    #[case("abc", None)]
    fn given_text_when_parsing_bookmark_id_then_accepts_positive_integers(
        #[case] input: &str,
        #[case] expected: Option<i32>,
    ) {
        assert_eq!(
            input.parse::<BookmarkId>().ok().map(BookmarkId::value),
            expected
        );
    }
}
