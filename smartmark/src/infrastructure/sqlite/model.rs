// smartmark/src/infrastructure/sqlite/model.rs
use super::error::{SqliteRepositoryError, SqliteResult};
use super::schema::{auth_session, bookmark_changes, bookmarks, users};
use crate::domain::bookmark::{Bookmark, BookmarkId};
use crate::domain::change::{ChangeEvent, ChangeKind};
use crate::domain::user::{User, UserId};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::fmt;

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct DbUser {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        User::new(UserId::new(user.id), user.email)
            .with_full_name(user.full_name)
            .with_avatar_url(user.avatar_url)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = auth_session)]
pub struct DbAuthSession<'a> {
    pub slot: i32,
    pub user_id: &'a str,
    pub signed_in_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Clone)]
#[diesel(table_name = bookmarks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbBookmark {
    pub id: i32,
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub created_at: NaiveDateTime,
}

impl fmt::Display for DbBookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {}, user_id: {}, title: {}, url: {}, created_at: {}",
            self.id, self.user_id, self.title, self.url, self.created_at
        )
    }
}

impl fmt::Debug for DbBookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl TryFrom<DbBookmark> for Bookmark {
    type Error = SqliteRepositoryError;

    fn try_from(row: DbBookmark) -> SqliteResult<Self> {
        Ok(Bookmark::from_storage(
            row.id,
            row.user_id,
            row.title,
            row.url,
            row.created_at.and_utc(),
        )?)
    }
}

/// New bookmark for insertion
#[derive(Insertable, Debug)]
#[diesel(table_name = bookmarks)]
pub struct NewDbBookmark<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    pub url: &'a str,
    pub created_at: NaiveDateTime,
}

/// Row of the trigger-maintained change log
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = bookmark_changes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbChange {
    pub seq: i32,
    pub event_type: String,
    pub bookmark_id: i32,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl DbChange {
    /// `None` for event kinds the feed does not carry
    pub fn into_event(self) -> SqliteResult<Option<ChangeEvent>> {
        match ChangeKind::from(self.event_type.clone()) {
            ChangeKind::Insert => {
                let (Some(user_id), Some(title), Some(url), Some(created_at)) =
                    (self.user_id, self.title, self.url, self.created_at)
                else {
                    return Err(SqliteRepositoryError::ConversionError(format!(
                        "incomplete INSERT change {}",
                        self.seq
                    )));
                };
                let bookmark = Bookmark::from_storage(
                    self.bookmark_id,
                    user_id,
                    title,
                    url,
                    created_at.and_utc(),
                )?;
                Ok(Some(ChangeEvent::insert(bookmark)))
            }
            ChangeKind::Delete => Ok(Some(ChangeEvent::delete(BookmarkId::new(
                self.bookmark_id,
            )))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn given_insert_row_when_converted_then_full_bookmark() {
        let row = DbChange {
            seq: 1,
            event_type: "INSERT".to_string(),
            bookmark_id: 4,
            user_id: Some("u1".to_string()),
            title: Some("Example".to_string()),
            url: Some("https://example.com".to_string()),
            created_at: Some(timestamp()),
        };
        let event = row.into_event().unwrap().unwrap();
        assert_eq!(event.event_type, ChangeKind::Insert);
        assert_eq!(event.new.unwrap().id, BookmarkId::new(4));
    }

    #[test]
    fn given_delete_row_when_converted_then_only_key() {
        let row = DbChange {
            seq: 2,
            event_type: "DELETE".to_string(),
            bookmark_id: 4,
            user_id: Some("u1".to_string()),
            title: None,
            url: None,
            created_at: None,
        };
        assert_eq!(
            row.into_event().unwrap(),
            Some(ChangeEvent::delete(BookmarkId::new(4)))
        );
    }

    #[test]
    fn given_incomplete_insert_row_when_converted_then_error() {
        let row = DbChange {
            seq: 3,
            event_type: "INSERT".to_string(),
            bookmark_id: 5,
            user_id: None,
            title: None,
            url: None,
            created_at: None,
        };
        assert!(row.into_event().is_err());
    }
}
