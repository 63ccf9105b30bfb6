// smartmark/src/util/helper.rs
use crate::domain::bookmark::BookmarkId;
use crate::domain::error::{DomainError, DomainResult};

/// Parses a comma-separated id list such as `3,1, 2`: sorted, duplicates removed
pub fn parse_ids(ids: &str) -> DomainResult<Vec<BookmarkId>> {
    let mut parsed = ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<BookmarkId>)
        .collect::<DomainResult<Vec<_>>>()?;
    if parsed.is_empty() {
        return Err(DomainError::InvalidBookmarkId(ids.to_string()));
    }
    parsed.sort();
    parsed.dedup();
    Ok(parsed)
}
