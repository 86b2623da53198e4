//! Row probes shared by observer snapshots and incremental diffing.
//!
//! # Responsibility
//! - Load the (id, sort value, insertion seq) keys of rows matching a query.
//! - Re-probe single rows by id after a commit.
//! - Implement case- and diacritic-insensitive title matching.
//!
//! # Invariants
//! - Snapshot and probe read the same columns through the same SQL shapes,
//!   so an incrementally maintained result set never drifts from a fresh one.
//! - Filters are evaluated in Rust; SQL only narrows by scope.

use crate::repo::notebook_repo::parse_uuid_column;
use crate::repo::RepoResult;
use crate::watch::{QueryScope, SortKey, WatchQuery};
use rusqlite::{Connection, Row};
use uuid::Uuid;

/// Ordering key of one row inside an observed result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RowKey {
    pub id: Uuid,
    pub sort: SortValue,
    /// Store-wide insertion sequence; unique, breaks all sort ties.
    pub seq: i64,
}

/// Value of the declared sort key for one row.
///
/// The derived ordering never compares across variants in practice; a query
/// produces one variant for all of its rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum SortValue {
    Text(String),
    Int(i64),
}

/// Loads every row currently matching the query, in storage scan order.
pub(crate) fn snapshot_rows(conn: &Connection, query: &WatchQuery) -> RepoResult<Vec<RowKey>> {
    let (sql, param) = match &query.scope {
        QueryScope::AllNotebooks => (
            "SELECT uuid, title, created_at, seq FROM notebooks;".to_string(),
            None,
        ),
        QueryScope::NotesIn(notebook) => (
            "SELECT uuid, title, created_at, seq FROM notes WHERE notebook_uuid = ?1;".to_string(),
            Some(notebook.to_string()),
        ),
        QueryScope::PhotographsOf(note) => (
            "SELECT uuid, created_at, seq FROM photographs WHERE note_uuid = ?1;".to_string(),
            Some(note.to_string()),
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match &param {
        Some(value) => stmt.query([value.as_str()])?,
        None => stmt.query([])?,
    };

    let mut keys = Vec::new();
    while let Some(row) = rows.next()? {
        if let Some(key) = parse_probe_row(row, query)? {
            keys.push(key);
        }
    }

    Ok(keys)
}

/// Loads the current key of one row, or `None` when the row no longer exists
/// or no longer matches the query scope/filter.
pub(crate) fn probe_row(
    conn: &Connection,
    query: &WatchQuery,
    id: Uuid,
) -> RepoResult<Option<RowKey>> {
    let (sql, scope_param) = match &query.scope {
        QueryScope::AllNotebooks => (
            "SELECT uuid, title, created_at, seq FROM notebooks WHERE uuid = ?1;",
            None,
        ),
        QueryScope::NotesIn(notebook) => (
            "SELECT uuid, title, created_at, seq FROM notes
             WHERE uuid = ?1 AND notebook_uuid = ?2;",
            Some(notebook.to_string()),
        ),
        QueryScope::PhotographsOf(note) => (
            "SELECT uuid, created_at, seq FROM photographs
             WHERE uuid = ?1 AND note_uuid = ?2;",
            Some(note.to_string()),
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let id_text = id.to_string();
    let mut rows = match &scope_param {
        Some(scope) => stmt.query([id_text.as_str(), scope.as_str()])?,
        None => stmt.query([id_text.as_str()])?,
    };

    match rows.next()? {
        Some(row) => parse_probe_row(row, query),
        None => Ok(None),
    }
}

/// Parses one probed row into its ordering key, applying the query filter.
///
/// Returns `None` for rows the filter excludes.
fn parse_probe_row(row: &Row<'_>, query: &WatchQuery) -> RepoResult<Option<RowKey>> {
    let table = match &query.scope {
        QueryScope::AllNotebooks => "notebooks.uuid",
        QueryScope::NotesIn(_) => "notes.uuid",
        QueryScope::PhotographsOf(_) => "photographs.uuid",
    };
    let id = parse_uuid_column(row, "uuid", table)?;

    let title: Option<String> = match &query.scope {
        QueryScope::PhotographsOf(_) => None,
        _ => Some(row.get("title")?),
    };

    if let Some(needle) = &query.filter {
        let matched = title
            .as_deref()
            .map(|value| matches_filter(value, needle))
            .unwrap_or(false);
        if !matched {
            return Ok(None);
        }
    }

    let sort = match query.sort {
        // Photographs carry no title; an empty text key degrades the order
        // to pure insertion sequence.
        SortKey::TitleAsc => SortValue::Text(title.unwrap_or_default()),
        SortKey::CreatedAtAsc | SortKey::CreatedAtDesc => SortValue::Int(row.get("created_at")?),
    };

    Ok(Some(RowKey {
        id,
        sort,
        seq: row.get("seq")?,
    }))
}

/// Case- and diacritic-insensitive substring match used by title filters.
pub(crate) fn matches_filter(haystack: &str, needle: &str) -> bool {
    fold_for_match(haystack).contains(&fold_for_match(needle))
}

/// Folds text for filter comparison: Unicode lowercase, then diacritic
/// stripping over Latin-1 Supplement and Latin Extended-A.
///
/// Other scripts keep their lowercased form and match case-insensitively
/// only.
pub(crate) fn fold_for_match(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .map(strip_diacritic)
        .collect()
}

fn strip_diacritic(c: char) -> char {
    match c {
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' | 'ħ' => 'h',
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' | 'ŧ' => 't',
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}
