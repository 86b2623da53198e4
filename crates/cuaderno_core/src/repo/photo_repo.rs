//! Photograph repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide photograph persistence APIs for note attachments and notebook
//!   covers.
//! - Keep blob handling inside the persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Photograph::validate()` before SQL mutations.
//! - `create_photograph` verifies the owner inside the caller's transaction
//!   and fails with `ParentNotFound` otherwise.
//! - `list_photographs_of_note` orders by created_at descending, insertion
//!   order on ties.

use crate::model::note::NoteId;
use crate::model::notebook::NotebookId;
use crate::model::photograph::{Photograph, PhotographId, PhotographOwner};
use crate::model::ModelValidationError;
use crate::repo::note_repo::require_note;
use crate::repo::notebook_repo::{parse_uuid_column, require_notebook};
use crate::repo::{next_row_seq, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const PHOTOGRAPH_SELECT_SQL: &str = "SELECT
    uuid,
    image_data,
    created_at,
    note_uuid,
    notebook_uuid
FROM photographs";

/// Repository interface for photograph CRUD operations.
pub trait PhotographRepository {
    fn create_photograph(&self, photo: &Photograph) -> RepoResult<PhotographId>;
    fn get_photograph(&self, id: PhotographId) -> RepoResult<Option<Photograph>>;
    fn list_photographs_of_note(&self, note: NoteId) -> RepoResult<Vec<Photograph>>;
    /// Returns the current cover of a notebook, preferring the newest row
    /// when more than one survived a partial replace.
    fn cover_of_notebook(&self, notebook: NotebookId) -> RepoResult<Option<Photograph>>;
    /// Deletes every cover photograph of a notebook and returns their ids.
    ///
    /// Normally at most one row exists; the plural return keeps delete
    /// reporting exact either way.
    fn delete_cover_of_notebook(&self, notebook: NotebookId) -> RepoResult<Vec<PhotographId>>;
    fn list_photograph_ids_of_note(&self, note: NoteId) -> RepoResult<Vec<PhotographId>>;
    fn list_photograph_ids(&self) -> RepoResult<Vec<PhotographId>>;
    fn delete_all_photographs(&self) -> RepoResult<usize>;
}

/// SQLite-backed photograph repository.
pub struct SqlitePhotographRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePhotographRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PhotographRepository for SqlitePhotographRepository<'_> {
    fn create_photograph(&self, photo: &Photograph) -> RepoResult<PhotographId> {
        photo.validate()?;
        match photo.owner() {
            Some(PhotographOwner::NotebookCover(id)) => require_notebook(self.conn, id)?,
            Some(PhotographOwner::Note(id)) => require_note(self.conn, id)?,
            None => return Err(ModelValidationError::PhotographWithoutOwner.into()),
        }

        let seq = next_row_seq(self.conn)?;
        self.conn.execute(
            "INSERT INTO photographs (uuid, image_data, created_at, note_uuid, notebook_uuid, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                photo.uuid.to_string(),
                photo.image_data.as_slice(),
                photo.created_at,
                photo.note.map(|id| id.to_string()),
                photo.notebook.map(|id| id.to_string()),
                seq,
            ],
        )?;

        Ok(photo.uuid)
    }

    fn get_photograph(&self, id: PhotographId) -> RepoResult<Option<Photograph>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PHOTOGRAPH_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_photograph_row(row)?));
        }

        Ok(None)
    }

    fn list_photographs_of_note(&self, note: NoteId) -> RepoResult<Vec<Photograph>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PHOTOGRAPH_SELECT_SQL}
             WHERE note_uuid = ?1
             ORDER BY created_at DESC, seq ASC;"
        ))?;

        let mut rows = stmt.query([note.to_string()])?;
        let mut photos = Vec::new();
        while let Some(row) = rows.next()? {
            photos.push(parse_photograph_row(row)?);
        }

        Ok(photos)
    }

    fn cover_of_notebook(&self, notebook: NotebookId) -> RepoResult<Option<Photograph>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PHOTOGRAPH_SELECT_SQL}
             WHERE notebook_uuid = ?1
             ORDER BY seq DESC
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query([notebook.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_photograph_row(row)?));
        }

        Ok(None)
    }

    fn delete_cover_of_notebook(&self, notebook: NotebookId) -> RepoResult<Vec<PhotographId>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid FROM photographs WHERE notebook_uuid = ?1 ORDER BY seq ASC;",
        )?;

        let mut rows = stmt.query([notebook.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(parse_uuid_column(row, "uuid", "photographs.uuid")?);
        }

        if !ids.is_empty() {
            self.conn.execute(
                "DELETE FROM photographs WHERE notebook_uuid = ?1;",
                [notebook.to_string()],
            )?;
        }

        Ok(ids)
    }

    fn list_photograph_ids_of_note(&self, note: NoteId) -> RepoResult<Vec<PhotographId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM photographs WHERE note_uuid = ?1 ORDER BY seq ASC;")?;

        let mut rows = stmt.query([note.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(parse_uuid_column(row, "uuid", "photographs.uuid")?);
        }

        Ok(ids)
    }

    fn list_photograph_ids(&self) -> RepoResult<Vec<PhotographId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM photographs ORDER BY seq ASC;")?;

        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(parse_uuid_column(row, "uuid", "photographs.uuid")?);
        }

        Ok(ids)
    }

    fn delete_all_photographs(&self) -> RepoResult<usize> {
        let deleted = self.conn.execute("DELETE FROM photographs;", [])?;
        Ok(deleted)
    }
}

fn parse_photograph_row(row: &Row<'_>) -> RepoResult<Photograph> {
    let note = parse_optional_uuid(row, "note_uuid", "photographs.note_uuid")?;
    let notebook = parse_optional_uuid(row, "notebook_uuid", "photographs.notebook_uuid")?;

    let photo = Photograph {
        uuid: parse_uuid_column(row, "uuid", "photographs.uuid")?,
        image_data: row.get("image_data")?,
        created_at: row.get("created_at")?,
        notebook,
        note,
    };
    photo.validate()?;
    Ok(photo)
}

fn parse_optional_uuid(row: &Row<'_>, column: &str, context: &str) -> RepoResult<Option<Uuid>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => {
            let id = Uuid::parse_str(&text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid value `{text}` in {context}"))
            })?;
            Ok(Some(id))
        }
        None => Ok(None),
    }
}
