//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide note persistence APIs scoped to an owning notebook.
//! - Keep edit semantics narrow: only title/contents/updated_at mutate.
//!
//! # Invariants
//! - Write paths must call `Note::validate()` before SQL mutations.
//! - `create_note` verifies the owning notebook inside the caller's
//!   transaction and fails with `ParentNotFound` otherwise.
//! - `list_notes` orders by created_at ascending, insertion order on ties.

use crate::model::note::{Note, NoteId};
use crate::model::notebook::NotebookId;
use crate::model::EntityKind;
use crate::repo::notebook_repo::{parse_uuid_column, require_notebook};
use crate::repo::{next_row_seq, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    uuid,
    notebook_uuid,
    title,
    contents,
    created_at,
    updated_at
FROM notes";

/// Repository interface for note CRUD operations.
pub trait NoteRepository {
    fn create_note(&self, note: &Note) -> RepoResult<NoteId>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    fn list_notes(&self, notebook: NotebookId) -> RepoResult<Vec<Note>>;
    /// Updates title/contents and bumps `updated_at`; `created_at` is
    /// deliberately untouched.
    fn update_note_text(
        &self,
        id: NoteId,
        title: &str,
        contents: &str,
        updated_at: i64,
    ) -> RepoResult<()>;
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
    fn note_exists(&self, id: NoteId) -> RepoResult<bool>;
    fn list_note_ids(&self) -> RepoResult<Vec<NoteId>>;
    fn delete_all_notes(&self) -> RepoResult<usize>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&self, note: &Note) -> RepoResult<NoteId> {
        note.validate()?;
        require_notebook(self.conn, note.notebook)?;

        let seq = next_row_seq(self.conn)?;
        self.conn.execute(
            "INSERT INTO notes (uuid, notebook_uuid, title, contents, created_at, updated_at, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                note.uuid.to_string(),
                note.notebook.to_string(),
                note.title.as_str(),
                note.contents.as_str(),
                note.created_at,
                note.updated_at,
                seq,
            ],
        )?;

        Ok(note.uuid)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }

        Ok(None)
    }

    fn list_notes(&self, notebook: NotebookId) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE notebook_uuid = ?1
             ORDER BY created_at ASC, seq ASC;"
        ))?;

        let mut rows = stmt.query([notebook.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }

        Ok(notes)
    }

    fn update_note_text(
        &self,
        id: NoteId,
        title: &str,
        contents: &str,
        updated_at: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET title = ?1, contents = ?2, updated_at = ?3
             WHERE uuid = ?4;",
            params![title, contents, updated_at, id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Note,
                id,
            });
        }

        Ok(())
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Note,
                id,
            });
        }

        Ok(())
    }

    fn note_exists(&self, id: NoteId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM notes WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_note_ids(&self) -> RepoResult<Vec<NoteId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM notes ORDER BY seq ASC;")?;

        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(parse_uuid_column(row, "uuid", "notes.uuid")?);
        }

        Ok(ids)
    }

    fn delete_all_notes(&self) -> RepoResult<usize> {
        let deleted = self.conn.execute("DELETE FROM notes;", [])?;
        Ok(deleted)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let note = Note {
        uuid: parse_uuid_column(row, "uuid", "notes.uuid")?,
        notebook: parse_uuid_column(row, "notebook_uuid", "notes.notebook_uuid")?,
        title: row.get("title")?,
        contents: row.get("contents")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    note.validate()?;
    Ok(note)
}

/// Looks up a note id or fails with `ParentNotFound`.
pub(crate) fn require_note(conn: &Connection, id: NoteId) -> RepoResult<()> {
    if SqliteNoteRepository::new(conn).note_exists(id)? {
        Ok(())
    } else {
        Err(RepoError::ParentNotFound {
            kind: EntityKind::Note,
            id,
        })
    }
}
