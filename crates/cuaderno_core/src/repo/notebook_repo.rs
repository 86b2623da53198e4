//! Notebook repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over `notebooks` storage.
//! - Resolve the derived cover photograph reference at read time.
//!
//! # Invariants
//! - Write paths must call `Notebook::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - `list_notebooks` orders by title ascending, insertion order on ties.

use crate::model::notebook::{Notebook, NotebookId};
use crate::model::EntityKind;
use crate::repo::{next_row_seq, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const NOTEBOOK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    created_at,
    (SELECT p.uuid
       FROM photographs AS p
      WHERE p.notebook_uuid = notebooks.uuid
      ORDER BY p.seq DESC
      LIMIT 1) AS cover_uuid
FROM notebooks";

/// Repository interface for notebook CRUD operations.
pub trait NotebookRepository {
    fn create_notebook(&self, notebook: &Notebook) -> RepoResult<NotebookId>;
    fn get_notebook(&self, id: NotebookId) -> RepoResult<Option<Notebook>>;
    fn list_notebooks(&self) -> RepoResult<Vec<Notebook>>;
    fn notebook_exists(&self, id: NotebookId) -> RepoResult<bool>;
    fn list_notebook_ids(&self) -> RepoResult<Vec<NotebookId>>;
    fn delete_all_notebooks(&self) -> RepoResult<usize>;
}

/// SQLite-backed notebook repository.
pub struct SqliteNotebookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotebookRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NotebookRepository for SqliteNotebookRepository<'_> {
    fn create_notebook(&self, notebook: &Notebook) -> RepoResult<NotebookId> {
        notebook.validate()?;

        let seq = next_row_seq(self.conn)?;
        self.conn.execute(
            "INSERT INTO notebooks (uuid, title, created_at, seq)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                notebook.uuid.to_string(),
                notebook.title.as_str(),
                notebook.created_at,
                seq,
            ],
        )?;

        Ok(notebook.uuid)
    }

    fn get_notebook(&self, id: NotebookId) -> RepoResult<Option<Notebook>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTEBOOK_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_notebook_row(row)?));
        }

        Ok(None)
    }

    fn list_notebooks(&self) -> RepoResult<Vec<Notebook>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTEBOOK_SELECT_SQL} ORDER BY title ASC, seq ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut notebooks = Vec::new();
        while let Some(row) = rows.next()? {
            notebooks.push(parse_notebook_row(row)?);
        }

        Ok(notebooks)
    }

    fn notebook_exists(&self, id: NotebookId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM notebooks WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_notebook_ids(&self) -> RepoResult<Vec<NotebookId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM notebooks ORDER BY seq ASC;")?;

        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(parse_uuid_column(row, "uuid", "notebooks.uuid")?);
        }

        Ok(ids)
    }

    fn delete_all_notebooks(&self) -> RepoResult<usize> {
        let deleted = self.conn.execute("DELETE FROM notebooks;", [])?;
        Ok(deleted)
    }
}

fn parse_notebook_row(row: &Row<'_>) -> RepoResult<Notebook> {
    let uuid = parse_uuid_column(row, "uuid", "notebooks.uuid")?;

    let cover_photo = match row.get::<_, Option<String>>("cover_uuid")? {
        Some(text) => Some(Uuid::parse_str(&text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid value `{text}` in photographs.uuid"))
        })?),
        None => None,
    };

    let notebook = Notebook {
        uuid,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
        cover_photo,
    };
    notebook.validate()?;
    Ok(notebook)
}

/// Reads a required UUID text column, rejecting unparseable values.
pub(crate) fn parse_uuid_column(row: &Row<'_>, column: &str, context: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {context}")))
}

/// Looks up a notebook id or fails with `ParentNotFound`.
///
/// Shared by child-entity repositories that must verify their owner inside
/// the same transaction as the insert.
pub(crate) fn require_notebook(conn: &Connection, id: NotebookId) -> RepoResult<()> {
    if SqliteNotebookRepository::new(conn).notebook_exists(id)? {
        Ok(())
    } else {
        Err(RepoError::ParentNotFound {
            kind: EntityKind::Notebook,
            id,
        })
    }
}
