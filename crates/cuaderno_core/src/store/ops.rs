//! Transactional operation bodies shared by the primary store and
//! background write contexts.
//!
//! # Responsibility
//! - Execute each mutation as one unit inside a caller-owned transaction.
//! - Record every touched row in the transaction's change set.
//!
//! # Invariants
//! - Every write transaction claims its commit sequence before committing;
//!   sequences therefore follow SQLite's single-writer commit order.
//! - Relationship changes dirty the owner row: creating a note touches its
//!   notebook, attaching a photograph touches its owner.

use crate::model::note::{Note, NoteId};
use crate::model::notebook::{Notebook, NotebookId};
use crate::model::photograph::{Photograph, PhotographOwner};
use crate::model::EntityKind;
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::notebook_repo::{NotebookRepository, SqliteNotebookRepository};
use crate::repo::photo_repo::{PhotographRepository, SqlitePhotographRepository};
use crate::repo::{RepoError, RepoResult};
use crate::watch::commit::{ChangeOp, ChangeSet, CommitEvent};
use rusqlite::{Connection, TransactionBehavior};

/// Runs one write transaction: op body, commit sequence claim, commit.
///
/// The body sees an in-transaction connection; on error the transaction
/// rolls back and the recorded changes are discarded with it.
pub(crate) fn run_write_tx<T>(
    conn: &mut Connection,
    f: impl FnOnce(&Connection, &mut ChangeSet) -> RepoResult<T>,
) -> RepoResult<(T, CommitEvent)> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut changes = ChangeSet::default();
    let value = f(&tx, &mut changes)?;
    let commit_seq = claim_commit_seq(&tx)?;
    tx.commit()?;

    let event = CommitEvent { commit_seq, changes };
    Ok((value, event))
}

/// Claims the next store-wide commit sequence number.
///
/// Must run inside the write transaction it numbers.
pub(crate) fn claim_commit_seq(conn: &Connection) -> RepoResult<i64> {
    conn.execute(
        "UPDATE store_meta SET value = value + 1 WHERE key = 'merge_seq';",
        [],
    )?;
    read_merge_seq(conn)
}

/// Reads the latest committed commit sequence.
pub(crate) fn read_merge_seq(conn: &Connection) -> RepoResult<i64> {
    let seq = conn.query_row(
        "SELECT value FROM store_meta WHERE key = 'merge_seq';",
        [],
        |row| row.get(0),
    )?;
    Ok(seq)
}

pub(crate) fn create_notebook_op(
    conn: &Connection,
    title: String,
    created_at: i64,
    changes: &mut ChangeSet,
) -> RepoResult<Notebook> {
    let notebook = Notebook::new(title, created_at);
    SqliteNotebookRepository::new(conn).create_notebook(&notebook)?;
    changes.record(EntityKind::Notebook, notebook.uuid, ChangeOp::Created);
    Ok(notebook)
}

pub(crate) fn create_note_op(
    conn: &Connection,
    notebook: NotebookId,
    title: String,
    contents: String,
    created_at: i64,
    changes: &mut ChangeSet,
) -> RepoResult<Note> {
    let note = Note::new(notebook, title, contents, created_at);
    SqliteNoteRepository::new(conn).create_note(&note)?;
    changes.record(EntityKind::Note, note.uuid, ChangeOp::Created);
    changes.record(EntityKind::Notebook, notebook, ChangeOp::Updated);
    Ok(note)
}

pub(crate) fn attach_photograph_op(
    conn: &Connection,
    owner: PhotographOwner,
    image: &[u8],
    created_at: i64,
    changes: &mut ChangeSet,
) -> RepoResult<Photograph> {
    let repo = SqlitePhotographRepository::new(conn);
    let photo = Photograph::new(owner, image.to_vec(), created_at);

    match owner {
        PhotographOwner::NotebookCover(notebook) => {
            // Replacing a cover deletes the replaced photograph.
            let removed = repo.delete_cover_of_notebook(notebook)?;
            repo.create_photograph(&photo)?;
            for id in removed {
                changes.record(EntityKind::Photograph, id, ChangeOp::Deleted);
            }
            changes.record(EntityKind::Photograph, photo.uuid, ChangeOp::Created);
            changes.record(EntityKind::Notebook, notebook, ChangeOp::Updated);
        }
        PhotographOwner::Note(note) => {
            repo.create_photograph(&photo)?;
            changes.record(EntityKind::Photograph, photo.uuid, ChangeOp::Created);
            changes.record(EntityKind::Note, note, ChangeOp::Updated);
        }
    }

    Ok(photo)
}

pub(crate) fn edit_note_op(
    conn: &Connection,
    id: NoteId,
    title: &str,
    contents: &str,
    edited_at: i64,
    changes: &mut ChangeSet,
) -> RepoResult<Note> {
    let repo = SqliteNoteRepository::new(conn);
    repo.update_note_text(id, title, contents, edited_at)?;
    let note = repo.get_note(id)?.ok_or(RepoError::NotFound {
        kind: EntityKind::Note,
        id,
    })?;
    changes.record(EntityKind::Note, id, ChangeOp::Updated);
    Ok(note)
}

pub(crate) fn delete_note_op(
    conn: &Connection,
    id: NoteId,
    changes: &mut ChangeSet,
) -> RepoResult<()> {
    let note_repo = SqliteNoteRepository::new(conn);
    let note = note_repo.get_note(id)?.ok_or(RepoError::NotFound {
        kind: EntityKind::Note,
        id,
    })?;

    // Cascade order: owned photographs go first so the change set lists
    // every vanished row.
    let photo_ids = SqlitePhotographRepository::new(conn).list_photograph_ids_of_note(id)?;
    note_repo.delete_note(id)?;

    for photo_id in photo_ids {
        changes.record(EntityKind::Photograph, photo_id, ChangeOp::Deleted);
    }
    changes.record(EntityKind::Note, id, ChangeOp::Deleted);
    changes.record(EntityKind::Notebook, note.notebook, ChangeOp::Updated);
    Ok(())
}

pub(crate) fn create_note_with_photograph_op(
    conn: &Connection,
    notebook: NotebookId,
    title: String,
    contents: String,
    image: &[u8],
    created_at: i64,
    changes: &mut ChangeSet,
) -> RepoResult<(Note, Photograph)> {
    let note = create_note_op(conn, notebook, title, contents, created_at, changes)?;
    let photo = attach_photograph_op(
        conn,
        PhotographOwner::Note(note.uuid),
        image,
        created_at,
        changes,
    )?;
    Ok((note, photo))
}

/// Deletes every row of every entity kind; returns per-kind counts.
pub(crate) fn reset_op(
    conn: &Connection,
    changes: &mut ChangeSet,
) -> RepoResult<(usize, usize, usize)> {
    let notebook_repo = SqliteNotebookRepository::new(conn);
    let note_repo = SqliteNoteRepository::new(conn);
    let photo_repo = SqlitePhotographRepository::new(conn);

    for id in photo_repo.list_photograph_ids()? {
        changes.record(EntityKind::Photograph, id, ChangeOp::Deleted);
    }
    for id in note_repo.list_note_ids()? {
        changes.record(EntityKind::Note, id, ChangeOp::Deleted);
    }
    for id in notebook_repo.list_notebook_ids()? {
        changes.record(EntityKind::Notebook, id, ChangeOp::Deleted);
    }

    let photographs = photo_repo.delete_all_photographs()?;
    let notes = note_repo.delete_all_notes()?;
    let notebooks = notebook_repo.delete_all_notebooks()?;

    Ok((notebooks, notes, photographs))
}
