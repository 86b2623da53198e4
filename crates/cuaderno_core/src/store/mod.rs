//! Notebook store: the primary owner of one SQLite-backed data set.
//!
//! # Responsibility
//! - Open file-backed or in-memory stores and expose typed CRUD over
//!   notebooks, notes and photographs.
//! - Run every mutation as one write transaction that also claims the
//!   store-wide commit sequence.
//! - Fan each committed change set out to registered observers, strictly
//!   in commit-sequence order.
//! - Hand out [`BackgroundWriter`]s whose commits feed the same merge
//!   pipeline as the store's own writes.
//!
//! # Invariants
//! - Commit sequences are dense: the store applies commit `n + 1` only
//!   after `n`, buffering out-of-order arrivals from background writers.
//! - Observers see each commit at most once; changes already contained in
//!   an observer's initial snapshot are never replayed as deltas.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{error, info};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::note::{Note, NoteId};
use crate::model::notebook::{Notebook, NotebookId};
use crate::model::photograph::{Photograph, PhotographId, PhotographOwner};
use crate::model::{now_millis, EntityKind};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::notebook_repo::{NotebookRepository, SqliteNotebookRepository};
use crate::repo::photo_repo::{PhotographRepository, SqlitePhotographRepository};
use crate::repo::{RepoError, RepoResult};
use crate::watch::commit::{ChangeSet, CommitEvent};
use crate::watch::observer::{self, ObserverEntry};
use crate::watch::probe::{self, RowKey};
use crate::watch::{ObserverHandle, ObserverState, WatchError, WatchQuery};

mod background;
mod ops;
mod seed;

pub use background::{BackgroundJob, BackgroundWriter, WriteContext};

/// Errors surfaced by [`Store`] operations.
#[derive(Debug)]
pub enum StoreError {
    /// The backing database could not be opened or prepared.
    StorageUnavailable(DbError),
    /// The addressed entity does not exist.
    NotFound { kind: EntityKind, id: Uuid },
    /// The entity named as owner of a new row does not exist.
    ParentNotFound { kind: EntityKind, id: Uuid },
    /// Reading or writing the backing database failed.
    Persistence(DbError),
    /// A row or argument failed validation.
    InvalidData(String),
    /// The operation needs a file-backed store but this one is in-memory.
    NoBackingFile,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::ParentNotFound { kind, id } => {
                write!(f, "parent {kind} not found: {id}")
            }
            Self::Persistence(err) => write!(f, "persistence failure: {err}"),
            Self::InvalidData(message) => write!(f, "invalid data: {message}"),
            Self::NoBackingFile => {
                write!(f, "store has no backing file")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) | Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidData(err.to_string()),
            RepoError::Db(err) => Self::Persistence(err),
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepoError::ParentNotFound { kind, id } => Self::ParentNotFound { kind, id },
            RepoError::InvalidData(message) => Self::InvalidData(message),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(DbError::Sqlite(value))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One open notebook store.
///
/// The store is `Send` but not `Sync`: it lives on one thread, typically
/// the UI or main thread. Concurrent writes go through
/// [`Store::background_writer`]; their commits surface here once
/// [`Store::merge_pending_commits`] (or any store write) runs.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
    registry: Vec<ObserverEntry>,
    commit_tx: Sender<CommitEvent>,
    commit_rx: Receiver<CommitEvent>,
    pending: BTreeMap<i64, ChangeSet>,
    merged_seq: i64,
}

impl Store {
    /// Opens or creates a file-backed store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_db(&path).map_err(StoreError::StorageUnavailable)?;
        Self::from_connection(conn, Some(path))
    }

    /// Opens a private in-memory store, mainly for tests and previews.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(StoreError::StorageUnavailable)?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        let merged_seq = match ops::read_merge_seq(&conn) {
            Ok(seq) => seq,
            Err(RepoError::Db(err)) => return Err(StoreError::StorageUnavailable(err)),
            Err(err) => return Err(err.into()),
        };
        let (commit_tx, commit_rx) = mpsc::channel();

        Ok(Self {
            conn,
            path,
            registry: Vec::new(),
            commit_tx,
            commit_rx,
            pending: BTreeMap::new(),
            merged_seq,
        })
    }

    /// Creates a notebook with the given title.
    pub fn create_notebook(
        &mut self,
        title: impl Into<String>,
        created_at: i64,
    ) -> StoreResult<Notebook> {
        let title = title.into();
        self.with_commit(|conn, changes| ops::create_notebook_op(conn, title, created_at, changes))
    }

    /// Creates a note inside `notebook`.
    ///
    /// Fails with [`StoreError::ParentNotFound`] when the notebook does not
    /// exist; nothing is written in that case.
    pub fn create_note(
        &mut self,
        notebook: NotebookId,
        title: impl Into<String>,
        contents: impl Into<String>,
        created_at: i64,
    ) -> StoreResult<Note> {
        let title = title.into();
        let contents = contents.into();
        self.with_commit(|conn, changes| {
            ops::create_note_op(conn, notebook, title, contents, created_at, changes)
        })
    }

    /// Creates a note and attaches a photograph to it in one commit.
    pub fn create_note_with_photograph(
        &mut self,
        notebook: NotebookId,
        title: impl Into<String>,
        contents: impl Into<String>,
        image: &[u8],
        created_at: i64,
    ) -> StoreResult<(Note, Photograph)> {
        let title = title.into();
        let contents = contents.into();
        self.with_commit(|conn, changes| {
            ops::create_note_with_photograph_op(
                conn, notebook, title, contents, image, created_at, changes,
            )
        })
    }

    /// Stores a photograph for `owner`.
    ///
    /// Attaching a notebook cover replaces any previous cover; the replaced
    /// photograph is deleted in the same commit.
    pub fn attach_photograph(
        &mut self,
        owner: PhotographOwner,
        image: &[u8],
        created_at: i64,
    ) -> StoreResult<Photograph> {
        self.with_commit(|conn, changes| {
            ops::attach_photograph_op(conn, owner, image, created_at, changes)
        })
    }

    /// Rewrites a note's title and contents, bumping its `updated_at`.
    ///
    /// `created_at` is never touched by edits.
    pub fn edit_note(&mut self, id: NoteId, title: &str, contents: &str) -> StoreResult<Note> {
        let edited_at = now_millis();
        self.with_commit(|conn, changes| {
            ops::edit_note_op(conn, id, title, contents, edited_at, changes)
        })
    }

    /// Deletes a note together with its photographs.
    pub fn delete_note(&mut self, id: NoteId) -> StoreResult<()> {
        self.with_commit(|conn, changes| ops::delete_note_op(conn, id, changes))
    }

    /// Seeds sample notebooks and notes into an empty store.
    ///
    /// Returns `true` when seeding ran, `false` when the store already had
    /// notebooks and was left untouched.
    pub fn preload_sample_data(&mut self, cover_image: Option<&[u8]>) -> StoreResult<bool> {
        self.with_commit(|conn, changes| seed::preload_sample_data_op(conn, cover_image, changes))
    }

    /// Forces pending WAL contents into the main database file.
    ///
    /// In-memory stores have nothing to persist; the call is a no-op there.
    pub fn save(&mut self) -> StoreResult<()> {
        if self.path.is_none() {
            return Ok(());
        }
        let started = Instant::now();
        match self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);") {
            Ok(()) => {
                info!(
                    "event=store_save module=store status=ok duration_ms={}",
                    started.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!("event=store_save module=store status=error error={err}");
                Err(StoreError::Persistence(DbError::Sqlite(err)))
            }
        }
    }

    /// Deletes every notebook, note and photograph, then vacuums the file.
    ///
    /// The store stays open and usable; observers receive deletion deltas
    /// for every row they were mirroring.
    pub fn reset_and_destroy(&mut self) -> StoreResult<()> {
        let (notebooks, notes, photographs) =
            self.with_commit(|conn, changes| ops::reset_op(conn, changes))?;
        self.conn.execute_batch("VACUUM;")?;
        info!(
            "event=store_reset module=store status=ok notebooks={notebooks} notes={notes} \
             photographs={photographs}"
        );
        Ok(())
    }

    /// Fetches one notebook by id.
    pub fn get_notebook(&self, id: NotebookId) -> StoreResult<Option<Notebook>> {
        Ok(SqliteNotebookRepository::new(&self.conn).get_notebook(id)?)
    }

    /// Lists all notebooks, ordered by title.
    pub fn list_notebooks(&self) -> StoreResult<Vec<Notebook>> {
        Ok(SqliteNotebookRepository::new(&self.conn).list_notebooks()?)
    }

    /// Fetches one note by id.
    pub fn get_note(&self, id: NoteId) -> StoreResult<Option<Note>> {
        Ok(SqliteNoteRepository::new(&self.conn).get_note(id)?)
    }

    /// Lists the notes of `notebook`, oldest first.
    pub fn list_notes(&self, notebook: NotebookId) -> StoreResult<Vec<Note>> {
        Ok(SqliteNoteRepository::new(&self.conn).list_notes(notebook)?)
    }

    /// Fetches one photograph by id, including its image bytes.
    pub fn get_photograph(&self, id: PhotographId) -> StoreResult<Option<Photograph>> {
        Ok(SqlitePhotographRepository::new(&self.conn).get_photograph(id)?)
    }

    /// Lists the photographs attached to `note`, newest first.
    pub fn list_photographs_of(&self, note: NoteId) -> StoreResult<Vec<Photograph>> {
        Ok(SqlitePhotographRepository::new(&self.conn).list_photographs_of_note(note)?)
    }

    /// Fetches the current cover photograph of `notebook`, if any.
    pub fn notebook_cover(&self, notebook: NotebookId) -> StoreResult<Option<Photograph>> {
        Ok(SqlitePhotographRepository::new(&self.conn).cover_of_notebook(notebook)?)
    }

    /// Registers a live query and returns its observer handle.
    ///
    /// The handle starts with the ids currently matching `query`; every
    /// later commit that changes the result set arrives as a delta batch.
    pub fn watch(&mut self, query: WatchQuery) -> Result<ObserverHandle, WatchError> {
        self.merge_pending_commits();

        let state = Arc::new(Mutex::new(ObserverState::Uninitialized));
        set_state(&state, ObserverState::Fetching);

        let (baseline_seq, mut rows) = match self.fetch_initial(&query) {
            Ok(parts) => parts,
            Err(err) => {
                set_state(&state, ObserverState::Disposed);
                return Err(WatchError::InitialFetch(err));
            }
        };
        observer::sort_rows(query.sort, &mut rows);
        let initial_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();

        let (sender, receiver) = mpsc::channel();
        set_state(&state, ObserverState::Live);
        self.registry.push(ObserverEntry::new(
            query,
            Arc::clone(&state),
            sender,
            rows,
            baseline_seq,
        ));

        Ok(ObserverHandle::new(state, initial_ids, receiver))
    }

    fn fetch_initial(&mut self, query: &WatchQuery) -> RepoResult<(i64, Vec<RowKey>)> {
        // One read transaction keeps the pair consistent: the baseline is
        // the last commit whose effects the snapshot already contains.
        let tx = self.conn.transaction()?;
        let baseline_seq = ops::read_merge_seq(&tx)?;
        let rows = probe::snapshot_rows(&tx, query)?;
        tx.commit()?;
        Ok((baseline_seq, rows))
    }

    /// Drains commits from background writers and applies every commit
    /// whose turn has come. Returns how many commits were applied.
    ///
    /// Commits are applied strictly in sequence; a commit arriving early
    /// waits here until its predecessor lands.
    pub fn merge_pending_commits(&mut self) -> usize {
        while let Ok(event) = self.commit_rx.try_recv() {
            self.pending.insert(event.commit_seq, event.changes);
        }

        let mut applied = 0;
        loop {
            let next_seq = self.merged_seq + 1;
            let Some(changes) = self.pending.remove(&next_seq) else {
                break;
            };
            self.apply_merge(CommitEvent {
                commit_seq: next_seq,
                changes,
            });
            applied += 1;
        }
        applied
    }

    /// Hands out a writer for off-thread commits against the same file.
    ///
    /// In-memory stores are private to their connection, so they cannot
    /// feed a background writer.
    pub fn background_writer(&self) -> StoreResult<BackgroundWriter> {
        match &self.path {
            Some(path) => Ok(BackgroundWriter::new(path.clone(), self.commit_tx.clone())),
            None => Err(StoreError::NoBackingFile),
        }
    }

    /// Number of registered observers, disposed ones included until the
    /// next commit prunes them.
    pub fn observer_count(&self) -> usize {
        self.registry.len()
    }

    fn with_commit<T>(
        &mut self,
        f: impl FnOnce(&Connection, &mut ChangeSet) -> RepoResult<T>,
    ) -> StoreResult<T> {
        // Earlier background commits merge first so this write's deltas
        // arrive in commit order.
        self.merge_pending_commits();
        let (value, event) = ops::run_write_tx(&mut self.conn, f)?;
        self.pending.insert(event.commit_seq, event.changes);
        self.merge_pending_commits();
        Ok(value)
    }

    fn apply_merge(&mut self, event: CommitEvent) {
        let conn = &self.conn;
        self.registry
            .retain_mut(|entry| entry.apply_commit(conn, &event));
        self.merged_seq = event.commit_seq;
    }
}

fn set_state(state: &Arc<Mutex<ObserverState>>, value: ObserverState) {
    if let Ok(mut guard) = state.lock() {
        *guard = value;
    }
}
