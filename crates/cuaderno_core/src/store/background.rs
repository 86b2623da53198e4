//! Off-thread writes against a file-backed store.
//!
//! A [`BackgroundWriter`] spawns jobs that open their own connection to
//! the store's database file. Each job commit claims the next store-wide
//! commit sequence inside its own transaction, then reports the change
//! set back over a channel; the primary [`Store`](super::Store) buffers
//! and applies those commits in sequence order.

use std::panic;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use rusqlite::Connection;

use crate::db::open_db;
use crate::model::note::{Note, NoteId};
use crate::model::notebook::{Notebook, NotebookId};
use crate::model::now_millis;
use crate::model::photograph::{Photograph, PhotographOwner};
use crate::repo::RepoResult;
use crate::watch::commit::{ChangeSet, CommitEvent};

use super::ops;
use super::{StoreError, StoreResult};

/// Factory for background write jobs. Cheap to clone into closures.
#[derive(Clone)]
pub struct BackgroundWriter {
    path: PathBuf,
    commit_tx: Sender<CommitEvent>,
}

impl BackgroundWriter {
    pub(crate) fn new(path: PathBuf, commit_tx: Sender<CommitEvent>) -> Self {
        Self { path, commit_tx }
    }

    /// Runs `job` on its own thread with a fresh connection.
    ///
    /// The job's commits reach the primary store's observers after the
    /// next merge there. Errors from the job come back through
    /// [`BackgroundJob::wait`].
    pub fn spawn<T, F>(&self, job: F) -> BackgroundJob<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut WriteContext) -> StoreResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        let commit_tx = self.commit_tx.clone();
        let handle = thread::spawn(move || {
            let conn = open_db(&path).map_err(StoreError::StorageUnavailable)?;
            let mut context = WriteContext { conn, commit_tx };
            job(&mut context)
        });
        BackgroundJob { handle }
    }
}

/// Handle to one spawned write job.
pub struct BackgroundJob<T> {
    handle: JoinHandle<StoreResult<T>>,
}

impl<T> BackgroundJob<T> {
    /// Blocks until the job finishes and returns its result.
    ///
    /// A panic inside the job resumes on the calling thread.
    pub fn wait(self) -> StoreResult<T> {
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Mutation surface available inside a background job.
///
/// Mirrors the store's write operations; reads stay on the primary store.
pub struct WriteContext {
    conn: Connection,
    commit_tx: Sender<CommitEvent>,
}

impl WriteContext {
    /// See [`Store::create_notebook`](super::Store::create_notebook).
    pub fn create_notebook(
        &mut self,
        title: impl Into<String>,
        created_at: i64,
    ) -> StoreResult<Notebook> {
        let title = title.into();
        self.with_commit(|conn, changes| ops::create_notebook_op(conn, title, created_at, changes))
    }

    /// See [`Store::create_note`](super::Store::create_note).
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

    /// See [`Store::create_note_with_photograph`](super::Store::create_note_with_photograph).
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

    /// See [`Store::attach_photograph`](super::Store::attach_photograph).
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

    /// See [`Store::edit_note`](super::Store::edit_note).
    pub fn edit_note(&mut self, id: NoteId, title: &str, contents: &str) -> StoreResult<Note> {
        let edited_at = now_millis();
        self.with_commit(|conn, changes| {
            ops::edit_note_op(conn, id, title, contents, edited_at, changes)
        })
    }

    /// See [`Store::delete_note`](super::Store::delete_note).
    pub fn delete_note(&mut self, id: NoteId) -> StoreResult<()> {
        self.with_commit(|conn, changes| ops::delete_note_op(conn, id, changes))
    }

    fn with_commit<T>(
        &mut self,
        f: impl FnOnce(&Connection, &mut ChangeSet) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let (value, event) = ops::run_write_tx(&mut self.conn, f)?;
        // A dropped store just means nobody is listening any more; the
        // commit itself is already durable.
        let _ = self.commit_tx.send(event);
        Ok(value)
    }
}
