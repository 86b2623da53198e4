//! Live queries over the store: ordered result sets plus per-commit deltas.
//!
//! # Responsibility
//! - Define the watch query surface and its delta vocabulary.
//! - Hand callers an `ObserverHandle`: initial ordered snapshot plus a
//!   receiver of ordered delta batches.
//!
//! # Invariants
//! - One delta batch per committed transaction that touches matching rows;
//!   batches arrive in commit order; empty batches are never delivered.
//! - Positions are sequential within a batch: each delta's indices refer to
//!   the result set with the batch's earlier deltas already applied.
//! - Ordering is stable: declared sort key, insertion order on ties.
//! - Observer lifecycle: `Uninitialized -> Fetching -> Live -> Disposed`.

use crate::model::note::NoteId;
use crate::model::notebook::NotebookId;
use crate::model::EntityKind;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub(crate) mod commit;
pub(crate) mod observer;
pub(crate) mod probe;

/// Sort order of an observed result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Title ascending; the notebook list default.
    TitleAsc,
    /// Creation time ascending; the note list default.
    CreatedAtAsc,
    /// Creation time descending; the photograph list default.
    CreatedAtDesc,
}

impl SortKey {
    pub(crate) fn descending(self) -> bool {
        matches!(self, Self::CreatedAtDesc)
    }
}

/// Which rows a watch query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QueryScope {
    AllNotebooks,
    NotesIn(NotebookId),
    PhotographsOf(NoteId),
}

/// A live query: entity kind, scope, optional title filter and sort order.
///
/// Constructors mirror the result sets the store is consumed through; a new
/// filter string means a new `watch` call, there is no incremental
/// re-filtering of an existing observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchQuery {
    pub(crate) kind: EntityKind,
    pub(crate) scope: QueryScope,
    pub(crate) filter: Option<String>,
    pub(crate) sort: SortKey,
}

impl WatchQuery {
    /// All notebooks, title ascending.
    pub fn notebooks() -> Self {
        Self {
            kind: EntityKind::Notebook,
            scope: QueryScope::AllNotebooks,
            filter: None,
            sort: SortKey::TitleAsc,
        }
    }

    /// Notes of one notebook, creation time ascending.
    pub fn notes_in(notebook: NotebookId) -> Self {
        Self {
            kind: EntityKind::Note,
            scope: QueryScope::NotesIn(notebook),
            filter: None,
            sort: SortKey::CreatedAtAsc,
        }
    }

    /// Notes of one notebook whose title contains `needle`, case- and
    /// diacritic-insensitively; creation time ascending.
    pub fn notes_matching(notebook: NotebookId, needle: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Note,
            scope: QueryScope::NotesIn(notebook),
            filter: Some(needle.into()),
            sort: SortKey::CreatedAtAsc,
        }
    }

    /// Photographs of one note, creation time descending.
    pub fn photographs_of(note: NoteId) -> Self {
        Self {
            kind: EntityKind::Photograph,
            scope: QueryScope::PhotographsOf(note),
            filter: None,
            sort: SortKey::CreatedAtDesc,
        }
    }

    /// Overrides the default sort order.
    ///
    /// `TitleAsc` over photographs degrades to insertion order, since
    /// photographs carry no title.
    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    /// The entity kind this query observes.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

/// One position-level change inside a delta batch.
///
/// Indices are sequential: they refer to the result set with the batch's
/// earlier deltas already applied. A `Move` removes the row at `from` first,
/// then reinserts it so it lands at `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDelta {
    Insert { id: Uuid, at: usize },
    Delete { id: Uuid, from: usize },
    Update { id: Uuid, at: usize },
    Move { id: Uuid, from: usize, to: usize },
}

/// All deltas produced by one committed transaction for one observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaBatch {
    /// Store-wide commit sequence of the producing transaction.
    pub commit_seq: i64,
    pub deltas: Vec<RowDelta>,
}

/// Observer lifecycle.
///
/// `Uninitialized` and `Fetching` are only observable while `watch` itself
/// runs; a returned handle is `Live` until disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Uninitialized,
    Fetching,
    Live,
    Disposed,
}

/// Error from establishing a live query.
///
/// Fatal to that observer only; the store stays usable.
#[derive(Debug)]
pub enum WatchError {
    /// The initial snapshot query failed; no observer was registered.
    InitialFetch(RepoError),
}

impl Display for WatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InitialFetch(err) => write!(f, "initial fetch failed: {err}"),
        }
    }
}

impl Error for WatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InitialFetch(err) => Some(err),
        }
    }
}

impl From<RepoError> for WatchError {
    fn from(value: RepoError) -> Self {
        Self::InitialFetch(value)
    }
}

/// Caller side of a live query.
///
/// Dropping the handle (or calling [`dispose`](Self::dispose)) ends the
/// subscription; undelivered batches are discarded and no further deltas are
/// observable.
pub struct ObserverHandle {
    state: Arc<Mutex<ObserverState>>,
    initial_ids: Vec<Uuid>,
    receiver: Receiver<DeltaBatch>,
}

impl ObserverHandle {
    pub(crate) fn new(
        state: Arc<Mutex<ObserverState>>,
        initial_ids: Vec<Uuid>,
        receiver: Receiver<DeltaBatch>,
    ) -> Self {
        Self {
            state,
            initial_ids,
            receiver,
        }
    }

    /// Ordered row ids of the result set at watch time.
    pub fn initial_ids(&self) -> &[Uuid] {
        &self.initial_ids
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ObserverState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(ObserverState::Disposed)
    }

    /// Takes the next undelivered batch, if one is ready.
    ///
    /// Returns `None` once disposed, even when batches were still queued.
    pub fn try_next_batch(&self) -> Option<DeltaBatch> {
        if self.state() != ObserverState::Live {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Drains every currently queued batch, in delivery order.
    pub fn drain_batches(&self) -> Vec<DeltaBatch> {
        let mut batches = Vec::new();
        while let Some(batch) = self.try_next_batch() {
            batches.push(batch);
        }
        batches
    }

    /// Ends the subscription; idempotent.
    pub fn dispose(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = ObserverState::Disposed;
        }
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}
