//! Live observer bookkeeping and per-commit delta computation.
//!
//! # Responsibility
//! - Maintain each observer's ordered result-set mirror.
//! - Turn one committed change set into one ordered delta batch.
//!
//! # Invariants
//! - The mirror always equals the initial snapshot plus every delivered
//!   delta, applied in order; positions in a batch are relative to the
//!   mirror with the batch's earlier deltas already applied.
//! - Commits at or below the observer's baseline are skipped; the snapshot
//!   already contained them.
//! - A failed probe disposes the observer instead of poisoning the store.

use crate::repo::RepoResult;
use crate::watch::commit::CommitEvent;
use crate::watch::probe::{probe_row, RowKey};
use crate::watch::{DeltaBatch, ObserverState, RowDelta, SortKey, WatchQuery};
use log::warn;
use rusqlite::Connection;
use std::cmp::Ordering;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Store-side record of one live observer.
pub(crate) struct ObserverEntry {
    query: WatchQuery,
    state: Arc<Mutex<ObserverState>>,
    sender: Sender<DeltaBatch>,
    rows: Vec<RowKey>,
    baseline_seq: i64,
}

impl ObserverEntry {
    pub fn new(
        query: WatchQuery,
        state: Arc<Mutex<ObserverState>>,
        sender: Sender<DeltaBatch>,
        rows: Vec<RowKey>,
        baseline_seq: i64,
    ) -> Self {
        Self {
            query,
            state,
            sender,
            rows,
            baseline_seq,
        }
    }

    /// Applies one committed transaction to this observer.
    ///
    /// Returns `false` when the observer is gone (disposed, receiver dropped
    /// or probe failure) and should be removed from the registry.
    pub fn apply_commit(&mut self, conn: &Connection, event: &CommitEvent) -> bool {
        if event.commit_seq <= self.baseline_seq {
            return true;
        }
        if self.shared_state() != ObserverState::Live {
            return false;
        }
        if event.changes.is_empty() {
            return true;
        }

        let mut deltas = Vec::new();
        for change in event.changes.changes() {
            if change.kind != self.query.kind {
                continue;
            }
            if let Err(err) = self.diff_one(conn, change.id, &mut deltas) {
                warn!("event=observer_probe module=watch status=error error={err}");
                self.mark_disposed();
                return false;
            }
        }

        if deltas.is_empty() {
            return true;
        }

        let batch = DeltaBatch {
            commit_seq: event.commit_seq,
            deltas,
        };
        if self.sender.send(batch).is_err() {
            self.mark_disposed();
            return false;
        }
        true
    }

    /// Diffs one changed row against the mirror, by fresh probe.
    ///
    /// The probe decides membership; the recorded operation kind is not
    /// trusted, which makes filter transitions (a row editing its way into
    /// or out of the match set) fall out naturally.
    fn diff_one(
        &mut self,
        conn: &Connection,
        id: Uuid,
        deltas: &mut Vec<RowDelta>,
    ) -> RepoResult<()> {
        let old_pos = self.rows.iter().position(|row| row.id == id);
        let probed = probe_row(conn, &self.query, id)?;

        match (old_pos, probed) {
            (None, Some(key)) => {
                let at = self.insertion_index(&key);
                self.rows.insert(at, key);
                deltas.push(RowDelta::Insert { id, at });
            }
            (Some(from), None) => {
                self.rows.remove(from);
                deltas.push(RowDelta::Delete { id, from });
            }
            (Some(from), Some(key)) => {
                if self.rows[from].sort == key.sort {
                    self.rows[from] = key;
                    deltas.push(RowDelta::Update { id, at: from });
                } else {
                    self.rows.remove(from);
                    let to = self.insertion_index(&key);
                    self.rows.insert(to, key);
                    deltas.push(RowDelta::Move { id, from, to });
                }
            }
            (None, None) => {}
        }

        Ok(())
    }

    fn insertion_index(&self, key: &RowKey) -> usize {
        self.rows
            .partition_point(|row| cmp_rows(self.query.sort, row, key) == Ordering::Less)
    }

    fn shared_state(&self) -> ObserverState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(ObserverState::Disposed)
    }

    fn mark_disposed(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = ObserverState::Disposed;
        }
    }
}

/// Total order of rows under a sort key: declared key first (direction
/// applied), then insertion sequence ascending.
///
/// Equal primary keys keep insertion order in both directions, matching
/// stable-sort semantics.
pub(crate) fn cmp_rows(sort: SortKey, a: &RowKey, b: &RowKey) -> Ordering {
    let primary = if sort.descending() {
        b.sort.cmp(&a.sort)
    } else {
        a.sort.cmp(&b.sort)
    };
    primary.then(a.seq.cmp(&b.seq))
}

/// Sorts a freshly probed snapshot into result-set order.
pub(crate) fn sort_rows(sort: SortKey, rows: &mut [RowKey]) {
    rows.sort_by(|a, b| cmp_rows(sort, a, b));
}
