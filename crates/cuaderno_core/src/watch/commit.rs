//! Committed-transaction change tracking.
//!
//! # Responsibility
//! - Record row-level changes while a write transaction executes.
//! - Carry committed change sets to the merge step that drives observers.
//!
//! # Invariants
//! - A change set holds at most one entry per (kind, id) pair.
//! - A row created and deleted in the same transaction nets out to nothing.
//! - `commit_seq` values are claimed inside the write transaction, so they
//!   follow commit order exactly.

use crate::model::EntityKind;
use uuid::Uuid;

/// How one row changed inside a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeOp {
    Created,
    Updated,
    Deleted,
}

/// One row-level change recorded while a transaction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntityChange {
    pub kind: EntityKind,
    pub id: Uuid,
    pub op: ChangeOp,
}

/// All row-level changes of one transaction, deduplicated per row.
///
/// Recording order is preserved; observers process entries in this order, so
/// delta positions stay deterministic.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChangeSet {
    changes: Vec<EntityChange>,
}

impl ChangeSet {
    pub fn record(&mut self, kind: EntityKind, id: Uuid, op: ChangeOp) {
        let existing = self
            .changes
            .iter()
            .position(|change| change.kind == kind && change.id == id);

        match existing {
            Some(index) => match merge_ops(self.changes[index].op, op) {
                Some(merged) => self.changes[index].op = merged,
                None => {
                    self.changes.remove(index);
                }
            },
            None => self.changes.push(EntityChange { kind, id, op }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[EntityChange] {
        &self.changes
    }
}

/// A committed write transaction, addressed by its commit sequence.
#[derive(Debug, Clone)]
pub(crate) struct CommitEvent {
    pub commit_seq: i64,
    pub changes: ChangeSet,
}

/// Collapses two ops on the same row. `None` means the row was created and
/// deleted inside one transaction and is never observable.
fn merge_ops(existing: ChangeOp, incoming: ChangeOp) -> Option<ChangeOp> {
    match (existing, incoming) {
        (ChangeOp::Created, ChangeOp::Deleted) => None,
        (ChangeOp::Created, _) => Some(ChangeOp::Created),
        (ChangeOp::Deleted, ChangeOp::Created) => Some(ChangeOp::Updated),
        (_, ChangeOp::Deleted) => Some(ChangeOp::Deleted),
        (_, _) => Some(ChangeOp::Updated),
    }
}
