//! Core domain logic for Cuaderno.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;
pub mod watch;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{Note, NoteId};
pub use model::notebook::{Notebook, NotebookId};
pub use model::photograph::{Photograph, PhotographId, PhotographOwner};
pub use model::{now_millis, EntityKind, ModelValidationError};
pub use repo::{RepoError, RepoResult};
pub use store::{BackgroundJob, BackgroundWriter, Store, StoreError, StoreResult, WriteContext};
pub use watch::{
    DeltaBatch, ObserverHandle, ObserverState, RowDelta, SortKey, WatchError, WatchQuery,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
