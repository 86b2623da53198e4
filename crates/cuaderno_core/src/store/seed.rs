//! First-run sample content.
//!
//! Seeds three notebooks ("notebook 1" through "notebook 3"), an optional
//! shared cover image, and four short notes. Runs only against an empty
//! store so user data is never mixed with samples.

use crate::model::now_millis;
use crate::model::photograph::PhotographOwner;
use crate::repo::notebook_repo::{NotebookRepository, SqliteNotebookRepository};
use crate::repo::RepoResult;
use crate::watch::commit::ChangeSet;
use rusqlite::Connection;

use super::ops::{attach_photograph_op, create_note_op, create_notebook_op};

/// Returns `false` without writing anything when notebooks already exist.
pub(crate) fn preload_sample_data_op(
    conn: &Connection,
    cover_image: Option<&[u8]>,
    changes: &mut ChangeSet,
) -> RepoResult<bool> {
    let existing = SqliteNotebookRepository::new(conn).list_notebook_ids()?;
    if !existing.is_empty() {
        return Ok(false);
    }

    let created_at = now_millis();
    let mut notebooks = Vec::with_capacity(3);
    for index in 1..=3 {
        let notebook = create_notebook_op(conn, format!("notebook {index}"), created_at, changes)?;
        notebooks.push(notebook);
    }

    if let Some(image) = cover_image {
        // The same picture covers every sample notebook.
        for notebook in &notebooks {
            attach_photograph_op(
                conn,
                PhotographOwner::NotebookCover(notebook.uuid),
                image,
                created_at,
                changes,
            )?;
        }
    }

    let sample_notes = [
        (0usize, "nota del notebook 1"),
        (0, "nota del notebook 1"),
        (1, "nota del notebook 2"),
        (2, "nota del notebook 3"),
    ];
    for (owner, title) in sample_notes {
        create_note_op(
            conn,
            notebooks[owner].uuid,
            title.to_string(),
            "Contents".to_string(),
            created_at,
            changes,
        )?;
    }

    Ok(true)
}
