use cuaderno_core::{EntityKind, RowDelta, Store, StoreError, WatchQuery};
use uuid::Uuid;

#[test]
fn background_commit_reaches_observers_after_merge() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path().join("cuaderno.db")).unwrap();
    let notebook = store.create_notebook("principal", 0).unwrap();
    let handle = store.watch(WatchQuery::notes_in(notebook.uuid)).unwrap();

    let writer = store.background_writer().unwrap();
    let target = notebook.uuid;
    let job = writer.spawn(move |ctx| ctx.create_note(target, "desde atrás", "c", 100));
    let note = job.wait().unwrap();

    // The commit is durable but not yet merged, so no deltas are visible.
    assert!(handle.drain_batches().is_empty());

    assert_eq!(store.merge_pending_commits(), 1);
    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert {
            id: note.uuid,
            at: 0,
        }]
    );
}

#[test]
fn background_commits_are_readable_before_merging() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path().join("cuaderno.db")).unwrap();
    let notebook = store.create_notebook("principal", 0).unwrap();

    let writer = store.background_writer().unwrap();
    let target = notebook.uuid;
    let job = writer.spawn(move |ctx| ctx.create_note(target, "ya visible", "c", 100));
    let note = job.wait().unwrap();

    // Reads go straight to committed storage; only deltas wait for merges.
    let loaded = store.get_note(note.uuid).unwrap().unwrap();
    assert_eq!(loaded.title, "ya visible");
}

#[test]
fn commit_before_watch_lands_in_the_snapshot_not_in_deltas() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path().join("cuaderno.db")).unwrap();

    let writer = store.background_writer().unwrap();
    let job = writer.spawn(move |ctx| ctx.create_notebook("agenda", 10));
    let notebook = job.wait().unwrap();

    let handle = store.watch(WatchQuery::notebooks()).unwrap();

    assert_eq!(handle.initial_ids(), &[notebook.uuid]);
    assert_eq!(store.merge_pending_commits(), 0);
    assert!(handle.drain_batches().is_empty());
}

#[test]
fn store_writes_merge_earlier_background_commits_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path().join("cuaderno.db")).unwrap();
    let handle = store.watch(WatchQuery::notebooks()).unwrap();

    let writer = store.background_writer().unwrap();
    let job = writer.spawn(move |ctx| ctx.create_notebook("atrás", 100));
    let background = job.wait().unwrap();

    // This write merges the pending background commit before its own.
    let foreground = store.create_notebook("delante", 200).unwrap();

    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 2);
    assert!(batches[0].commit_seq < batches[1].commit_seq);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert {
            id: background.uuid,
            at: 0,
        }]
    );
    assert_eq!(
        batches[1].deltas,
        vec![RowDelta::Insert {
            id: foreground.uuid,
            at: 1,
        }]
    );
}

#[test]
fn sequential_jobs_merge_in_commit_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path().join("cuaderno.db")).unwrap();
    let handle = store.watch(WatchQuery::notebooks()).unwrap();
    let writer = store.background_writer().unwrap();

    let first = writer
        .spawn(move |ctx| ctx.create_notebook("alfa", 100))
        .wait()
        .unwrap();
    let second = writer
        .spawn(move |ctx| ctx.create_notebook("beta", 200))
        .wait()
        .unwrap();

    assert_eq!(store.merge_pending_commits(), 2);
    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert {
            id: first.uuid,
            at: 0,
        }]
    );
    assert_eq!(
        batches[1].deltas,
        vec![RowDelta::Insert {
            id: second.uuid,
            at: 1,
        }]
    );
}

#[test]
fn failed_background_job_reports_error_and_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path().join("cuaderno.db")).unwrap();
    let writer = store.background_writer().unwrap();
    let missing = Uuid::new_v4();

    let job = writer.spawn(move |ctx| ctx.create_note(missing, "huérfana", "c", 0));
    let err = job.wait().unwrap_err();
    assert!(matches!(
        err,
        StoreError::ParentNotFound {
            kind: EntityKind::Notebook,
            id,
        } if id == missing
    ));

    assert_eq!(store.merge_pending_commits(), 0);
    assert!(store.list_notebooks().unwrap().is_empty());
}

#[test]
fn background_edit_preserves_created_at() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path().join("cuaderno.db")).unwrap();
    let notebook = store.create_notebook("diario", 0).unwrap();
    let note = store
        .create_note(notebook.uuid, "borrador", "v1", 1_000)
        .unwrap();
    let handle = store.watch(WatchQuery::notes_in(notebook.uuid)).unwrap();

    let writer = store.background_writer().unwrap();
    let target = note.uuid;
    let edited = writer
        .spawn(move |ctx| ctx.edit_note(target, "final", "v2"))
        .wait()
        .unwrap();
    assert_eq!(edited.created_at, 1_000);
    assert!(edited.updated_at > 1_000);

    store.merge_pending_commits();
    let batches = handle.drain_batches();
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Update {
            id: note.uuid,
            at: 0,
        }]
    );
}

#[test]
fn background_note_with_photograph_is_one_commit() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path().join("cuaderno.db")).unwrap();
    let notebook = store.create_notebook("viajes", 0).unwrap();
    let handle = store.watch(WatchQuery::notes_in(notebook.uuid)).unwrap();

    let writer = store.background_writer().unwrap();
    let target = notebook.uuid;
    let (note, photo) = writer
        .spawn(move |ctx| ctx.create_note_with_photograph(target, "playa", "c", &[9], 100))
        .wait()
        .unwrap();

    assert_eq!(store.merge_pending_commits(), 1);
    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert {
            id: note.uuid,
            at: 0,
        }]
    );

    let photos = store.list_photographs_of(note.uuid).unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].uuid, photo.uuid);
}

#[test]
fn background_commit_survives_a_dropped_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cuaderno.db");
    let store = Store::open(&path).unwrap();
    let writer = store.background_writer().unwrap();
    drop(store);

    let notebook = writer
        .spawn(move |ctx| ctx.create_notebook("huérfano", 0))
        .wait()
        .unwrap();

    let reopened = Store::open(&path).unwrap();
    assert!(reopened.get_notebook(notebook.uuid).unwrap().is_some());
}
