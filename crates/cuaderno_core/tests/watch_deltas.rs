use cuaderno_core::{ObserverState, PhotographOwner, RowDelta, SortKey, Store, WatchQuery};
use uuid::Uuid;

#[test]
fn watch_notebooks_returns_title_ordered_initial_ids() {
    let mut store = Store::open_in_memory().unwrap();
    let c = store.create_notebook("cocina", 100).unwrap();
    let a = store.create_notebook("agenda", 200).unwrap();
    let b = store.create_notebook("bocetos", 300).unwrap();

    let handle = store.watch(WatchQuery::notebooks()).unwrap();
    let twin = store.watch(WatchQuery::notebooks()).unwrap();

    assert_eq!(handle.state(), ObserverState::Live);
    assert_eq!(handle.initial_ids(), &[a.uuid, b.uuid, c.uuid]);
    assert_eq!(twin.initial_ids(), handle.initial_ids());
}

#[test]
fn watch_is_silent_about_commits_before_it_started() {
    let mut store = Store::open_in_memory().unwrap();
    store.create_notebook("antes", 100).unwrap();
    store.create_notebook("también antes", 200).unwrap();

    let handle = store.watch(WatchQuery::notebooks()).unwrap();

    assert!(handle.drain_batches().is_empty());
}

#[test]
fn insert_delta_lands_at_sorted_position() {
    let mut store = Store::open_in_memory().unwrap();
    store.create_notebook("agenda", 100).unwrap();
    store.create_notebook("cocina", 200).unwrap();
    let handle = store.watch(WatchQuery::notebooks()).unwrap();

    let b = store.create_notebook("bocetos", 300).unwrap();

    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert {
            id: b.uuid,
            at: 1,
        }]
    );
}

#[test]
fn note_edits_surface_as_update_at_current_position() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("diario", 0).unwrap();
    store.create_note(notebook.uuid, "lunes", "c", 100).unwrap();
    let tuesday = store
        .create_note(notebook.uuid, "martes", "c", 200)
        .unwrap();
    let handle = store.watch(WatchQuery::notes_in(notebook.uuid)).unwrap();

    store.edit_note(tuesday.uuid, "martes", "más texto").unwrap();

    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Update {
            id: tuesday.uuid,
            at: 1,
        }]
    );
}

#[test]
fn title_sorted_notes_move_when_renamed() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("diario", 0).unwrap();
    let first = store.create_note(notebook.uuid, "ayuno", "c", 100).unwrap();
    store.create_note(notebook.uuid, "bodega", "c", 200).unwrap();
    store.create_note(notebook.uuid, "cartas", "c", 300).unwrap();

    let query = WatchQuery::notes_in(notebook.uuid).with_sort(SortKey::TitleAsc);
    let handle = store.watch(query).unwrap();

    store.edit_note(first.uuid, "zanahorias", "c").unwrap();

    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Move {
            id: first.uuid,
            from: 0,
            to: 2,
        }]
    );
}

#[test]
fn delete_emits_position_of_removed_row() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("diario", 0).unwrap();
    store.create_note(notebook.uuid, "lunes", "c", 100).unwrap();
    let tuesday = store
        .create_note(notebook.uuid, "martes", "c", 200)
        .unwrap();
    store
        .create_note(notebook.uuid, "miércoles", "c", 300)
        .unwrap();
    let handle = store.watch(WatchQuery::notes_in(notebook.uuid)).unwrap();

    store.delete_note(tuesday.uuid).unwrap();

    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Delete {
            id: tuesday.uuid,
            from: 1,
        }]
    );
}

#[test]
fn earlier_created_note_inserts_at_front() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("diario", 0).unwrap();
    store.create_note(notebook.uuid, "tarde", "c", 2_000).unwrap();
    let handle = store.watch(WatchQuery::notes_in(notebook.uuid)).unwrap();

    let early = store
        .create_note(notebook.uuid, "temprano", "c", 1_000)
        .unwrap();

    let batches = handle.drain_batches();
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert {
            id: early.uuid,
            at: 0,
        }]
    );
}

#[test]
fn filter_transitions_insert_and_delete_rows() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("diario", 0).unwrap();
    let monday = store
        .create_note(notebook.uuid, "lunes por la mañana", "c", 100)
        .unwrap();
    let tuesday = store
        .create_note(notebook.uuid, "martes", "c", 200)
        .unwrap();

    let query = WatchQuery::notes_matching(notebook.uuid, "lunes");
    let handle = store.watch(query).unwrap();
    assert_eq!(handle.initial_ids(), &[monday.uuid]);

    // Editing the title into the filter inserts the row.
    store
        .edit_note(tuesday.uuid, "lunes también", "c")
        .unwrap();
    let batches = handle.drain_batches();
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert {
            id: tuesday.uuid,
            at: 1,
        }]
    );

    // Editing it back out deletes the row again.
    store.edit_note(tuesday.uuid, "martes", "c").unwrap();
    let batches = handle.drain_batches();
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Delete {
            id: tuesday.uuid,
            from: 1,
        }]
    );
}

#[test]
fn title_filter_ignores_case_and_accents() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("fiestas", 0).unwrap();
    let birthday = store
        .create_note(notebook.uuid, "Cumpleaños de mamá", "c", 100)
        .unwrap();

    let query = WatchQuery::notes_matching(notebook.uuid, "cumpleanos");
    let handle = store.watch(query).unwrap();
    assert_eq!(handle.initial_ids(), &[birthday.uuid]);

    let second = store
        .create_note(notebook.uuid, "CUMPLEAÑOS otra vez", "c", 200)
        .unwrap();
    let batches = handle.drain_batches();
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert {
            id: second.uuid,
            at: 1,
        }]
    );
}

#[test]
fn one_commit_yields_one_batch_with_sequential_positions() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("viajes", 0).unwrap();
    let note = store.create_note(notebook.uuid, "playa", "c", 0).unwrap();
    let older = store
        .attach_photograph(PhotographOwner::Note(note.uuid), &[1], 100)
        .unwrap();
    let newer = store
        .attach_photograph(PhotographOwner::Note(note.uuid), &[2], 200)
        .unwrap();

    let handle = store.watch(WatchQuery::photographs_of(note.uuid)).unwrap();
    assert_eq!(handle.initial_ids(), &[newer.uuid, older.uuid]);

    store.delete_note(note.uuid).unwrap();

    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 1);
    // Positions refer to the mirror with earlier deltas of the same batch
    // already applied.
    assert_eq!(
        batches[0].deltas,
        vec![
            RowDelta::Delete {
                id: older.uuid,
                from: 1,
            },
            RowDelta::Delete {
                id: newer.uuid,
                from: 0,
            },
        ]
    );
}

#[test]
fn relationship_touches_update_the_owning_row() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("viajes", 0).unwrap();
    let handle = store.watch(WatchQuery::notebooks()).unwrap();

    store.create_note(notebook.uuid, "playa", "c", 100).unwrap();
    let batches = handle.drain_batches();
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Update {
            id: notebook.uuid,
            at: 0,
        }]
    );

    store
        .attach_photograph(PhotographOwner::NotebookCover(notebook.uuid), &[8], 200)
        .unwrap();
    let batches = handle.drain_batches();
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Update {
            id: notebook.uuid,
            at: 0,
        }]
    );
}

#[test]
fn unrelated_commits_deliver_no_batches() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("viajes", 0).unwrap();
    let note = store.create_note(notebook.uuid, "playa", "c", 0).unwrap();
    let other = store.create_notebook("otro", 0).unwrap();
    let handle = store.watch(WatchQuery::photographs_of(note.uuid)).unwrap();

    // Different kind, different scope, photograph of a different parent.
    store.create_notebook("ajeno", 100).unwrap();
    store.create_note(other.uuid, "lejos", "c", 100).unwrap();
    store
        .attach_photograph(PhotographOwner::NotebookCover(other.uuid), &[1], 100)
        .unwrap();

    assert!(handle.drain_batches().is_empty());
}

#[test]
fn batches_arrive_in_commit_order() {
    let mut store = Store::open_in_memory().unwrap();
    let handle = store.watch(WatchQuery::notebooks()).unwrap();

    let a = store.create_notebook("agenda", 100).unwrap();
    let b = store.create_notebook("bocetos", 200).unwrap();

    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 2);
    assert!(batches[0].commit_seq < batches[1].commit_seq);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert { id: a.uuid, at: 0 }]
    );
    assert_eq!(
        batches[1].deltas,
        vec![RowDelta::Insert { id: b.uuid, at: 1 }]
    );
}

#[test]
fn reset_delivers_deletions_for_every_mirrored_row() {
    let mut store = Store::open_in_memory().unwrap();
    let first = store.create_notebook("bocetos", 100).unwrap();
    let second = store.create_notebook("agenda", 200).unwrap();
    let handle = store.watch(WatchQuery::notebooks()).unwrap();
    assert_eq!(handle.initial_ids(), &[second.uuid, first.uuid]);

    store.reset_and_destroy().unwrap();

    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].deltas,
        vec![
            RowDelta::Delete {
                id: first.uuid,
                from: 1,
            },
            RowDelta::Delete {
                id: second.uuid,
                from: 0,
            },
        ]
    );

    let fresh = store.watch(WatchQuery::notebooks()).unwrap();
    assert!(fresh.initial_ids().is_empty());
}

#[test]
fn reset_of_an_empty_store_delivers_no_batches() {
    let mut store = Store::open_in_memory().unwrap();
    let handle = store.watch(WatchQuery::notebooks()).unwrap();

    // The commit lands with an empty change set; observers stay live and
    // keep delivering afterwards.
    store.reset_and_destroy().unwrap();
    assert!(handle.drain_batches().is_empty());
    assert_eq!(handle.state(), ObserverState::Live);

    let notebook = store.create_notebook("nuevo", 100).unwrap();
    let batches = handle.drain_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].deltas,
        vec![RowDelta::Insert {
            id: notebook.uuid,
            at: 0,
        }]
    );
}

#[test]
fn dispose_stops_delivery_and_prunes_on_next_commit() {
    let mut store = Store::open_in_memory().unwrap();
    let handle = store.watch(WatchQuery::notebooks()).unwrap();
    assert_eq!(store.observer_count(), 1);

    // A queued batch becomes unreachable after dispose.
    store.create_notebook("antes", 100).unwrap();
    handle.dispose();
    assert_eq!(handle.state(), ObserverState::Disposed);
    assert!(handle.try_next_batch().is_none());
    assert!(handle.drain_batches().is_empty());

    store.create_notebook("después", 200).unwrap();
    assert_eq!(store.observer_count(), 0);
}

#[test]
fn dropping_handle_disposes_observer() {
    let mut store = Store::open_in_memory().unwrap();
    let handle = store.watch(WatchQuery::notebooks()).unwrap();
    assert_eq!(store.observer_count(), 1);
    drop(handle);

    store.create_notebook("agenda", 100).unwrap();
    assert_eq!(store.observer_count(), 0);
}

#[test]
fn multiple_observers_see_the_same_commit_independently() {
    let mut store = Store::open_in_memory().unwrap();
    let notebook = store.create_notebook("diario", 0).unwrap();
    let notebook_handle = store.watch(WatchQuery::notebooks()).unwrap();
    let notes_handle = store.watch(WatchQuery::notes_in(notebook.uuid)).unwrap();

    let note = store.create_note(notebook.uuid, "lunes", "c", 100).unwrap();

    let notebook_batches = notebook_handle.drain_batches();
    let note_batches = notes_handle.drain_batches();
    assert_eq!(notebook_batches.len(), 1);
    assert_eq!(note_batches.len(), 1);
    assert_eq!(notebook_batches[0].commit_seq, note_batches[0].commit_seq);
    assert_eq!(
        notebook_batches[0].deltas,
        vec![RowDelta::Update {
            id: notebook.uuid,
            at: 0,
        }]
    );
    assert_eq!(
        note_batches[0].deltas,
        vec![RowDelta::Insert {
            id: note.uuid,
            at: 0,
        }]
    );
}

#[test]
fn watching_missing_scope_starts_empty() {
    let mut store = Store::open_in_memory().unwrap();
    let handle = store.watch(WatchQuery::notes_in(Uuid::new_v4())).unwrap();

    assert_eq!(handle.state(), ObserverState::Live);
    assert!(handle.initial_ids().is_empty());
}
