//! Cross-collection behavior of the note hierarchy under failures and
//! concurrent writers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use planner_core::{BoardId, Group, GroupId, HexColor, NoteId, NoteParent, UserId};
use planner_store::{
    CollectionPath, Document, DocumentPath, DocumentStore, MemoryDocumentStore, NoteHierarchyStore,
    StoreError, StoreResult,
};

/// Wraps the memory store and fails deletes while `fail_deletes` is set.
#[derive(Debug, Default)]
struct FlakyDocuments {
    inner: MemoryDocumentStore,
    fail_deletes: AtomicBool,
}

#[async_trait]
impl DocumentStore for FlakyDocuments {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Value>> {
        self.inner.get(path).await
    }

    async fn set(&self, path: &DocumentPath, body: &Value) -> StoreResult<()> {
        self.inner.set(path, body).await
    }

    async fn delete(&self, path: &DocumentPath) -> StoreResult<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("delete {}", path)));
        }
        self.inner.delete(path).await
    }

    async fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<Document>> {
        self.inner.list(collection).await
    }
}

fn packing() -> Group {
    Group {
        id: GroupId(7),
        title: "Packing".into(),
        color: HexColor(0xffffff),
        board: BoardId(3),
        created: Utc::now(),
    }
}

#[tokio::test]
async fn interrupted_move_duplicates_instead_of_losing() {
    let docs = Arc::new(FlakyDocuments::default());
    let notes = NoteHierarchyStore::new(docs.clone());
    let group = packing();
    let id = NoteId::new_v4();
    notes
        .upsert(group.note_parent(), id, "passport", UserId(1))
        .await
        .unwrap();

    docs.fail_deletes.store(true, Ordering::SeqCst);
    let err = notes.destroy_group(&group, false).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));

    let board = NoteParent::from(group.board);
    let in_board = notes.get(board, id).await.unwrap().unwrap();
    let in_group = notes.get(group.note_parent(), id).await.unwrap().unwrap();
    assert_eq!(in_board.content, "passport");
    assert_eq!(in_group.content, "passport");

    // Retrying after recovery converges on a single copy.
    docs.fail_deletes.store(false, Ordering::SeqCst);
    notes.destroy_group(&group, false).await.unwrap();
    assert_eq!(notes.count(board).await.unwrap(), 1);
    assert_eq!(notes.count(group.note_parent()).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_upserts_last_write_wins() {
    let notes = NoteHierarchyStore::new(Arc::new(MemoryDocumentStore::new()));
    let parent = NoteParent::from(BoardId(1));
    let id = NoteId::new_v4();

    let (a, b) = tokio::join!(
        notes.upsert(parent, id, "from a", UserId(1)),
        notes.upsert(parent, id, "from b", UserId(2)),
    );
    a.unwrap();
    b.unwrap();

    let listed = notes.list(parent).await.unwrap();
    assert_eq!(listed.len(), 1);
    let winner = &listed[0];
    assert!(winner.content == "from a" || winner.content == "from b");
    let expected_editor = if winner.content == "from a" {
        UserId(1)
    } else {
        UserId(2)
    };
    assert_eq!(winner.edited_by, expected_editor);
}

#[tokio::test]
async fn move_changes_counts_by_group_size() {
    let notes = NoteHierarchyStore::new(Arc::new(MemoryDocumentStore::new()));
    let group = packing();
    let board = NoteParent::from(group.board);

    notes.upsert(board, NoteId::new_v4(), "own", UserId(1)).await.unwrap();
    for content in ["a", "b", "c"] {
        notes
            .upsert(group.note_parent(), NoteId::new_v4(), content, UserId(1))
            .await
            .unwrap();
    }

    let before = notes.count(board).await.unwrap();
    let in_group = notes.count(group.note_parent()).await.unwrap();
    notes.destroy_group(&group, false).await.unwrap();
    assert_eq!(notes.count(board).await.unwrap(), before + in_group);
}

#[tokio::test]
async fn same_id_under_two_parents_is_independent() {
    let notes = NoteHierarchyStore::new(Arc::new(MemoryDocumentStore::new()));
    let group = packing();
    let board = NoteParent::from(group.board);
    let id = NoteId::new_v4();

    notes.upsert(board, id, "board copy", UserId(1)).await.unwrap();
    notes.upsert(group.note_parent(), id, "group copy", UserId(1)).await.unwrap();
    notes.delete(group.note_parent(), id).await.unwrap();

    assert_eq!(notes.get(board, id).await.unwrap().unwrap().content, "board copy");
}
