//! Note hierarchy over the document store.
//!
//! Each board and each group owns one notes collection. This module owns the
//! note document layout and the cross-collection operations: orphan
//! promotion when a group is destroyed without cascade, and purging when a
//! board goes away.
//!
//! There is no transaction spanning collections. Moving a note writes the
//! board copy before deleting the group copy, so a failure in between leaves
//! a duplicate rather than losing the note.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use planner_core::{Group, Note, NoteId, NoteParent, UserId};

use crate::documents::{CollectionPath, Document, DocumentStore};
use crate::error::{StoreError, StoreResult};

/// Stored body of a note document. The id and parent are implied by the
/// document path.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NoteDocument {
    #[serde(default)]
    content: String,
    created: DateTime<Utc>,
    last_edited: DateTime<Utc>,
    edited_by: UserId,
}

impl NoteDocument {
    fn into_note(self, parent: NoteParent, id: NoteId) -> Note {
        Note {
            id,
            parent,
            content: self.content,
            created: self.created,
            last_edited: self.last_edited,
            edited_by: self.edited_by,
        }
    }
}

fn decode(parent: NoteParent, doc: Document) -> StoreResult<Note> {
    let id = NoteId::parse_v4(&doc.id)
        .map_err(|e| StoreError::InvalidData(format!("note id in {}: {}", parent, e)))?;
    let body: NoteDocument = serde_json::from_value(doc.body)?;
    Ok(body.into_note(parent, id))
}

/// Outcome of destroying a group's notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupNotesOutcome {
    Deleted(usize),
    /// Notes re-parented to the board.
    Moved(usize),
}

/// Note CRUD scoped by parent collection.
#[derive(Debug, Clone)]
pub struct NoteHierarchyStore {
    documents: Arc<dyn DocumentStore>,
}

impl NoteHierarchyStore {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    pub async fn get(&self, parent: NoteParent, id: NoteId) -> StoreResult<Option<Note>> {
        let path = CollectionPath::notes_of(&parent).doc(id.to_string());
        match self.documents.get(&path).await? {
            Some(body) => {
                let doc: NoteDocument = serde_json::from_value(body)?;
                Ok(Some(doc.into_note(parent, id)))
            }
            None => Ok(None),
        }
    }

    /// Creates the note or replaces its content.
    ///
    /// `created` is kept from the existing document. `last_edited` is strictly
    /// greater than the previous value even when the clock has not advanced.
    pub async fn upsert(
        &self,
        parent: NoteParent,
        id: NoteId,
        content: &str,
        editor: UserId,
    ) -> StoreResult<Note> {
        let now = Utc::now();
        let path = CollectionPath::notes_of(&parent).doc(id.to_string());

        let (created, last_edited) = match self.documents.get(&path).await? {
            Some(body) => {
                let previous: NoteDocument = serde_json::from_value(body)?;
                let floor = previous.last_edited + Duration::microseconds(1);
                (previous.created, now.max(floor))
            }
            None => (now, now),
        };

        let doc = NoteDocument {
            content: content.to_string(),
            created,
            last_edited,
            edited_by: editor,
        };
        self.documents.set(&path, &serde_json::to_value(&doc)?).await?;
        tracing::info!(note_id = %id, parent = %parent, "Upserted note");

        Ok(doc.into_note(parent, id))
    }

    /// Deletes a note; missing notes are reported as not found.
    pub async fn delete(&self, parent: NoteParent, id: NoteId) -> StoreResult<()> {
        let path = CollectionPath::notes_of(&parent).doc(id.to_string());
        if !self.documents.delete(&path).await? {
            return Err(StoreError::NoteNotFound { parent, id });
        }
        tracing::info!(note_id = %id, parent = %parent, "Deleted note");
        Ok(())
    }

    /// Notes of a parent, newest first. Each call reads a fresh snapshot.
    pub async fn list(&self, parent: NoteParent) -> StoreResult<Vec<Note>> {
        let docs = self.documents.list(&CollectionPath::notes_of(&parent)).await?;
        let mut notes = docs
            .into_iter()
            .map(|doc| decode(parent, doc))
            .collect::<StoreResult<Vec<_>>>()?;
        notes.sort_by(|a, b| b.created.cmp(&a.created).then(a.id.cmp(&b.id)));
        Ok(notes)
    }

    pub async fn count(&self, parent: NoteParent) -> StoreResult<usize> {
        Ok(self
            .documents
            .list(&CollectionPath::notes_of(&parent))
            .await?
            .len())
    }

    /// Deletes every note of a parent, returning how many were removed.
    pub async fn purge(&self, parent: NoteParent) -> StoreResult<usize> {
        let collection = CollectionPath::notes_of(&parent);
        let docs = self.documents.list(&collection).await?;
        let mut removed = 0;
        for doc in docs {
            if self.documents.delete(&collection.doc(doc.id)).await? {
                removed += 1;
            }
        }
        tracing::debug!(parent = %parent, removed, "Purged notes");
        Ok(removed)
    }

    /// Disposes of a group's notes before the group itself is deleted.
    ///
    /// With `cascade` the notes are deleted. Otherwise each note is copied
    /// verbatim into the board's collection under the same id and then
    /// removed from the group; a board note with that id is overwritten.
    pub async fn destroy_group(&self, group: &Group, cascade: bool) -> StoreResult<GroupNotesOutcome> {
        let source = CollectionPath::notes_of(&group.note_parent());
        let docs = self.documents.list(&source).await?;

        if cascade {
            let mut deleted = 0;
            for doc in docs {
                if self.documents.delete(&source.doc(doc.id)).await? {
                    deleted += 1;
                }
            }
            tracing::info!(group_id = %group.id, deleted, "Deleted group notes");
            return Ok(GroupNotesOutcome::Deleted(deleted));
        }

        let target = CollectionPath::notes_of(&NoteParent::from(group.board));
        let mut moved = 0;
        for Document { id, body } in docs {
            self.documents.set(&target.doc(id.clone()), &body).await?;
            self.documents.delete(&source.doc(id)).await?;
            moved += 1;
        }
        tracing::info!(
            group_id = %group.id,
            board_id = %group.board,
            moved,
            "Moved group notes to board"
        );
        Ok(GroupNotesOutcome::Moved(moved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::MemoryDocumentStore;
    use planner_core::{BoardId, GroupId, HexColor};

    fn store() -> NoteHierarchyStore {
        NoteHierarchyStore::new(Arc::new(MemoryDocumentStore::new()))
    }

    fn group() -> Group {
        Group {
            id: GroupId(2),
            title: "Packing".into(),
            color: HexColor(0xffffff),
            board: BoardId(1),
            created: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_one_note() {
        let notes = store();
        let parent = NoteParent::from(BoardId(1));
        let id = NoteId::new_v4();

        let first = notes.upsert(parent, id, "a", UserId(1)).await.unwrap();
        let second = notes.upsert(parent, id, "b", UserId(2)).await.unwrap();

        let listed = notes.list(parent).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "b");
        assert_eq!(listed[0].edited_by, UserId(2));
        assert_eq!(second.created, first.created);
        assert!(second.last_edited > first.last_edited);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let notes = store();
        let err = notes
            .delete(NoteParent::from(BoardId(1)), NoteId::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let notes = store();
        let parent = NoteParent::from(BoardId(1));
        let old = notes.upsert(parent, NoteId::new_v4(), "old", UserId(1)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let new = notes.upsert(parent, NoteId::new_v4(), "new", UserId(1)).await.unwrap();

        let ids: Vec<NoteId> = notes.list(parent).await.unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn test_cascade_deletes_group_notes_only() {
        let notes = store();
        let g = group();
        let board = NoteParent::from(g.board);
        notes.upsert(board, NoteId::new_v4(), "keep", UserId(1)).await.unwrap();
        for _ in 0..3 {
            notes.upsert(g.note_parent(), NoteId::new_v4(), "x", UserId(1)).await.unwrap();
        }

        let outcome = notes.destroy_group(&g, true).await.unwrap();
        assert_eq!(outcome, GroupNotesOutcome::Deleted(3));
        assert_eq!(notes.count(board).await.unwrap(), 1);
        assert_eq!(notes.count(g.note_parent()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_move_preserves_id_and_content() {
        let notes = store();
        let g = group();
        let board = NoteParent::from(g.board);
        notes.upsert(board, NoteId::new_v4(), "keep", UserId(1)).await.unwrap();
        let id = NoteId::new_v4();
        let original = notes.upsert(g.note_parent(), id, "passport", UserId(1)).await.unwrap();
        notes.upsert(g.note_parent(), NoteId::new_v4(), "tickets", UserId(1)).await.unwrap();

        let outcome = notes.destroy_group(&g, false).await.unwrap();
        assert_eq!(outcome, GroupNotesOutcome::Moved(2));
        assert_eq!(notes.count(board).await.unwrap(), 3);

        let moved = notes.get(board, id).await.unwrap().unwrap();
        assert_eq!(moved.content, "passport");
        assert_eq!(moved.created, original.created);
        assert_eq!(moved.parent, board);
        assert!(notes.get(g.note_parent(), id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_counts() {
        let notes = store();
        let parent = NoteParent::from(BoardId(5));
        for _ in 0..2 {
            notes.upsert(parent, NoteId::new_v4(), "", UserId(1)).await.unwrap();
        }
        assert_eq!(notes.purge(parent).await.unwrap(), 2);
        assert_eq!(notes.count(parent).await.unwrap(), 0);
    }
}
