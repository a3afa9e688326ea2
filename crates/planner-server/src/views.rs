//! Read models handed to the representation schemas.
//!
//! Each view owns the entity plus whatever related data its representation
//! needs (users, notes, counts), loaded by the handler beforehand so that
//! rendering performs no I/O.

use planner_core::{Attr, Board, Group, Note, Resource, User};

/// A note together with its last editor.
#[derive(Debug, Clone)]
pub struct NoteView {
    pub note: Note,
    pub editor: User,
}

impl Resource for NoteView {
    fn identity(&self) -> Option<String> {
        self.note.identity()
    }

    fn attr(&self, name: &str) -> Attr<'_> {
        match name {
            "edited_by" => Attr::Object(&self.editor),
            _ => self.note.attr(name),
        }
    }
}

/// A group with either its notes or just their count.
#[derive(Debug, Clone)]
pub struct GroupView {
    pub group: Group,
    pub notes: Vec<NoteView>,
    pub note_count: usize,
}

impl Resource for GroupView {
    fn identity(&self) -> Option<String> {
        Some(self.group.id.to_string())
    }

    fn attr(&self, name: &str) -> Attr<'_> {
        match name {
            "id" | "pk" => Attr::value(self.group.id.get()),
            "title" => Attr::value(self.group.title.as_str()),
            "color" => Attr::value(self.group.color.packed()),
            "board" => Attr::Object(&self.group.board),
            "created" => Attr::value(self.group.created.to_rfc3339()),
            "notes" => Attr::Many(self.notes.iter().map(|n| n as &dyn Resource).collect()),
            "note_count" => Attr::value(self.note_count),
            _ => Attr::Missing,
        }
    }
}

/// A board with its people, and either its contents or their counts.
#[derive(Debug, Clone)]
pub struct BoardView {
    pub board: Board,
    pub owner: User,
    pub members: Vec<User>,
    pub notes: Vec<NoteView>,
    pub groups: Vec<GroupView>,
    pub note_count: usize,
    pub group_count: usize,
}

impl Resource for BoardView {
    fn identity(&self) -> Option<String> {
        Some(self.board.id.to_string())
    }

    fn attr(&self, name: &str) -> Attr<'_> {
        match name {
            "id" | "pk" => Attr::value(self.board.id.get()),
            "title" => Attr::value(self.board.title.as_str()),
            "owner" => Attr::Object(&self.owner),
            "members" => Attr::Many(self.members.iter().map(|u| u as &dyn Resource).collect()),
            "created" => Attr::value(self.board.created.to_rfc3339()),
            "notes" => Attr::Many(self.notes.iter().map(|n| n as &dyn Resource).collect()),
            "groups" => Attr::Many(self.groups.iter().map(|g| g as &dyn Resource).collect()),
            "note_count" => Attr::value(self.note_count),
            "group_count" => Attr::value(self.group_count),
            _ => Attr::Missing,
        }
    }
}

/// The `{members: [...]}` body returned by membership changes.
#[derive(Debug, Clone)]
pub struct MembersView {
    pub members: Vec<User>,
}

impl Resource for MembersView {
    fn identity(&self) -> Option<String> {
        None
    }

    fn attr(&self, name: &str) -> Attr<'_> {
        match name {
            "members" => Attr::Many(self.members.iter().map(|u| u as &dyn Resource).collect()),
            _ => Attr::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use planner_core::{BoardId, GroupId, HexColor, NoteId, NoteParent, UserId, href::traverse};

    fn user(id: i64) -> User {
        User {
            id: UserId(id),
            email: format!("{}@example.com", id),
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn test_group_view_exposes_board_for_links() {
        let view = GroupView {
            group: Group {
                id: GroupId(3),
                title: "Packing".into(),
                color: HexColor(0xffffff),
                board: BoardId(9),
                created: Utc::now(),
            },
            notes: Vec::new(),
            note_count: 4,
        };
        match traverse(&view, "board.id") {
            Attr::Value(v) => assert_eq!(v, 9),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(view.attr("note_count"), Attr::Value(_)));
    }

    #[test]
    fn test_note_view_overrides_editor() {
        let view = NoteView {
            note: Note {
                id: NoteId::new_v4(),
                parent: NoteParent::from(BoardId(1)),
                content: "passport".into(),
                created: Utc::now(),
                last_edited: Utc::now(),
                edited_by: UserId(2),
            },
            editor: user(2),
        };
        match view.attr("edited_by") {
            Attr::Object(o) => assert!(matches!(o.attr("email"), Attr::Value(_))),
            other => panic!("unexpected {:?}", other),
        }
        match traverse(&view, "parent.board.id") {
            Attr::Value(v) => assert_eq!(v, 1),
            other => panic!("unexpected {:?}", other),
        }
    }
}
