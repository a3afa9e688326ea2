//! Core data types for the notes board API.
//!
//! Boards and groups live in the relational store and are keyed by integer
//! ids. Notes live in the document store and are keyed by a client-supplied
//! UUIDv4 that is only unique within the note's parent collection.
//!
//! All types derive `Debug`, `Clone`, `Serialize`, and `Deserialize` for
//! inspection, copying, and JSON serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

macro_rules! relational_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw database key.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

relational_id!(
    /// Primary key of a user account.
    UserId
);
relational_id!(
    /// Primary key of a notes board.
    BoardId
);
relational_id!(
    /// Primary key of a group inside a board.
    GroupId
);

/// Client-supplied identifier of a note.
///
/// Only version 4 UUIDs are accepted; the same value may legitimately occur
/// under two different parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub Uuid);

impl NoteId {
    /// Parses a note id, rejecting anything that is not a UUIDv4.
    pub fn parse_v4(s: &str) -> Result<Self, NoteIdError> {
        let uuid = Uuid::parse_str(s).map_err(|_| NoteIdError::Malformed(s.to_string()))?;
        Self::from_uuid(uuid)
    }

    /// Wraps an already parsed UUID, rejecting other versions.
    pub fn from_uuid(uuid: Uuid) -> Result<Self, NoteIdError> {
        match uuid.get_version_num() {
            4 => Ok(Self(uuid)),
            other => Err(NoteIdError::WrongVersion(other)),
        }
    }

    /// Generates a fresh random note id.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NoteId {
    type Err = NoteIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_v4(s)
    }
}

/// Rejection reasons for a note id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteIdError {
    #[error("'{0}' is not a valid UUID")]
    Malformed(String),

    #[error("expected a version 4 UUID, got version {0}")]
    WrongVersion(usize),
}

// ============================================================================
// Colors
// ============================================================================

/// An RGB color packed into a single integer (`0xRRGGBB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexColor(pub u32);

impl HexColor {
    /// Largest packable value.
    pub const MAX: u32 = 0x00ff_ffff;

    /// Parses `#rgb` or `#rrggbb`; three digit forms are expanded.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        u32::from_str_radix(&expanded, 16).ok().map(Self)
    }

    /// Builds a color from a stored integer, rejecting values outside RGB range.
    pub fn from_packed(value: i64) -> Option<Self> {
        u32::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Self)
    }

    #[must_use]
    pub const fn packed(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A user account as seen by the notes API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A notes board.
///
/// `members` always contains `owner`; stores maintain that on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub owner: UserId,
    pub members: Vec<UserId>,
    pub created: DateTime<Utc>,
}

impl Board {
    /// Title length bounds, in characters.
    pub const TITLE_MIN: usize = 2;
    pub const TITLE_MAX: usize = 100;

    #[must_use]
    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == user
    }

    #[must_use]
    pub fn is_member(&self, user: UserId) -> bool {
        self.owner == user || self.members.contains(&user)
    }
}

/// A colored group of notes inside a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    pub color: HexColor,
    pub board: BoardId,
    pub created: DateTime<Utc>,
}

impl Group {
    pub const TITLE_MAX: usize = 50;

    /// The note collection owned by this group.
    #[must_use]
    pub fn note_parent(&self) -> NoteParent {
        NoteParent::Group {
            board: self.board,
            group: self.id,
        }
    }
}

/// The collection a note belongs to.
///
/// Group parents carry their board id so that a note's location can be
/// linked without another relational lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteParent {
    Board { board: BoardId },
    Group { board: BoardId, group: GroupId },
}

impl NoteParent {
    /// The board that (directly or through a group) owns the note.
    #[must_use]
    pub const fn board(&self) -> BoardId {
        match self {
            Self::Board { board } | Self::Group { board, .. } => *board,
        }
    }

    #[must_use]
    pub const fn group(&self) -> Option<GroupId> {
        match self {
            Self::Board { .. } => None,
            Self::Group { group, .. } => Some(*group),
        }
    }
}

impl From<BoardId> for NoteParent {
    fn from(board: BoardId) -> Self {
        Self::Board { board }
    }
}

impl fmt::Display for NoteParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board { board } => write!(f, "board {}", board),
            Self::Group { board, group } => write!(f, "group {} of board {}", group, board),
        }
    }
}

/// A note stored in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub parent: NoteParent,
    pub content: String,
    pub created: DateTime<Utc>,
    pub last_edited: DateTime<Utc>,
    pub edited_by: UserId,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_accepts_v4() {
        let id = Uuid::new_v4();
        let parsed = NoteId::parse_v4(&id.to_string()).unwrap();
        assert_eq!(parsed.as_uuid(), &id);
        assert_eq!(parsed.to_string(), id.hyphenated().to_string());
    }

    #[test]
    fn test_note_id_rejects_other_versions() {
        // Version 1 (time based) UUID.
        let v1 = "c232ab00-9414-11ec-b3c8-9f6bdeced846";
        assert_eq!(NoteId::parse_v4(v1), Err(NoteIdError::WrongVersion(1)));
        assert!(matches!(
            NoteId::parse_v4("not-a-uuid"),
            Err(NoteIdError::Malformed(_))
        ));
    }

    #[test]
    fn test_hex_color_parse_and_display() {
        assert_eq!(HexColor::parse("#ffffff"), Some(HexColor(0xffffff)));
        assert_eq!(HexColor::parse("#0f0"), Some(HexColor(0x00ff00)));
        assert_eq!(HexColor::parse("#00FF00").unwrap().to_string(), "#00ff00");
        assert_eq!(HexColor(0x0000ff).to_string(), "#0000ff");
    }

    #[test]
    fn test_hex_color_rejects_bad_input() {
        assert_eq!(HexColor::parse("ffffff"), None);
        assert_eq!(HexColor::parse("#ffff"), None);
        assert_eq!(HexColor::parse("#gggggg"), None);
        assert_eq!(HexColor::from_packed(0x0100_0000), None);
        assert_eq!(HexColor::from_packed(-1), None);
    }

    #[test]
    fn test_board_membership_includes_owner() {
        let board = Board {
            id: BoardId(1),
            title: "Trip".into(),
            owner: UserId(7),
            members: vec![UserId(7), UserId(9)],
            created: Utc::now(),
        };
        assert!(board.is_owner(UserId(7)));
        assert!(board.is_member(UserId(9)));
        assert!(!board.is_member(UserId(3)));
    }

    #[test]
    fn test_note_parent_board_lookup() {
        let parent = NoteParent::Group {
            board: BoardId(4),
            group: GroupId(2),
        };
        assert_eq!(parent.board(), BoardId(4));
        assert_eq!(parent.group(), Some(GroupId(2)));
        assert_eq!(NoteParent::from(BoardId(4)).group(), None);
    }
}
