//! Database models for the storage layer.
//!
//! These types map directly to database rows and are used for
//! sqlx queries. They are separate from the domain types in
//! planner-core so that column types can differ from domain types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use planner_core::{Board, BoardId, Group, GroupId, HexColor, User, UserId};

use crate::error::{StoreError, StoreResult};

/// Database row for the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId(row.id),
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

/// Database row for the `boards` table.
#[derive(Debug, Clone, FromRow)]
pub struct BoardRow {
    pub id: i64,
    pub title: String,
    pub owner_id: i64,
    pub created: DateTime<Utc>,
}

impl BoardRow {
    /// Combines the row with its membership rows.
    pub fn into_board(self, members: Vec<UserId>) -> Board {
        Board {
            id: BoardId(self.id),
            title: self.title,
            owner: UserId(self.owner_id),
            members,
            created: self.created,
        }
    }
}

/// Database row for the `board_members` table.
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub board_id: i64,
    pub user_id: i64,
}

/// Database row for the `note_groups` table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: i64,
    pub title: String,
    /// Packed `0xRRGGBB`.
    pub color: i32,
    pub board_id: i64,
    pub created: DateTime<Utc>,
}

impl TryFrom<GroupRow> for Group {
    type Error = StoreError;

    fn try_from(row: GroupRow) -> StoreResult<Self> {
        let color = HexColor::from_packed(i64::from(row.color)).ok_or_else(|| {
            StoreError::InvalidData(format!("group {} has color {}", row.id, row.color))
        })?;
        Ok(Self {
            id: GroupId(row.id),
            title: row.title,
            color,
            board: BoardId(row.board_id),
            created: row.created,
        })
    }
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl NewUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: None,
            last_name: None,
        }
    }

    pub fn named(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }
}

/// Input for creating a board.
///
/// `members` may or may not contain the owner; stores always add it.
#[derive(Debug, Clone)]
pub struct NewBoard {
    pub title: String,
    pub owner: UserId,
    pub members: Vec<UserId>,
}

impl NewBoard {
    /// The member set to persist: owner first, duplicates collapsed.
    pub fn member_set(&self) -> Vec<UserId> {
        let mut members = vec![self.owner];
        for member in &self.members {
            if !members.contains(member) {
                members.push(*member);
            }
        }
        members
    }
}

/// Input for creating a group.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub board: BoardId,
    pub title: String,
    pub color: HexColor,
}

/// Partial update of a group; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub title: Option<String>,
    pub color: Option<HexColor>,
}

impl GroupChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.color.is_none()
    }
}

/// Sorts and collapses a member list the way stores report it.
pub(crate) fn normalize_members(mut members: Vec<UserId>) -> Vec<UserId> {
    members.sort();
    members.dedup();
    members
}
