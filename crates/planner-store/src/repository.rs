//! Repository trait over the relational store.
//!
//! Boards, their membership and their groups are served through
//! [`BoardRepository`]. Two implementations exist: [`crate::Store`] on
//! PostgreSQL and [`crate::MemoryStore`] for tests and local runs.

use std::fmt;

use async_trait::async_trait;

use planner_core::{Board, BoardId, Group, GroupId, User, UserId};

use crate::error::StoreResult;
use crate::models::{GroupChanges, NewBoard, NewGroup, NewUser};

/// Domain-typed access to users, boards and groups.
///
/// Board member lists are reported sorted by user id and always contain the
/// owner.
#[async_trait]
pub trait BoardRepository: Send + Sync + fmt::Debug {
    // ========================================================================
    // Users
    // ========================================================================

    async fn insert_user(&self, user: &NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<User>;

    /// Fetches users in the order of `ids`, skipping unknown ones.
    async fn get_users(&self, ids: &[UserId]) -> StoreResult<Vec<User>>;

    /// Returns the ids in `ids` that do not name an existing user.
    async fn missing_users(&self, ids: &[UserId]) -> StoreResult<Vec<UserId>>;

    // ========================================================================
    // Boards
    // ========================================================================

    /// Creates a board; the owner is always stored as a member.
    async fn insert_board(&self, board: &NewBoard) -> StoreResult<Board>;

    async fn get_board(&self, id: BoardId) -> StoreResult<Board>;

    /// Boards `user` belongs to, oldest first.
    async fn list_boards_for(&self, user: UserId) -> StoreResult<Vec<Board>>;

    async fn update_board_title(&self, id: BoardId, title: &str) -> StoreResult<Board>;

    /// Deletes a board together with its membership and groups.
    async fn delete_board(&self, id: BoardId) -> StoreResult<()>;

    /// Adds members; already present ids are ignored.
    async fn add_members(&self, id: BoardId, members: &[UserId]) -> StoreResult<Board>;

    /// Removes members; absent ids are ignored.
    ///
    /// Fails with `OwnerNotRemovable` if the owner is in `members`, leaving
    /// the board untouched.
    async fn remove_members(&self, id: BoardId, members: &[UserId]) -> StoreResult<Board>;

    // ========================================================================
    // Groups
    // ========================================================================

    async fn insert_group(&self, group: &NewGroup) -> StoreResult<Group>;

    /// Fetches a group, requiring it to belong to `board`.
    async fn get_group(&self, board: BoardId, id: GroupId) -> StoreResult<Group>;

    /// Groups of a board in creation order.
    async fn list_groups(&self, board: BoardId) -> StoreResult<Vec<Group>>;

    async fn update_group(
        &self,
        board: BoardId,
        id: GroupId,
        changes: &GroupChanges,
    ) -> StoreResult<Group>;

    async fn delete_group(&self, board: BoardId, id: GroupId) -> StoreResult<()>;

    /// Releases connections. Further calls may fail.
    async fn close(&self) {}
}
