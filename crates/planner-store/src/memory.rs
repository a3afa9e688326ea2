//! In-memory relational store.
//!
//! Used when no `DATABASE_URL` is configured and by the test suites. Ids are
//! allocated from per-table counters starting at 1, mirroring `BIGSERIAL`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use planner_core::{Board, BoardId, Group, GroupId, User, UserId};

use crate::error::{StoreError, StoreResult};
use crate::models::{GroupChanges, NewBoard, NewGroup, NewUser, normalize_members};
use crate::repository::BoardRepository;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    boards: BTreeMap<BoardId, Board>,
    groups: BTreeMap<GroupId, Group>,
    last_user: i64,
    last_board: i64,
    last_group: i64,
}

impl Tables {
    fn board(&self, id: BoardId) -> StoreResult<&Board> {
        self.boards.get(&id).ok_or(StoreError::BoardNotFound(id))
    }

    fn board_mut(&mut self, id: BoardId) -> StoreResult<&mut Board> {
        self.boards.get_mut(&id).ok_or(StoreError::BoardNotFound(id))
    }

    fn require_users(&self, ids: &[UserId]) -> StoreResult<()> {
        match ids.iter().find(|id| !self.users.contains_key(id)) {
            Some(id) => Err(StoreError::UserNotFound(*id)),
            None => Ok(()),
        }
    }

    fn group_mut(&mut self, board: BoardId, id: GroupId) -> StoreResult<&mut Group> {
        self.groups
            .get_mut(&id)
            .filter(|g| g.board == board)
            .ok_or(StoreError::GroupNotFound { board, group: id })
    }
}

/// Relational store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoardRepository for MemoryStore {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("user already exists".to_string()));
        }
        t.last_user += 1;
        let created = User {
            id: UserId(t.last_user),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        };
        t.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        let t = self.tables.read().await;
        t.users.get(&id).cloned().ok_or(StoreError::UserNotFound(id))
    }

    async fn get_users(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let t = self.tables.read().await;
        let mut users: Vec<User> = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = t.users.get(id)
                && !users.iter().any(|u| u.id == *id)
            {
                users.push(user.clone());
            }
        }
        Ok(users)
    }

    async fn missing_users(&self, ids: &[UserId]) -> StoreResult<Vec<UserId>> {
        let t = self.tables.read().await;
        Ok(ids
            .iter()
            .filter(|id| !t.users.contains_key(id))
            .copied()
            .collect())
    }

    async fn insert_board(&self, board: &NewBoard) -> StoreResult<Board> {
        let mut t = self.tables.write().await;
        let members = board.member_set();
        t.require_users(&members)?;

        t.last_board += 1;
        let created = Board {
            id: BoardId(t.last_board),
            title: board.title.clone(),
            owner: board.owner,
            members: normalize_members(members),
            created: Utc::now(),
        };
        t.boards.insert(created.id, created.clone());
        tracing::debug!(board_id = %created.id, "Inserted board");
        Ok(created)
    }

    async fn get_board(&self, id: BoardId) -> StoreResult<Board> {
        self.tables.read().await.board(id).cloned()
    }

    async fn list_boards_for(&self, user: UserId) -> StoreResult<Vec<Board>> {
        let t = self.tables.read().await;
        let mut boards: Vec<Board> = t
            .boards
            .values()
            .filter(|b| b.members.contains(&user))
            .cloned()
            .collect();
        boards.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(boards)
    }

    async fn update_board_title(&self, id: BoardId, title: &str) -> StoreResult<Board> {
        let mut t = self.tables.write().await;
        let board = t.board_mut(id)?;
        board.title = title.to_string();
        Ok(board.clone())
    }

    async fn delete_board(&self, id: BoardId) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.boards.remove(&id).ok_or(StoreError::BoardNotFound(id))?;
        t.groups.retain(|_, g| g.board != id);
        Ok(())
    }

    async fn add_members(&self, id: BoardId, members: &[UserId]) -> StoreResult<Board> {
        let mut t = self.tables.write().await;
        t.board(id)?;
        t.require_users(members)?;

        let board = t.board_mut(id)?;
        let mut all = std::mem::take(&mut board.members);
        all.extend_from_slice(members);
        board.members = normalize_members(all);
        Ok(board.clone())
    }

    async fn remove_members(&self, id: BoardId, members: &[UserId]) -> StoreResult<Board> {
        let mut t = self.tables.write().await;
        let board = t.board_mut(id)?;
        if members.contains(&board.owner) {
            return Err(StoreError::OwnerNotRemovable(id));
        }
        board.members.retain(|m| !members.contains(m));
        Ok(board.clone())
    }

    async fn insert_group(&self, group: &NewGroup) -> StoreResult<Group> {
        let mut t = self.tables.write().await;
        t.board(group.board)?;

        t.last_group += 1;
        let created = Group {
            id: GroupId(t.last_group),
            title: group.title.clone(),
            color: group.color,
            board: group.board,
            created: Utc::now(),
        };
        t.groups.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_group(&self, board: BoardId, id: GroupId) -> StoreResult<Group> {
        let t = self.tables.read().await;
        t.groups
            .get(&id)
            .filter(|g| g.board == board)
            .cloned()
            .ok_or(StoreError::GroupNotFound { board, group: id })
    }

    async fn list_groups(&self, board: BoardId) -> StoreResult<Vec<Group>> {
        let t = self.tables.read().await;
        // Ids are allocated monotonically, so key order is creation order.
        Ok(t.groups
            .values()
            .filter(|g| g.board == board)
            .cloned()
            .collect())
    }

    async fn update_group(
        &self,
        board: BoardId,
        id: GroupId,
        changes: &GroupChanges,
    ) -> StoreResult<Group> {
        let mut t = self.tables.write().await;
        let group = t.group_mut(board, id)?;
        if let Some(title) = &changes.title {
            group.title = title.clone();
        }
        if let Some(color) = changes.color {
            group.color = color;
        }
        Ok(group.clone())
    }

    async fn delete_group(&self, board: BoardId, id: GroupId) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.group_mut(board, id)?;
        t.groups.remove(&id);
        Ok(())
    }
}
