//! Route definitions for the HTTP API.
//!
//! Handlers follow one order: authenticate, read the board from the
//! relational store and authorize against it, then touch the document store.
//! Views are fully loaded before they are rendered.

pub mod boards;
pub mod groups;
pub mod health;
pub mod members;
pub mod notes;
pub mod users;

use std::collections::HashMap;
use std::str::FromStr;

use axum::{Router, http::Method};
use serde_json::Value;

use planner_core::{
    Board, BoardAction, BoardId, Group, GroupId, Note, NoteParent, Resource, Schema, User,
    UserId, ValidationError, authorize,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::views::{BoardView, GroupView, NoteView};

/// Build the complete router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(users::routes())
        .merge(boards::routes())
        .merge(members::routes())
        .merge(groups::routes())
        .merge(notes::routes())
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state)
}

/// Unknown paths still answer with the error envelope.
async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Parses a path segment; anything malformed is simply not found.
pub(crate) fn path_id<T: FromStr>(raw: &str) -> ApiResult<T> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

/// Loads a board and checks `action` for `user`.
pub(crate) async fn board_for(
    state: &AppState,
    id: BoardId,
    user: UserId,
    action: BoardAction,
) -> ApiResult<Board> {
    let board = state.repository().get_board(id).await?;
    authorize(user, &board, action)?;
    Ok(board)
}

/// Loads a group of a board the user may act on.
pub(crate) async fn group_for(
    state: &AppState,
    board: BoardId,
    group: GroupId,
    user: UserId,
    action: BoardAction,
) -> ApiResult<Group> {
    board_for(state, board, user, action).await?;
    Ok(state.repository().get_group(board, group).await?)
}

/// Rejects ids that name no user.
pub(crate) async fn require_users(state: &AppState, ids: &[UserId]) -> ApiResult<()> {
    let missing = state.repository().missing_users(ids).await?;
    if let Some(id) = missing.first() {
        return Err(ValidationError::field(
            "members",
            "does_not_exist",
            format!("Invalid pk \"{}\" - object does not exist.", id),
        )
        .into());
    }
    Ok(())
}

/// Attaches editors to notes with a single user lookup.
pub(crate) async fn note_views(state: &AppState, notes: Vec<Note>) -> ApiResult<Vec<NoteView>> {
    let mut ids: Vec<UserId> = notes.iter().map(|n| n.edited_by).collect();
    ids.sort_unstable();
    ids.dedup();
    let users: HashMap<UserId, User> = state
        .repository()
        .get_users(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    notes
        .into_iter()
        .map(|note| -> ApiResult<NoteView> {
            let editor = users.get(&note.edited_by).cloned().ok_or_else(|| {
                ApiError::Internal(format!("note {} edited by unknown user {}", note.id, note.edited_by))
            })?;
            Ok(NoteView { note, editor })
        })
        .collect()
}

pub(crate) async fn note_view(state: &AppState, note: Note) -> ApiResult<NoteView> {
    let editor = state.repository().get_user(note.edited_by).await?;
    Ok(NoteView { note, editor })
}

/// A group with its note count, and its notes when `with_notes` is set.
pub(crate) async fn group_view(
    state: &AppState,
    group: Group,
    with_notes: bool,
) -> ApiResult<GroupView> {
    let parent = group.note_parent();
    let (notes, note_count) = if with_notes {
        let notes = note_views(state, state.notes().list(parent).await?).await?;
        let count = notes.len();
        (notes, count)
    } else {
        (Vec::new(), state.notes().count(parent).await?)
    };
    Ok(GroupView {
        group,
        notes,
        note_count,
    })
}

/// A board with owner and members resolved.
///
/// Detail views carry the board's notes and its groups (with note counts);
/// list views only carry the counts.
pub(crate) async fn board_view(state: &AppState, board: Board, detail: bool) -> ApiResult<BoardView> {
    let repo = state.repository();
    let members = repo.get_users(&board.members).await?;
    let owner = match members.iter().find(|u| u.id == board.owner) {
        Some(owner) => owner.clone(),
        None => repo.get_user(board.owner).await?,
    };

    let parent = NoteParent::from(board.id);
    let groups = repo.list_groups(board.id).await?;
    let group_count = groups.len();

    let (notes, note_count, groups) = if detail {
        let notes = note_views(state, state.notes().list(parent).await?).await?;
        let count = notes.len();
        let mut views = Vec::with_capacity(groups.len());
        for group in groups {
            views.push(group_view(state, group, false).await?);
        }
        (notes, count, views)
    } else {
        (Vec::new(), state.notes().count(parent).await?, Vec::new())
    };

    Ok(BoardView {
        board,
        owner,
        members,
        notes,
        groups,
        note_count,
        group_count,
    })
}

/// Renders one resource, turning link failures into API errors.
pub(crate) fn render(state: &AppState, schema: &Schema, entity: &dyn Resource) -> ApiResult<Value> {
    Ok(schema.represent(entity, state.hrefs())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_id_not_found() {
        assert!(matches!(path_id::<BoardId>("abc"), Err(ApiError::NotFound)));
        assert_eq!(path_id::<BoardId>("12").unwrap(), BoardId(12));
    }
}
