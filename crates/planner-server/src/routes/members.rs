//! Board membership routes (owner only).
//!
//! - PUT /notes/boards/{pk}/members/ - Add users; existing members are kept
//! - DELETE /notes/boards/{pk}/members/ - Remove users; the owner cannot be removed
//!
//! Both take `{"members": [ids]}` and answer with the full member list.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use serde_json::Value;

use planner_core::{BoardAction, BoardId, WriteContext, WriteMode, check_member_removal};

use crate::error::ApiResult;
use crate::extract::{CurrentUser, JsonPayload};
use crate::schemas::user_ids;
use crate::state::AppState;
use crate::views::MembersView;

use super::{board_for, path_id, render, require_users};

async fn members_response(state: &AppState, board: &planner_core::Board) -> ApiResult<Json<Value>> {
    let view = MembersView {
        members: state.repository().get_users(&board.members).await?,
    };
    Ok(Json(render(state, &state.schemas().members, &view)?))
}

/// PUT /notes/boards/{pk}/members/
async fn add_members(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pk): Path<String>,
    JsonPayload(payload): JsonPayload,
) -> ApiResult<Json<Value>> {
    let id: BoardId = path_id(&pk)?;
    board_for(&state, id, user.id(), BoardAction::ManageMembers).await?;

    let data = state.schemas().member_write.validate(
        &payload,
        &WriteContext::new(user.id()),
        WriteMode::Full,
    )?;
    let added = user_ids(&data, "members");
    require_users(&state, &added).await?;

    let board = state.repository().add_members(id, &added).await?;
    tracing::info!(board_id = %id, count = added.len(), "Added board members");
    members_response(&state, &board).await
}

/// DELETE /notes/boards/{pk}/members/
async fn remove_members(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pk): Path<String>,
    JsonPayload(payload): JsonPayload,
) -> ApiResult<Json<Value>> {
    let id: BoardId = path_id(&pk)?;
    let board = board_for(&state, id, user.id(), BoardAction::ManageMembers).await?;

    let data = state.schemas().member_write.validate(
        &payload,
        &WriteContext::new(user.id()),
        WriteMode::Full,
    )?;
    let removed = user_ids(&data, "members");
    require_users(&state, &removed).await?;
    check_member_removal(&board, &removed)?;

    let board = state.repository().remove_members(id, &removed).await?;
    tracing::info!(board_id = %id, count = removed.len(), "Removed board members");
    members_response(&state, &board).await
}

/// Build membership routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/notes/boards/{pk}/members/",
        put(add_members).delete(remove_members),
    )
}
