//! Board routes.
//!
//! - GET /notes/boards/ - Boards the user belongs to, oldest first
//! - POST /notes/boards/ - Create a board owned by the user
//! - GET /notes/boards/{pk}/ - Board with its notes and groups
//! - PATCH /notes/boards/{pk}/ - Rename a board (owner only)
//! - DELETE /notes/boards/{pk}/ - Delete a board and its notes (owner only)

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::Value;

use planner_core::{BoardAction, BoardId, NoteParent, Resource, WriteContext, WriteMode};
use planner_store::NewBoard;

use crate::error::{ApiError, ApiResult};
use crate::extract::{CurrentUser, JsonPayload};
use crate::schemas::user_ids;
use crate::state::AppState;

use super::{board_for, board_view, path_id, render, require_users};

/// GET /notes/boards/
async fn list_boards(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Value>> {
    let boards = state.repository().list_boards_for(user.id()).await?;

    let mut views = Vec::with_capacity(boards.len());
    for board in boards {
        views.push(board_view(&state, board, false).await?);
    }

    let body = state
        .schemas()
        .board_list
        .represent_many(views.iter().map(|v| v as &dyn Resource), state.hrefs())?;
    Ok(Json(body))
}

/// POST /notes/boards/
async fn create_board(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonPayload(payload): JsonPayload,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let ctx = WriteContext::new(user.id());
    let data = state
        .schemas()
        .board_create
        .validate(&payload, &ctx, WriteMode::Full)?;

    let members = user_ids(&data, "members");
    require_users(&state, &members).await?;

    let title = data
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Internal("validated board has no title".into()))?;
    let board = state
        .repository()
        .insert_board(&NewBoard {
            title: title.to_string(),
            owner: user.id(),
            members,
        })
        .await?;
    tracing::info!(board_id = %board.id, owner = %board.owner, "Created board");

    let view = board_view(&state, board, true).await?;
    Ok((
        StatusCode::CREATED,
        Json(render(&state, &state.schemas().board_detail, &view)?),
    ))
}

/// GET /notes/boards/{pk}/
async fn get_board(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pk): Path<String>,
) -> ApiResult<Json<Value>> {
    let board = board_for(&state, path_id(&pk)?, user.id(), BoardAction::View).await?;
    let view = board_view(&state, board, true).await?;
    Ok(Json(render(&state, &state.schemas().board_detail, &view)?))
}

/// PATCH /notes/boards/{pk}/
async fn update_board(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pk): Path<String>,
    JsonPayload(payload): JsonPayload,
) -> ApiResult<Json<Value>> {
    let mut board = board_for(&state, path_id(&pk)?, user.id(), BoardAction::ChangeSettings).await?;

    let data = state.schemas().board_detail.validate(
        &payload,
        &WriteContext::new(user.id()),
        WriteMode::Partial,
    )?;
    if let Some(title) = data.get("title").and_then(Value::as_str) {
        board = state.repository().update_board_title(board.id, title).await?;
        tracing::info!(board_id = %board.id, "Renamed board");
    }

    let view = board_view(&state, board, true).await?;
    Ok(Json(render(&state, &state.schemas().board_detail, &view)?))
}

/// DELETE /notes/boards/{pk}/
///
/// Notes live outside the relational store, so they are purged first when
/// configured; a failure leaves the board in place.
async fn delete_board(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pk): Path<String>,
) -> ApiResult<StatusCode> {
    let id: BoardId = path_id(&pk)?;
    board_for(&state, id, user.id(), BoardAction::ChangeSettings).await?;

    if state.config().purge_notes_on_board_delete {
        let mut purged = state.notes().purge(NoteParent::from(id)).await?;
        for group in state.repository().list_groups(id).await? {
            purged += state.notes().purge(group.note_parent()).await?;
        }
        tracing::debug!(board_id = %id, purged, "Purged board notes");
    }

    state.repository().delete_board(id).await?;
    tracing::info!(board_id = %id, "Deleted board");
    Ok(StatusCode::NO_CONTENT)
}

/// Build board routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notes/boards/", get(list_boards).post(create_board))
        .route(
            "/notes/boards/{pk}/",
            get(get_board).patch(update_board).delete(delete_board),
        )
}
