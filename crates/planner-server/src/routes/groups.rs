//! Group routes. Any board member may manage groups.
//!
//! - GET /notes/boards/{pk}/groups/ - Groups of a board with note counts
//! - POST /notes/boards/{pk}/groups/ - Create a group
//! - GET /notes/boards/{pk}/groups/{g}/ - Group with its notes
//! - PATCH /notes/boards/{pk}/groups/{g}/ - Change title and/or color
//! - DELETE /notes/boards/{pk}/groups/{g}/?cascade= - Delete the group; its
//!   notes are deleted with `cascade=true`, otherwise moved to the board

use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Map, Value};

use planner_core::{
    BoardAction, BoardId, GroupId, HexColor, Resource, ValidationError, WriteContext, WriteMode,
    representation::parse_bool,
};
use planner_store::{GroupChanges, GroupNotesOutcome, NewGroup};

use crate::error::{ApiError, ApiResult};
use crate::extract::{CurrentUser, JsonPayload};
use crate::state::AppState;

use super::{board_for, group_for, group_view, path_id, render};

fn title_of(data: &Map<String, Value>) -> Option<String> {
    data.get("title").and_then(Value::as_str).map(str::to_string)
}

fn color_of(data: &Map<String, Value>) -> Option<HexColor> {
    data.get("color")
        .and_then(Value::as_i64)
        .and_then(HexColor::from_packed)
}

/// Reads the `cascade` query flag; absent means move.
fn cascade_flag(query: Option<&str>) -> Result<bool, ValidationError> {
    let raw = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "cascade")
            .map(|(_, v)| v.into_owned())
    });
    match raw {
        None => Ok(false),
        Some(v) => parse_bool(&v).ok_or_else(|| {
            ValidationError::field("cascade", "invalid", "Must be a valid boolean.")
        }),
    }
}

/// GET /notes/boards/{pk}/groups/
async fn list_groups(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pk): Path<String>,
) -> ApiResult<Json<Value>> {
    let board = board_for(&state, path_id(&pk)?, user.id(), BoardAction::View).await?;

    let mut views = Vec::new();
    for group in state.repository().list_groups(board.id).await? {
        views.push(group_view(&state, group, false).await?);
    }
    let body = state
        .schemas()
        .group_list
        .represent_many(views.iter().map(|v| v as &dyn Resource), state.hrefs())?;
    Ok(Json(body))
}

/// POST /notes/boards/{pk}/groups/
async fn create_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pk): Path<String>,
    JsonPayload(payload): JsonPayload,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let board = board_for(&state, path_id(&pk)?, user.id(), BoardAction::EditContent).await?;

    let data = state.schemas().group_list.validate(
        &payload,
        &WriteContext::new(user.id()),
        WriteMode::Full,
    )?;
    let (Some(title), Some(color)) = (title_of(&data), color_of(&data)) else {
        return Err(ApiError::Internal("validated group is incomplete".into()));
    };

    let group = state
        .repository()
        .insert_group(&NewGroup {
            board: board.id,
            title,
            color,
        })
        .await?;
    tracing::info!(board_id = %board.id, group_id = %group.id, "Created group");

    let view = group_view(&state, group, true).await?;
    Ok((
        StatusCode::CREATED,
        Json(render(&state, &state.schemas().group_detail, &view)?),
    ))
}

/// GET /notes/boards/{pk}/groups/{g}/
async fn get_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((pk, g)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let group = group_for(&state, path_id(&pk)?, path_id(&g)?, user.id(), BoardAction::View).await?;
    let view = group_view(&state, group, true).await?;
    Ok(Json(render(&state, &state.schemas().group_detail, &view)?))
}

/// PATCH /notes/boards/{pk}/groups/{g}/
async fn update_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((pk, g)): Path<(String, String)>,
    JsonPayload(payload): JsonPayload,
) -> ApiResult<Json<Value>> {
    let board: BoardId = path_id(&pk)?;
    let id: GroupId = path_id(&g)?;
    let mut group = group_for(&state, board, id, user.id(), BoardAction::EditContent).await?;

    let data = state.schemas().group_list.validate(
        &payload,
        &WriteContext::new(user.id()),
        WriteMode::Partial,
    )?;
    let changes = GroupChanges {
        title: title_of(&data),
        color: color_of(&data),
    };
    if !changes.is_empty() {
        group = state.repository().update_group(board, id, &changes).await?;
        tracing::info!(board_id = %board, group_id = %id, "Updated group");
    }

    let view = group_view(&state, group, true).await?;
    Ok(Json(render(&state, &state.schemas().group_detail, &view)?))
}

/// DELETE /notes/boards/{pk}/groups/{g}/
///
/// The notes are dealt with before the group row is removed, so an
/// interrupted request can be retried.
async fn delete_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((pk, g)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> ApiResult<StatusCode> {
    let cascade = cascade_flag(query.as_deref())?;
    let board: BoardId = path_id(&pk)?;
    let id: GroupId = path_id(&g)?;
    let group = group_for(&state, board, id, user.id(), BoardAction::EditContent).await?;

    match state.notes().destroy_group(&group, cascade).await? {
        GroupNotesOutcome::Deleted(n) => {
            tracing::info!(group_id = %id, deleted = n, "Group notes deleted")
        }
        GroupNotesOutcome::Moved(n) => {
            tracing::info!(group_id = %id, moved = n, "Group notes moved to board")
        }
    }

    state.repository().delete_group(board, id).await?;
    tracing::info!(board_id = %board, group_id = %id, cascade, "Deleted group");
    Ok(StatusCode::NO_CONTENT)
}

/// Build group routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notes/boards/{pk}/groups/",
            get(list_groups).post(create_group),
        )
        .route(
            "/notes/boards/{pk}/groups/{g}/",
            get(get_group).patch(update_group).delete(delete_group),
        )
}
