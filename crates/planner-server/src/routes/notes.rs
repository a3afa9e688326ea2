//! Note routes.
//!
//! Notes are addressed by a client-chosen UUIDv4, so PUT both creates and
//! replaces. Board notes and group notes are separate collections.
//!
//! - PUT/DELETE /notes/boards/{pk}/notes/{note}/
//! - PUT/DELETE /notes/boards/{pk}/groups/{g}/notes/{note}/

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::put,
};
use serde_json::{Map, Value};

use planner_core::{
    BoardAction, NoteId, NoteParent, Schema, UserId, WriteContext, WriteMode,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::{CurrentUser, JsonPayload};
use crate::state::AppState;

use super::{board_for, group_for, note_view, path_id, render};

/// The path id always wins over an `id` in the body.
fn with_path_id(payload: Value, id: &str) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.insert("id".to_string(), Value::from(id));
            Value::Object(map)
        }
        Value::Null => {
            let mut map = Map::new();
            map.insert("id".to_string(), Value::from(id));
            Value::Object(map)
        }
        other => other,
    }
}

/// Validates and stores a note, then renders it with `schema`.
async fn put_note(
    state: &AppState,
    parent: NoteParent,
    user: UserId,
    raw_id: &str,
    payload: Value,
    schema: &Arc<Schema>,
) -> ApiResult<Json<Value>> {
    let data = state.schemas().note_write.validate(
        &with_path_id(payload, raw_id),
        &WriteContext::new(user),
        WriteMode::Full,
    )?;

    let id = data
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| NoteId::parse_v4(s).ok())
        .ok_or_else(|| ApiError::Internal("validated note has no id".into()))?;
    let content = data.get("content").and_then(Value::as_str).unwrap_or_default();

    let note = state.notes().upsert(parent, id, content, user).await?;
    let view = note_view(state, note).await?;
    Ok(Json(render(state, schema, &view)?))
}

/// Deletes a note; ids that are not UUIDv4 cannot exist.
async fn delete_note(state: &AppState, parent: NoteParent, raw_id: &str) -> ApiResult<StatusCode> {
    let id = NoteId::parse_v4(raw_id).map_err(|_| ApiError::NotFound)?;
    state.notes().delete(parent, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /notes/boards/{pk}/notes/{note}/
async fn put_board_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((pk, note)): Path<(String, String)>,
    JsonPayload(payload): JsonPayload,
) -> ApiResult<Json<Value>> {
    let board = board_for(&state, path_id(&pk)?, user.id(), BoardAction::EditContent).await?;
    let schema = state.schemas().board_note.clone();
    put_note(&state, board.id.into(), user.id(), &note, payload, &schema).await
}

/// DELETE /notes/boards/{pk}/notes/{note}/
async fn delete_board_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((pk, note)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let board = board_for(&state, path_id(&pk)?, user.id(), BoardAction::EditContent).await?;
    delete_note(&state, board.id.into(), &note).await
}

/// PUT /notes/boards/{pk}/groups/{g}/notes/{note}/
async fn put_group_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((pk, g, note)): Path<(String, String, String)>,
    JsonPayload(payload): JsonPayload,
) -> ApiResult<Json<Value>> {
    let group = group_for(
        &state,
        path_id(&pk)?,
        path_id(&g)?,
        user.id(),
        BoardAction::EditContent,
    )
    .await?;
    let schema = state.schemas().group_note.clone();
    put_note(&state, group.note_parent(), user.id(), &note, payload, &schema).await
}

/// DELETE /notes/boards/{pk}/groups/{g}/notes/{note}/
async fn delete_group_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((pk, g, note)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let group = group_for(
        &state,
        path_id(&pk)?,
        path_id(&g)?,
        user.id(),
        BoardAction::EditContent,
    )
    .await?;
    delete_note(&state, group.note_parent(), &note).await
}

/// Build note routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notes/boards/{pk}/notes/{note}/",
            put(put_board_note).delete(delete_board_note),
        )
        .route(
            "/notes/boards/{pk}/groups/{g}/notes/{note}/",
            put(put_group_note).delete(delete_group_note),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_id_overrides_body() {
        let body = serde_json::json!({"id": "other", "content": "x"});
        let merged = with_path_id(body, "abc");
        assert_eq!(merged["id"], "abc");
        assert_eq!(merged["content"], "x");

        assert_eq!(with_path_id(Value::Null, "abc")["id"], "abc");
        assert_eq!(with_path_id(serde_json::json!([1]), "abc"), serde_json::json!([1]));
    }
}
