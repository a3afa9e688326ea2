//! User lookup.
//!
//! Accounts are managed by the identity provider; this service only exposes
//! them so that `owner`, `members` and `edited_by` links resolve.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde_json::Value;

use planner_core::UserId;

use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::state::AppState;

use super::{path_id, render};

/// GET /users/{pk}/
async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(pk): Path<String>,
) -> ApiResult<Json<Value>> {
    let id: UserId = path_id(&pk)?;
    let user = state.repository().get_user(id).await?;
    Ok(Json(render(&state, &state.schemas().user, &user)?))
}

/// Build user routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{pk}/", get(get_user))
}
