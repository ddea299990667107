use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use murmur_types::api::CreateUserRequest;
use murmur_types::models::User;

use crate::convert;
use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let username = req
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::validation("Username is required"))?;

    let created = run_db(&state.db, move |db| db.create_user(&username))
        .await?
        .ok_or_else(|| ApiError::Conflict("Username already exists".into()))?;

    info!("User {} registered as '{}'", created.id, created.username);
    Ok((StatusCode::CREATED, Json(convert::user(created))))
}

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let rows = run_db(&state.db, |db| db.list_users()).await?;
    Ok(Json(rows.into_iter().map(convert::user).collect()))
}
