use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    state::AppState,
    users::{
        dto::{CreateUserRequest, UpdatePasswordRequest, UpdateUserRequest, UserResponse},
        error::UserError,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users).post(create_user))
        .route(
            "/user/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/user/:user_id/password", put(update_password))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, UserError> {
    Ok(Json(state.users.list_users().await?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, UserError> {
    Ok(Json(state.users.get_user(user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<StatusCode, UserError> {
    state.users.create_user(payload).await?;
    Ok(StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<StatusCode, UserError> {
    state.users.update_user(user_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<StatusCode, UserError> {
    state.users.update_password(user_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, UserError> {
    state.users.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
