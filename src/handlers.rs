use crate::{
    AppState,
    errors::AppError,
    models::{LoginRequest, RegisterRequest, ToggleSavedMemeRequest},
    session::AuthUser,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing;

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    tracing::debug!(username = %request.username, "Registration request");
    let response = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let response = state.auth.login(request).await?;
    Ok(Json(response))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.auth.current_user(user.id()).await?;
    Ok(Json(profile))
}

pub async fn list_saved_memes(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let memes = state.saved_memes.list(user.id()).await?;
    tracing::debug!(user_id = %user.id(), count = memes.len(), "Listed saved memes");
    Ok(Json(memes))
}

/// 201 with the new item when the meme becomes saved, 200 when it is removed.
pub async fn toggle_saved_meme(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<ToggleSavedMemeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let outcome = state.saved_memes.toggle(user.id(), request).await?;
    let status = if outcome.saved { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(outcome)))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "service": "memogram-api" }))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "Not found" })))
}
