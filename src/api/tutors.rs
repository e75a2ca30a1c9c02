//! Tutor profile API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Tutor, TutorInput, UpdateTutorInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tutors).post(create_tutor))
        .route("/{id}", get(get_tutor).put(update_tutor).delete(delete_tutor))
}

async fn list_tutors(State(state): State<AppState>) -> Result<Json<Vec<Tutor>>, ApiError> {
    Ok(Json(state.profile_service.list_tutors().await?))
}

async fn get_tutor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Tutor>, ApiError> {
    Ok(Json(state.profile_service.get_tutor(id).await?))
}

async fn create_tutor(
    State(state): State<AppState>,
    Json(body): Json<TutorInput>,
) -> Result<impl IntoResponse, ApiError> {
    let tutor = state.profile_service.create_tutor(body).await?;
    Ok((StatusCode::CREATED, Json(tutor)))
}

async fn update_tutor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTutorInput>,
) -> Result<Json<Tutor>, ApiError> {
    Ok(Json(state.profile_service.update_tutor(id, body).await?))
}

async fn delete_tutor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.profile_service.delete_tutor(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
