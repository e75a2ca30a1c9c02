//! Student profile API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Student, StudentInput, UpdateStudentInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route(
            "/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
}

async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Student>>, ApiError> {
    Ok(Json(state.profile_service.list_students().await?))
}

async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Student>, ApiError> {
    Ok(Json(state.profile_service.get_student(id).await?))
}

async fn create_student(
    State(state): State<AppState>,
    Json(body): Json<StudentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let student = state.profile_service.create_student(body).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStudentInput>,
) -> Result<Json<Student>, ApiError> {
    Ok(Json(state.profile_service.update_student(id, body).await?))
}

async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.profile_service.delete_student(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
