//! User API endpoints
//!
//! - GET /api/v1/users/me - Dashboard of the signed-in user

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Dashboard;

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(dashboard))
}

async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Dashboard>, ApiError> {
    let account = state.user_service.get_by_id(user.user_id).await?;
    let chats = state.chat_service.summaries_for_user(user.user_id).await?;
    Ok(Json(Dashboard::new(&account, chats)))
}
