//! API middleware
//!
//! Contains:
//! - `AppState`, the shared services handed to every handler
//! - `ApiError`, the JSON error envelope and its status mapping
//! - Bearer token extraction and the `require_auth` middleware

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxChatRepository, SqlxMessageRepository, SqlxSessionRepository, SqlxStudentRepository,
    SqlxTutorRepository, SqlxUserRepository,
};
use crate::realtime::{ChatGateway, GatewaySettings};
use crate::services::{
    AuthError, ChatService, ChatServiceError, ProfileService, ProfileServiceError,
    TokenValidator, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub tokens: Arc<TokenValidator>,
    pub user_service: Arc<UserService>,
    pub chat_service: Arc<ChatService>,
    pub profile_service: Arc<ProfileService>,
    pub gateway: Arc<ChatGateway>,
}

impl AppState {
    /// Wire repositories, services and the chat gateway over one pool
    pub fn new(pool: crate::db::DynDatabasePool, config: &Config) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let messages = SqlxMessageRepository::boxed(pool.clone());

        let tokens = Arc::new(TokenValidator::new(
            config.auth.jwt_secret.clone(),
            sessions.clone(),
        ));
        let user_service = Arc::new(UserService::with_token_ttl(
            users.clone(),
            sessions,
            tokens.clone(),
            chrono::Duration::hours(config.auth.token_ttl_hours),
        ));
        let chat_service = Arc::new(ChatService::new(
            SqlxChatRepository::boxed(pool.clone()),
            messages.clone(),
            users,
        ));
        let profile_service = Arc::new(ProfileService::new(
            SqlxTutorRepository::boxed(pool.clone()),
            SqlxStudentRepository::boxed(pool.clone()),
        ));
        let gateway = Arc::new(ChatGateway::new(
            messages,
            GatewaySettings::from(&config.chat),
        ));

        Self {
            pool,
            tokens,
            user_service,
            chat_service,
            profile_service,
            gateway,
        }
    }
}

/// Authenticated caller, inserted by `require_auth`
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" | "TOKEN_INVALID" | "TOKEN_EXPIRED" | "TOKEN_REVOKED" => {
                StatusCode::UNAUTHORIZED
            }
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if let AuthError::Store(e) = &err {
            tracing::error!(error = %e, "Session lookup failed");
            return ApiError::internal_error("Session lookup failed");
        }
        ApiError::new(err.code(), err.to_string())
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::NotFound => ApiError::not_found("User not found"),
            other => {
                tracing::error!(error = %other, "User service failure");
                ApiError::internal_error(other.to_string())
            }
        }
    }
}

impl From<ChatServiceError> for ApiError {
    fn from(err: ChatServiceError) -> Self {
        match err {
            ChatServiceError::NotFound(_) => ApiError::not_found("Chat not found"),
            ChatServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ChatServiceError::NotParticipant { .. } => ApiError::forbidden(err.to_string()),
            ChatServiceError::Store(e) => {
                tracing::error!(error = %e, "Chat service failure");
                ApiError::internal_error(e.to_string())
            }
        }
    }
}

impl From<ProfileServiceError> for ApiError {
    fn from(err: ProfileServiceError) -> Self {
        match err {
            ProfileServiceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ProfileServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ProfileServiceError::Store(e) => {
                tracing::error!(error = %e, "Profile service failure");
                ApiError::internal_error(e.to_string())
            }
        }
    }
}

/// Bearer token from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Token from the `token` query parameter. Browsers cannot set headers on
/// WebSocket handshakes.
pub fn query_token(uri: &Uri) -> Option<String> {
    uri.query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user_id = state.tokens.validate(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser { user_id });
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")).as_deref(), Some("abc.def"));
        assert!(bearer_token(&headers_with("Basic abc")).is_none());
        assert!(bearer_token(&headers_with("Bearer ")).is_none());
        assert!(bearer_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_query_token() {
        let uri: Uri = "/api/v1/chats/ws?foo=1&token=abc.def.ghi".parse().unwrap();
        assert_eq!(query_token(&uri).as_deref(), Some("abc.def.ghi"));

        let uri: Uri = "/ws?token=".parse().unwrap();
        assert!(query_token(&uri).is_none());
        let uri: Uri = "/ws".parse().unwrap();
        assert!(query_token(&uri).is_none());
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        for err in [AuthError::InvalidFormat, AuthError::Expired, AuthError::Revoked] {
            let api: ApiError = err.into();
            assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
        }
        let api: ApiError = AuthError::Store(StoreError::NotFound("x".into())).into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_service_errors_map_to_status() {
        let api: ApiError = UserServiceError::UserExists("taken".into()).into();
        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.error.code, "CONFLICT");

        let api: ApiError = ChatServiceError::NotParticipant {
            chat_id: 1,
            sender_id: 2,
        }
        .into();
        assert_eq!(api.status(), StatusCode::FORBIDDEN);

        let api: ApiError = ProfileServiceError::NotFound("Tutor").into();
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
    }
}
