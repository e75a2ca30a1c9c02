//! User service
//!
//! Registration, login and logout. Login mints a token through the
//! `TokenValidator` and stores it as the user's only session, which revokes
//! any token issued before.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::db::StoreError;
use crate::models::{Session, User, UserType};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::TokenValidator;
use anyhow::Context;
use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;

/// Default token lifetime in hours
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 72;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Email already registered
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub user_type: UserType,
}

/// Input for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    tokens: Arc<TokenValidator>,
    token_ttl: Duration,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        tokens: Arc<TokenValidator>,
    ) -> Self {
        Self::with_token_ttl(
            user_repo,
            session_repo,
            tokens,
            Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        )
    }

    pub fn with_token_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        tokens: Arc<TokenValidator>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            tokens,
            token_ttl,
        }
    }

    /// Register a new user.
    ///
    /// The password is trimmed before hashing. A taken email surfaces from the
    /// unique constraint as `UserExists`.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let name = input.name.trim();
        let email = input.email.trim();
        let password = input.password.trim();

        if name.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Name cannot be empty".to_string(),
            ));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "A valid email is required".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }

        let password_hash = hash_password(password).context("Failed to hash password")?;
        let user = User::new(
            name.to_string(),
            email.to_string(),
            password_hash,
            input.user_type,
        );

        match self.user_repo.create(&user).await {
            Ok(created) => {
                tracing::info!(user_id = created.id, "User registered");
                Ok(created)
            }
            Err(StoreError::Conflict(_)) => Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials and start a new session, returning the bearer token.
    pub async fn login(&self, input: LoginInput) -> Result<String, UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid credentials".to_string());

        let user = self
            .user_repo
            .get_by_email(input.email.trim())
            .await?
            .ok_or_else(invalid)?;

        let valid = verify_password(input.password.trim(), &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(invalid());
        }

        let issued = self
            .tokens
            .issue(user.id, self.token_ttl)
            .context("Failed to generate token")?;

        self.session_repo
            .upsert(&Session::new(user.id, issued.token.clone(), issued.expires_at))
            .await?;

        tracing::debug!(user_id = user.id, "User logged in");
        Ok(issued.token)
    }

    /// Clear the user's session token
    pub async fn logout(&self, user_id: i64) -> Result<(), UserServiceError> {
        self.session_repo.clear(user_id).await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::services::token::AuthError;

    async fn setup() -> (UserService, Arc<TokenValidator>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let tokens = Arc::new(TokenValidator::new("secret", sessions.clone()));
        let service = UserService::new(SqlxUserRepository::boxed(pool), sessions, tokens.clone());
        (service, tokens)
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            name: "Grace".to_string(),
            email: email.to_string(),
            password: "  hunter2  ".to_string(),
            user_type: UserType::Tutor,
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let (service, tokens) = setup().await;
        let user = service.register(register_input("g@example.com")).await.unwrap();
        assert_eq!(user.user_type, UserType::Tutor);

        // Stored password is the trimmed one
        let token = service
            .login(LoginInput {
                email: "g@example.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(tokens.validate(&token).await.unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let (service, _) = setup().await;
        service.register(register_input("g@example.com")).await.unwrap();

        let err = service
            .register(register_input("g@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::UserExists(_)));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (service, _) = setup().await;
        let mut input = register_input("not-an-email");
        assert!(matches!(
            service.register(input.clone()).await,
            Err(UserServiceError::ValidationError(_))
        ));

        input.email = "ok@example.com".to_string();
        input.password = "   ".to_string();
        assert!(matches!(
            service.register(input).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_login_wrong_password_or_unknown_email() {
        let (service, _) = setup().await;
        service.register(register_input("g@example.com")).await.unwrap();

        for (email, password) in [("g@example.com", "nope"), ("x@example.com", "hunter2")] {
            let err = service
                .login(LoginInput {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, UserServiceError::AuthenticationError(_)));
        }
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let (service, tokens) = setup().await;
        let user = service.register(register_input("g@example.com")).await.unwrap();
        let token = service
            .login(LoginInput {
                email: "g@example.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap();

        service.logout(user.id).await.unwrap();
        assert!(matches!(
            tokens.validate(&token).await,
            Err(AuthError::Revoked)
        ));
    }
}
