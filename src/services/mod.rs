//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They
//! validate input, apply business rules and translate store errors into
//! their own typed errors.

pub mod chat;
pub mod password;
pub mod profile;
pub mod token;
pub mod user;

pub use chat::{ChatService, ChatServiceError};
pub use password::{hash_password, verify_password};
pub use profile::{ProfileService, ProfileServiceError};
pub use token::{AuthError, Claims, IssuedToken, TokenValidator};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
