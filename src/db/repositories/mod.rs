//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a specific entity.

pub mod chat;
pub mod message;
pub mod session;
pub mod student;
pub mod tutor;
pub mod user;

pub use chat::{ChatRepository, SqlxChatRepository};
pub use message::{MessageRepository, SqlxMessageRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use student::{SqlxStudentRepository, StudentRepository};
pub use tutor::{SqlxTutorRepository, TutorRepository};
pub use user::{SqlxUserRepository, UserRepository};
