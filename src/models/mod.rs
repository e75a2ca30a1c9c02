//! Data models
//!
//! Database entities (User, Session, Tutor, Student, Chat, Message) and the
//! input types used to create or update them.

mod chat;
mod profile;
mod session;
mod user;

pub use chat::{Chat, ChatSummary, ChatWithMessages, Message, NewMessage};
pub use profile::{
    Student, StudentInput, Tutor, TutorInput, UpdateStudentInput, UpdateTutorInput,
};
pub use session::Session;
pub use user::{Dashboard, User, UserType};
