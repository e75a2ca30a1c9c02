//! tutorhub - Tutoring marketplace backend
//!
//! Accounts, tutor and student profiles, persisted chats, and a real-time
//! chat gateway that fans every stored message out to open sockets.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod realtime;
pub mod services;
