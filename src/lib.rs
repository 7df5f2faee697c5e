//! KolOS backend: study-document ingestion, retrieval, and generation
//!
//! This crate turns uploaded study documents (PDF, DOCX, plain text, images)
//! into owner-scoped retrievable chunks, and serves chat and quiz endpoints
//! grounded in that retrieved context. Object storage, the vector index, and
//! the completion API are external collaborators reached through narrow
//! provider traits.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod extraction;
pub mod index;
pub mod providers;
pub mod quiz;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use types::{
    chat::{ChatRole, Conversation, Message, SendOutcome},
    document::{Document, MediaType},
    identity::Identity,
    quiz::{Question, Quiz},
};
