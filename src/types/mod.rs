//! Domain types

pub mod chat;
pub mod document;
pub mod identity;
pub mod quiz;

pub use chat::{ChatRole, Conversation, Message, SendOutcome};
pub use document::{ChunkText, Document, MediaType, SegmentStatus};
pub use identity::Identity;
pub use quiz::{Question, Quiz};
