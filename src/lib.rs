//! # lawassist
//!
//! Terminal chat assistant answering questions about Indian laws,
//! government schemes and accessibility services.
//!
//! The crate is organized around one `SessionCoordinator` per conversation.
//! Typed text and recognized speech both reach it as user messages; replies
//! come from an OpenAI-compatible chat-completions endpoint. A local SQLite
//! catalog of laws is searchable independently of the chat.

pub mod console;
pub mod db;
pub mod llm;
pub mod services;
pub mod session;
pub mod transcription;
