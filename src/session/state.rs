//! Conversation state owned by one session coordinator.
//!
//! DESIGN
//! ======
//! The transcript is append-only. Messages are never edited or reordered
//! once pushed, and `created_at` never goes backwards within a session.
//! The unsent input buffer is deliberately absent: it belongs to the
//! presentation layer.

use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// CHAT MESSAGE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

impl Origin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One committed transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Stable row key for renderers.
    pub id: Uuid,
    pub content: String,
    pub origin: Origin,
    pub created_at: OffsetDateTime,
}

// =============================================================================
// CONVERSATION STATE
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub transcript: Vec<ChatMessage>,
    /// Whether a transcription session is active. Independent of pending requests.
    pub listening: bool,
    /// Most recent raw completion text. Informational only; de-duplication
    /// checks the transcript itself.
    pub last_assistant_reply: Option<String>,
    /// Completion requests dispatched but not yet resolved.
    pub pending_completions: usize,
}

impl ConversationState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    #[must_use]
    pub fn has_assistant_message(&self, content: &str) -> bool {
        self.transcript
            .iter()
            .any(|m| m.origin == Origin::Assistant && m.content == content)
    }

    /// Push a message at the tail with a non-decreasing timestamp.
    pub(crate) fn push(&mut self, origin: Origin, content: String) -> ChatMessage {
        let now = OffsetDateTime::now_utc();
        let created_at = self
            .transcript
            .last()
            .map_or(now, |last| now.max(last.created_at));
        let message = ChatMessage { id: Uuid::new_v4(), content, origin, created_at };
        self.transcript.push(message.clone());
        message
    }
}

// =============================================================================
// SESSION EVENT
// =============================================================================

/// Notifications for the presentation layer, in transcript order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message was committed; renderers scroll to it.
    Appended(ChatMessage),
    ListeningChanged(bool),
    /// Toast-style diagnostic, never part of the transcript.
    Notice(String),
}
