//! Session coordinator: the single owner of conversation state.
//!
//! ARCHITECTURE
//! ============
//! Typed input and recognized speech converge on one append path: append a
//! `User` message, then dispatch the prompt to the completer on its own
//! task. Each resolved completion comes back through the same reply path,
//! which drops empty replies and replies already present as an `Assistant`
//! message.
//!
//! State lives in a `watch` channel. Every mutation goes through
//! `send_modify`, which holds the channel's write lock, so appends from
//! concurrent completion tasks are serialized and never lost. Presentation
//! reads snapshots (`subscribe`) and incremental events (`events`); the
//! broadcast is emitted under the same lock so event order equals
//! transcript order.
//!
//! TRADE-OFFS
//! ==========
//! Completion tasks run to completion even if the presentation goes away;
//! their replies still land in the transcript. The transcription pump holds
//! only a weak reference, so dropping the last coordinator handle tears
//! down the voice session.

pub mod state;

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::completion::Completer;
use crate::services::laws::{LawRecord, LawStore, NewLaw};
use crate::transcription::{
    Generation, SpeechRecognizer, TranscriptionEvent, TranscriptionSource, TranscriptionUpdate, UNAVAILABLE_NOTICE,
};

pub use state::{ChatMessage, ConversationState, Origin, SessionEvent};

pub const GREETING: &str = "I'm LawAssist, your AI assistant for laws, government schemes, and services in India.";

const EVENT_CAPACITY: usize = 256;

// =============================================================================
// COORDINATOR
// =============================================================================

/// Cheap to clone; all clones share one conversation.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<ConversationState>,
    events: broadcast::Sender<SessionEvent>,
    completer: Arc<dyn Completer>,
    laws: Arc<dyn LawStore>,
    greeting: String,
    voice: Mutex<Option<TranscriptionSource>>,
}

impl SessionCoordinator {
    #[must_use]
    pub fn new(completer: Arc<dyn Completer>, laws: Arc<dyn LawStore>) -> Self {
        Self::with_greeting(completer, laws, GREETING)
    }

    #[must_use]
    pub fn with_greeting(completer: Arc<dyn Completer>, laws: Arc<dyn LawStore>, greeting: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ConversationState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state,
                events,
                completer,
                laws,
                greeting: greeting.into(),
                voice: Mutex::new(None),
            }),
        }
    }

    /// Current state, cloned.
    #[must_use]
    pub fn snapshot(&self) -> ConversationState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // TRANSCRIPT
    // =========================================================================

    /// Seed an empty transcript with the greeting. Returns whether it was added.
    pub fn initialize(&self) -> bool {
        let greeting = self.inner.greeting.clone();
        let events = &self.inner.events;
        self.inner.state.send_if_modified(|s| {
            if !s.is_empty() {
                return false;
            }
            let message = s.push(Origin::Assistant, greeting);
            let _ = events.send(SessionEvent::Appended(message));
            true
        })
    }

    /// Append a user message and dispatch it for completion.
    ///
    /// Whitespace-only text is ignored and returns `None`. The stored content
    /// is `text` exactly as given. The handle resolves once the reply has
    /// been applied.
    pub fn submit_user_text(&self, text: &str) -> Option<JoinHandle<()>> {
        if text.trim().is_empty() {
            debug!("session: blank input ignored");
            return None;
        }

        let events = &self.inner.events;
        self.inner.state.send_modify(|s| {
            let message = s.push(Origin::User, text.to_owned());
            s.pending_completions += 1;
            let _ = events.send(SessionEvent::Appended(message));
        });
        info!(origin = Origin::User.as_str(), len = text.len(), "session: message appended");

        let session = self.clone();
        let prompt = text.to_owned();
        Some(tokio::spawn(async move {
            let reply = session.inner.completer.complete(&prompt).await;
            session.apply_reply(&reply, true);
        }))
    }

    /// Submit the presentation's input buffer, clearing it only if accepted.
    pub fn submit_input(&self, buffer: &mut String) -> Option<JoinHandle<()>> {
        let handle = self.submit_user_text(buffer)?;
        buffer.clear();
        Some(handle)
    }

    /// Recognized speech takes the exact same path as typed text.
    pub fn on_transcription_result(&self, text: &str) -> Option<JoinHandle<()>> {
        self.submit_user_text(text)
    }

    /// Apply a completion reply. Returns whether a message was appended.
    pub fn on_completion_result(&self, response: &str) -> bool {
        self.apply_reply(response, false)
    }

    pub fn on_listening_state_changed(&self, listening: bool) {
        let events = &self.inner.events;
        self.inner.state.send_if_modified(|s| {
            if s.listening == listening {
                return false;
            }
            s.listening = listening;
            let _ = events.send(SessionEvent::ListeningChanged(listening));
            true
        });
    }

    fn apply_reply(&self, response: &str, settles_request: bool) -> bool {
        let events = &self.inner.events;
        let mut appended = false;
        self.inner.state.send_if_modified(|s| {
            let mut modified = false;
            if settles_request {
                s.pending_completions = s.pending_completions.saturating_sub(1);
                modified = true;
            }
            if response.is_empty() {
                return modified;
            }
            s.last_assistant_reply = Some(response.to_owned());
            if s.has_assistant_message(response) {
                debug!("session: duplicate reply suppressed");
                return true;
            }
            let message = s.push(Origin::Assistant, response.to_owned());
            let _ = events.send(SessionEvent::Appended(message));
            appended = true;
            true
        });
        if appended {
            info!(origin = Origin::Assistant.as_str(), len = response.len(), "session: message appended");
        }
        appended
    }

    fn notify(&self, event: SessionEvent) {
        let _ = self.inner.events.send(event);
    }

    // =========================================================================
    // VOICE
    // =========================================================================

    /// Wire a recognizer into this session. Replaces (and cancels) any
    /// previously attached one. Must be called from within a tokio runtime.
    pub fn attach_voice(&self, recognizer: Arc<dyn SpeechRecognizer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = TranscriptionSource::new(recognizer, tx);
        let generation = source.generation();
        *self.voice() = Some(source);
        tokio::spawn(pump_transcription(Arc::downgrade(&self.inner), rx, generation));
        debug!("session: voice attached");
    }

    pub fn start_voice(&self) {
        if let Some(source) = self.voice().as_mut() {
            debug!(restarting = source.is_active(), "session: voice start");
            source.start();
            return;
        }
        warn!("session: no recognizer attached");
        self.notify(SessionEvent::Notice(UNAVAILABLE_NOTICE.into()));
    }

    pub fn stop_voice(&self) {
        if let Some(source) = self.voice().as_mut() {
            source.stop();
        }
        self.on_listening_state_changed(false);
    }

    /// Stop when listening, start otherwise.
    pub fn toggle_voice(&self) {
        if self.inner.state.borrow().listening {
            self.stop_voice();
        } else {
            self.start_voice();
        }
    }

    /// Stop the active session and refuse further ones.
    pub fn release_voice(&self) {
        if let Some(source) = self.voice().as_mut() {
            source.release();
        }
        self.on_listening_state_changed(false);
    }

    fn voice(&self) -> std::sync::MutexGuard<'_, Option<TranscriptionSource>> {
        self.inner.voice.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // LAW CATALOG
    // =========================================================================

    pub async fn search_laws(&self, query: &str) -> Vec<LawRecord> {
        self.inner.laws.search(query).await
    }

    pub async fn all_laws(&self) -> Vec<LawRecord> {
        self.inner.laws.list_all().await
    }

    pub async fn add_law(&self, law: &NewLaw) -> Option<i64> {
        self.inner.laws.insert(law).await
    }

    pub async fn remove_law(&self, law: &LawRecord) -> u64 {
        self.inner.laws.delete(law).await
    }
}

/// Forward transcription events into the session until either side is gone.
/// Updates from a stopped or superseded session are dropped.
async fn pump_transcription(
    session: Weak<Inner>,
    mut rx: mpsc::UnboundedReceiver<TranscriptionUpdate>,
    generation: Generation,
) {
    while let Some(TranscriptionUpdate { generation: tag, event }) = rx.recv().await {
        if !generation.is_current(tag) {
            debug!(tag, current = generation.current(), "session: stale transcription update dropped");
            continue;
        }
        let Some(inner) = session.upgrade() else {
            break;
        };
        let session = SessionCoordinator { inner };
        match event {
            TranscriptionEvent::Listening(listening) => session.on_listening_state_changed(listening),
            TranscriptionEvent::Recognized(text) => {
                let _ = session.on_transcription_result(&text);
            }
            TranscriptionEvent::Failed(notice) => session.notify(SessionEvent::Notice(notice)),
        }
    }
    debug!("session: transcription pump finished");
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
