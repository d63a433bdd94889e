//! Transcription: speech-to-text sessions behind a recognizer capability.
//!
//! ARCHITECTURE
//! ============
//! `SpeechRecognizer` is the platform capability: it runs one recognition
//! session and reports raw `RecognitionEvent`s. `TranscriptionSource` owns
//! at most one running session, translates raw events into the two streams
//! the session coordinator cares about (listening state and recognized
//! text), and reports failures as displayable notices.
//!
//! TRADE-OFFS
//! ==========
//! Cancellation is task abort. A recognizer must release its device when
//! its future is dropped (`CommandRecognizer` relies on `kill_on_drop`).
//! Abort is not synchronous, so an aborted session may still emit a few
//! events. Every event carries the generation of the session that produced
//! it; `start` and `stop` advance the generation, and consumers drop updates
//! whose generation is no longer current.
//! Failures are never retried; the user starts a new session instead.

pub mod command;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use command::CommandRecognizer;

pub const UNAVAILABLE_NOTICE: &str = "Speech recognition is not available on this device.";
pub const PERMISSION_NOTICE: &str = "Microphone permission is required for voice input";

// =============================================================================
// RECOGNIZER CAPABILITY
// =============================================================================

/// Failure kinds a recognizer can report. Display text is user-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    #[error("Audio recording error")]
    Audio,
    #[error("Client side error")]
    Client,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Network error")]
    Network,
    #[error("Network timeout")]
    NetworkTimeout,
    #[error("No speech detected")]
    NoMatch,
    #[error("Recognition service busy")]
    RecognizerBusy,
    #[error("Server error")]
    Server,
    #[error("No speech input")]
    SpeechTimeout,
    #[error("Unknown error")]
    Unknown,
}

impl RecognitionError {
    #[must_use]
    pub fn error_code(self) -> &'static str {
        match self {
            Self::Audio => "E_STT_AUDIO",
            Self::Client => "E_STT_CLIENT",
            Self::InsufficientPermissions => "E_STT_PERMISSIONS",
            Self::Network => "E_STT_NETWORK",
            Self::NetworkTimeout => "E_STT_NETWORK_TIMEOUT",
            Self::NoMatch => "E_STT_NO_MATCH",
            Self::RecognizerBusy => "E_STT_BUSY",
            Self::Server => "E_STT_SERVER",
            Self::SpeechTimeout => "E_STT_SPEECH_TIMEOUT",
            Self::Unknown => "E_STT_UNKNOWN",
        }
    }
}

/// Raw callbacks from one recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    ReadyForSpeech,
    BeginningOfSpeech,
    EndOfSpeech,
    /// In-progress hypothesis. Logged, never committed.
    Partial(String),
    /// Final hypotheses, best first.
    Results(Vec<String>),
    Error(RecognitionError),
}

#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    fn is_available(&self) -> bool;

    fn has_microphone_permission(&self) -> bool;

    /// Run one session to completion, reporting progress on `events`.
    ///
    /// # Errors
    ///
    /// A returned error is treated exactly like an `Error` event.
    async fn recognize(&self, events: mpsc::UnboundedSender<RecognitionEvent>) -> Result<(), RecognitionError>;
}

// =============================================================================
// TRANSCRIPTION SOURCE
// =============================================================================

/// What the source reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionEvent {
    Listening(bool),
    Recognized(String),
    /// Displayable diagnostic. Always preceded by `Listening(false)`.
    Failed(String),
}

/// A `TranscriptionEvent` stamped with the session generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionUpdate {
    pub generation: u64,
    pub event: TranscriptionEvent,
}

/// Session counter shared between a source and the consumer of its updates.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    pub(crate) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub struct TranscriptionSource {
    recognizer: Arc<dyn SpeechRecognizer>,
    events: mpsc::UnboundedSender<TranscriptionUpdate>,
    generation: Generation,
    session: Option<JoinHandle<()>>,
    released: bool,
}

impl TranscriptionSource {
    #[must_use]
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, events: mpsc::UnboundedSender<TranscriptionUpdate>) -> Self {
        Self { recognizer, events, generation: Generation::default(), session: None, released: false }
    }

    /// Handle for checking whether an update still belongs to the live session.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation.clone()
    }

    /// Begin a new session, tearing down any active one first.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.released {
            warn!("transcription: start after release ignored");
            return;
        }
        self.abort_session();
        let generation = self.generation.advance();

        if !self.recognizer.is_available() {
            warn!("transcription: recognizer unavailable");
            self.emit(generation, TranscriptionEvent::Listening(false));
            self.emit(generation, TranscriptionEvent::Failed(UNAVAILABLE_NOTICE.into()));
            return;
        }
        if !self.recognizer.has_microphone_permission() {
            warn!("transcription: microphone permission missing");
            self.emit(generation, TranscriptionEvent::Listening(false));
            self.emit(generation, TranscriptionEvent::Failed(PERMISSION_NOTICE.into()));
            return;
        }

        info!(generation, "transcription: session started");
        // Emitted before spawning so a fast failure cannot be overtaken.
        self.emit(generation, TranscriptionEvent::Listening(true));
        let recognizer = self.recognizer.clone();
        let events = self.events.clone();
        self.session = Some(tokio::spawn(run_session(recognizer, generation, events)));
    }

    /// Cancel the active session, if any. Updates it emits afterwards carry
    /// a stale generation.
    pub fn stop(&mut self) {
        let was_running = self.abort_session();
        let generation = self.generation.advance();
        if was_running {
            info!(generation, "transcription: session stopped");
        }
        self.emit(generation, TranscriptionEvent::Listening(false));
    }

    /// Stop and refuse further sessions.
    pub fn release(&mut self) {
        self.stop();
        self.released = true;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn abort_session(&mut self) -> bool {
        match self.session.take() {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                was_running
            }
            None => false,
        }
    }

    fn emit(&self, generation: u64, event: TranscriptionEvent) {
        // Owner gone means nobody is listening; nothing to do.
        let _ = self.events.send(TranscriptionUpdate { generation, event });
    }
}

impl Drop for TranscriptionSource {
    fn drop(&mut self) {
        self.abort_session();
    }
}

async fn run_session(
    recognizer: Arc<dyn SpeechRecognizer>,
    generation: u64,
    out: mpsc::UnboundedSender<TranscriptionUpdate>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let produce = async move {
        if let Err(e) = recognizer.recognize(tx.clone()).await {
            let _ = tx.send(RecognitionEvent::Error(e));
        }
    };
    tokio::join!(produce, translate(rx, SessionOutput { generation, out }));
}

struct SessionOutput {
    generation: u64,
    out: mpsc::UnboundedSender<TranscriptionUpdate>,
}

impl SessionOutput {
    fn send(&self, event: TranscriptionEvent) {
        let _ = self.out.send(TranscriptionUpdate { generation: self.generation, event });
    }
}

/// Map raw recognizer events onto `TranscriptionEvent`s. Stops at the first
/// terminal event (results or error).
async fn translate(mut rx: mpsc::UnboundedReceiver<RecognitionEvent>, out: SessionOutput) {
    while let Some(event) = rx.recv().await {
        match event {
            RecognitionEvent::ReadyForSpeech | RecognitionEvent::BeginningOfSpeech => {
                out.send(TranscriptionEvent::Listening(true));
            }
            RecognitionEvent::EndOfSpeech => debug!("transcription: end of speech"),
            RecognitionEvent::Partial(text) => debug!(partial = %text, "transcription: partial"),
            RecognitionEvent::Results(matches) => {
                match matches.into_iter().find(|m| !m.trim().is_empty()) {
                    Some(text) => {
                        info!(len = text.len(), "transcription: recognized");
                        out.send(TranscriptionEvent::Recognized(text));
                    }
                    None => warn!("transcription: no recognition results"),
                }
                out.send(TranscriptionEvent::Listening(false));
                return;
            }
            RecognitionEvent::Error(e) => {
                warn!(error = %e, code = e.error_code(), "transcription failed");
                out.send(TranscriptionEvent::Listening(false));
                out.send(TranscriptionEvent::Failed(e.to_string()));
                return;
            }
        }
    }
    // Recognizer finished without a verdict.
    out.send(TranscriptionEvent::Listening(false));
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
