use super::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::oneshot;
use tokio::time::{Duration, timeout};

use crate::transcription::{PERMISSION_NOTICE, RecognitionError, RecognitionEvent};

// =========================================================================
// fakes
// =========================================================================

/// Replies with a fixed string and records every prompt.
struct EchoCompleter {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl EchoCompleter {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: reply.into(), prompts: Mutex::new(Vec::new()) })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Completer for EchoCompleter {
    async fn complete(&self, prompt: &str) -> String {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        self.reply.clone()
    }
}

/// Each prompt waits until the test releases its reply.
#[derive(Default)]
struct GatedCompleter {
    gates: tokio::sync::Mutex<HashMap<String, oneshot::Receiver<String>>>,
}

impl GatedCompleter {
    async fn gate(&self, prompt: &str) -> oneshot::Sender<String> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().await.insert(prompt.to_owned(), rx);
        tx
    }
}

#[async_trait::async_trait]
impl Completer for GatedCompleter {
    async fn complete(&self, prompt: &str) -> String {
        let gate = self.gates.lock().await.remove(prompt);
        match gate {
            Some(rx) => rx.await.unwrap_or_default(),
            None => std::future::pending().await,
        }
    }
}

/// Never resolves.
struct StalledCompleter;

#[async_trait::async_trait]
impl Completer for StalledCompleter {
    async fn complete(&self, _prompt: &str) -> String {
        std::future::pending().await
    }
}

struct EmptyLaws;

#[async_trait::async_trait]
impl LawStore for EmptyLaws {
    async fn insert(&self, _law: &NewLaw) -> Option<i64> {
        None
    }
    async fn search(&self, _query: &str) -> Vec<LawRecord> {
        Vec::new()
    }
    async fn list_all(&self) -> Vec<LawRecord> {
        Vec::new()
    }
    async fn delete(&self, _law: &LawRecord) -> u64 {
        0
    }
}

struct ScriptedVoice {
    permission: bool,
    script: Vec<RecognitionEvent>,
    hold_open: bool,
    sessions: AtomicUsize,
}

impl ScriptedVoice {
    fn new(script: Vec<RecognitionEvent>) -> Arc<Self> {
        Arc::new(Self { permission: true, script, hold_open: false, sessions: AtomicUsize::new(0) })
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedVoice {
    fn is_available(&self) -> bool {
        true
    }

    fn has_microphone_permission(&self) -> bool {
        self.permission
    }

    async fn recognize(&self, events: mpsc::UnboundedSender<RecognitionEvent>) -> Result<(), RecognitionError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        for event in &self.script {
            let _ = events.send(event.clone());
        }
        if self.hold_open {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

fn session_with(completer: Arc<dyn Completer>) -> SessionCoordinator {
    SessionCoordinator::new(completer, Arc::new(EmptyLaws))
}

fn contents(session: &SessionCoordinator) -> Vec<(Origin, String)> {
    session
        .snapshot()
        .transcript
        .into_iter()
        .map(|m| (m.origin, m.content))
        .collect()
}

async fn wait_until(session: &SessionCoordinator, check: impl FnMut(&ConversationState) -> bool) {
    let mut rx = session.subscribe();
    timeout(Duration::from_secs(1), rx.wait_for(check))
        .await
        .expect("state condition timed out")
        .expect("state channel closed");
}

// =========================================================================
// initialize
// =========================================================================

#[tokio::test]
async fn initialize_seeds_greeting_once() {
    let session = session_with(EchoCompleter::new("ok"));

    assert!(session.initialize());
    assert!(!session.initialize());

    assert_eq!(contents(&session), vec![(Origin::Assistant, GREETING.to_string())]);
}

#[tokio::test]
async fn initialize_is_noop_on_non_empty_transcript() {
    let session = session_with(Arc::new(StalledCompleter));
    session.submit_user_text("hello");

    assert!(!session.initialize());
    assert_eq!(contents(&session), vec![(Origin::User, "hello".to_string())]);
}

// =========================================================================
// submit_user_text
// =========================================================================

#[tokio::test]
async fn submit_appends_user_then_reply() {
    let completer = EchoCompleter::new("Ayushman Bharat covers up to ₹5 lakh per family.");
    let session = session_with(completer.clone());
    session.initialize();

    let handle = session.submit_user_text("What is Ayushman Bharat?").expect("accepted");
    handle.await.unwrap();

    assert_eq!(
        contents(&session),
        vec![
            (Origin::Assistant, GREETING.to_string()),
            (Origin::User, "What is Ayushman Bharat?".to_string()),
            (Origin::Assistant, "Ayushman Bharat covers up to ₹5 lakh per family.".to_string()),
        ]
    );
    assert_eq!(completer.prompts(), vec!["What is Ayushman Bharat?".to_string()]);
    assert_eq!(
        session.snapshot().last_assistant_reply.as_deref(),
        Some("Ayushman Bharat covers up to ₹5 lakh per family.")
    );
}

#[tokio::test]
async fn blank_input_is_ignored_without_dispatch() {
    let completer = EchoCompleter::new("ok");
    let session = session_with(completer.clone());

    assert!(session.submit_user_text("").is_none());
    assert!(session.submit_user_text("   \n\t").is_none());
    tokio::task::yield_now().await;

    assert!(session.snapshot().transcript.is_empty());
    assert!(completer.prompts().is_empty());
}

#[tokio::test]
async fn user_content_is_stored_verbatim() {
    let session = session_with(Arc::new(StalledCompleter));
    session.submit_user_text("  padded question  ");

    assert_eq!(contents(&session), vec![(Origin::User, "  padded question  ".to_string())]);
}

#[tokio::test]
async fn consecutive_submits_preserve_order() {
    let session = session_with(Arc::new(StalledCompleter));
    for text in ["one", "two", "three", "four"] {
        session.submit_user_text(text);
    }

    let snapshot = session.snapshot();
    let users: Vec<_> = snapshot.transcript.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(users, vec!["one", "two", "three", "four"]);
    assert_eq!(snapshot.pending_completions, 4);
}

#[tokio::test]
async fn failure_text_is_an_ordinary_assistant_message() {
    let session = session_with(EchoCompleter::new("Error: HTTP 500"));
    session.submit_user_text("hello").unwrap().await.unwrap();

    assert_eq!(
        contents(&session).last(),
        Some(&(Origin::Assistant, "Error: HTTP 500".to_string()))
    );
    assert_eq!(session.snapshot().pending_completions, 0);
}

#[tokio::test]
async fn replies_land_in_arrival_order() {
    let completer = Arc::new(GatedCompleter::default());
    let gate_a = completer.gate("A").await;
    let gate_b = completer.gate("B").await;
    let session = session_with(completer);

    let a = session.submit_user_text("A").unwrap();
    let b = session.submit_user_text("B").unwrap();

    gate_b.send("reply B".into()).unwrap();
    b.await.unwrap();
    gate_a.send("reply A".into()).unwrap();
    a.await.unwrap();

    assert_eq!(
        contents(&session),
        vec![
            (Origin::User, "A".to_string()),
            (Origin::User, "B".to_string()),
            (Origin::Assistant, "reply B".to_string()),
            (Origin::Assistant, "reply A".to_string()),
        ]
    );
}

#[tokio::test]
async fn timestamps_never_decrease() {
    let session = session_with(EchoCompleter::new("same answer"));
    session.initialize();
    for text in ["a", "b", "c"] {
        session.submit_user_text(text).unwrap().await.unwrap();
    }

    let transcript = session.snapshot().transcript;
    assert!(transcript.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

// =========================================================================
// submit_input
// =========================================================================

#[tokio::test]
async fn submit_input_clears_accepted_buffer() {
    let session = session_with(Arc::new(StalledCompleter));
    let mut buffer = String::from("Sugamya Bharat?");

    assert!(session.submit_input(&mut buffer).is_some());
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn submit_input_keeps_rejected_buffer() {
    let session = session_with(Arc::new(StalledCompleter));
    let mut buffer = String::from("   ");

    assert!(session.submit_input(&mut buffer).is_none());
    assert_eq!(buffer, "   ");
}

// =========================================================================
// on_completion_result
// =========================================================================

#[tokio::test]
async fn duplicate_reply_is_suppressed() {
    let session = session_with(Arc::new(StalledCompleter));
    session.initialize();

    assert!(session.on_completion_result("Here is the answer."));
    assert!(!session.on_completion_result("Here is the answer."));
    assert!(!session.on_completion_result(GREETING));

    let transcript = contents(&session);
    assert_eq!(transcript.len(), 2);
    assert_eq!(session.snapshot().last_assistant_reply.as_deref(), Some(GREETING));
}

#[tokio::test]
async fn empty_reply_is_noop() {
    let session = session_with(Arc::new(StalledCompleter));
    assert!(!session.on_completion_result(""));
    assert!(session.snapshot().transcript.is_empty());
    assert!(session.snapshot().last_assistant_reply.is_none());
}

#[tokio::test]
async fn repeated_question_with_same_answer_appends_once() {
    let session = session_with(EchoCompleter::new("Same reply."));
    session.submit_user_text("q").unwrap().await.unwrap();
    session.submit_user_text("q").unwrap().await.unwrap();

    assert_eq!(
        contents(&session),
        vec![
            (Origin::User, "q".to_string()),
            (Origin::Assistant, "Same reply.".to_string()),
            (Origin::User, "q".to_string()),
        ]
    );
    assert_eq!(session.snapshot().pending_completions, 0);
}

// =========================================================================
// listening / events
// =========================================================================

#[tokio::test]
async fn listening_flag_does_not_touch_transcript() {
    let session = session_with(Arc::new(StalledCompleter));
    session.initialize();

    session.on_listening_state_changed(true);
    assert!(session.snapshot().listening);
    session.on_listening_state_changed(false);
    assert!(!session.snapshot().listening);
    assert_eq!(session.snapshot().transcript.len(), 1);
}

#[tokio::test]
async fn events_follow_transcript_order() {
    let session = session_with(EchoCompleter::new("answer"));
    let mut events = session.events();

    session.initialize();
    session.on_listening_state_changed(true);
    session.on_listening_state_changed(true);
    session.submit_user_text("question").unwrap().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(match event {
            SessionEvent::Appended(m) => format!("{}:{}", m.origin.as_str(), m.content),
            SessionEvent::ListeningChanged(b) => format!("listening:{b}"),
            SessionEvent::Notice(n) => format!("notice:{n}"),
        });
    }
    assert_eq!(
        seen,
        vec![
            format!("assistant:{GREETING}"),
            "listening:true".to_string(),
            "user:question".to_string(),
            "assistant:answer".to_string(),
        ]
    );
}

#[tokio::test]
async fn transcription_result_takes_the_typed_path() {
    let completer = EchoCompleter::new("spoken reply");
    let session = session_with(completer.clone());

    session.on_transcription_result("voice question").unwrap().await.unwrap();
    assert!(session.on_transcription_result(" ").is_none());

    assert_eq!(
        contents(&session),
        vec![
            (Origin::User, "voice question".to_string()),
            (Origin::Assistant, "spoken reply".to_string()),
        ]
    );
    assert_eq!(completer.prompts(), vec!["voice question".to_string()]);
}

// =========================================================================
// voice
// =========================================================================

#[tokio::test]
async fn recognized_speech_is_submitted_and_answered() {
    let completer = EchoCompleter::new("voice answer");
    let session = session_with(completer.clone());
    session.attach_voice(ScriptedVoice::new(vec![
        RecognitionEvent::ReadyForSpeech,
        RecognitionEvent::Results(vec!["search laws".into()]),
    ]));

    session.start_voice();
    wait_until(&session, |s| s.transcript.len() == 2 && !s.listening).await;

    assert_eq!(
        contents(&session),
        vec![
            (Origin::User, "search laws".to_string()),
            (Origin::Assistant, "voice answer".to_string()),
        ]
    );
}

#[tokio::test]
async fn permission_denied_raises_notice_only() {
    let session = session_with(EchoCompleter::new("unused"));
    let mut events = session.events();
    let voice = Arc::new(ScriptedVoice {
        permission: false,
        script: Vec::new(),
        hold_open: false,
        sessions: AtomicUsize::new(0),
    });
    session.attach_voice(voice.clone());

    session.start_voice();
    let notice = timeout(Duration::from_secs(1), async {
        loop {
            if let Ok(SessionEvent::Notice(text)) = events.recv().await {
                return text;
            }
        }
    })
    .await
    .expect("notice timed out");

    assert_eq!(notice, PERMISSION_NOTICE);
    assert!(session.snapshot().transcript.is_empty());
    assert!(!session.snapshot().listening);
    assert_eq!(voice.sessions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn toggle_stops_an_active_session() {
    let session = session_with(Arc::new(StalledCompleter));
    let voice = Arc::new(ScriptedVoice {
        permission: true,
        script: vec![RecognitionEvent::ReadyForSpeech],
        hold_open: true,
        sessions: AtomicUsize::new(0),
    });
    session.attach_voice(voice);

    session.toggle_voice();
    wait_until(&session, |s| s.listening).await;

    session.toggle_voice();
    assert!(!session.snapshot().listening);
    assert!(session.snapshot().transcript.is_empty());
}

#[tokio::test]
async fn start_without_recognizer_raises_unavailable_notice() {
    let session = session_with(Arc::new(StalledCompleter));
    let mut events = session.events();

    session.start_voice();

    assert_eq!(events.try_recv().unwrap(), SessionEvent::Notice(UNAVAILABLE_NOTICE.into()));
    assert!(!session.snapshot().listening);
}

#[tokio::test]
async fn released_voice_stays_off() {
    let session = session_with(Arc::new(StalledCompleter));
    let voice = ScriptedVoice::new(vec![RecognitionEvent::ReadyForSpeech]);
    session.attach_voice(voice.clone());

    session.release_voice();
    session.start_voice();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(voice.sessions.load(Ordering::SeqCst), 0);
    assert!(!session.snapshot().listening);
}

#[tokio::test]
async fn updates_from_a_stopped_session_are_dropped() {
    let completer = EchoCompleter::new("unused");
    let session = session_with(completer.clone());
    let generation = Generation::default();
    let stopped = generation.advance();
    let live = generation.advance();

    let (tx, rx) = mpsc::unbounded_channel();
    let update = |generation, event| TranscriptionUpdate { generation, event };
    tx.send(update(stopped, TranscriptionEvent::Listening(true))).unwrap();
    tx.send(update(stopped, TranscriptionEvent::Recognized("late words".into()))).unwrap();
    tx.send(update(stopped, TranscriptionEvent::Failed("Network error".into()))).unwrap();
    tx.send(update(live, TranscriptionEvent::Listening(true))).unwrap();
    drop(tx);

    let mut events = session.events();
    pump_transcription(Arc::downgrade(&session.inner), rx, generation).await;

    assert!(session.snapshot().transcript.is_empty());
    assert!(completer.prompts().is_empty());
    assert!(session.snapshot().listening);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::ListeningChanged(true));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn stop_voice_leaves_listening_off() {
    let session = session_with(Arc::new(StalledCompleter));
    let voice = Arc::new(ScriptedVoice {
        permission: true,
        script: vec![RecognitionEvent::ReadyForSpeech, RecognitionEvent::BeginningOfSpeech],
        hold_open: true,
        sessions: AtomicUsize::new(0),
    });
    session.attach_voice(voice);

    session.start_voice();
    wait_until(&session, |s| s.listening).await;
    session.stop_voice();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(!session.snapshot().listening);
    assert!(session.snapshot().transcript.is_empty());
}

// =========================================================================
// law catalog passthrough
// =========================================================================

#[tokio::test]
async fn catalog_operations_reach_the_store() {
    let pool = crate::db::init_memory_pool().await.unwrap();
    let catalog = Arc::new(crate::services::laws::LawCatalog::new(pool));
    let session = SessionCoordinator::new(Arc::new(StalledCompleter), catalog);

    let id = session
        .add_law(&NewLaw {
            title: "Rights of Persons with Disabilities Act".into(),
            category: "Accessibility".into(),
            description: "Equal opportunity and accessibility mandates.".into(),
            ..NewLaw::default()
        })
        .await
        .expect("inserted");

    let found = session.search_laws("access").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
    assert_eq!(session.all_laws().await.len(), 1);

    assert_eq!(session.remove_law(&found[0]).await, 1);
    assert!(session.all_laws().await.is_empty());
}
