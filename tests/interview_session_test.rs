//! Integration tests for the interview session
//!
//! Drives `InterviewSession` against an in-process `ChatBackend` so message
//! ordering, fallbacks, navigation and cancellation can be checked without
//! a network.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use intervue::audio::{AudioSource, CapturedAudio};
use intervue::catalog::ProblemCatalog;
use intervue::error::{Error, Result};
use intervue::providers::{
    ChatBackend, ChatMessageRequest, ChatMessageResponse, ContextUpdate, VoiceMessageRequest,
    VoiceMessageResponse,
};
use intervue::session::{
    AdvanceOutcome, InterviewSession, SendOutcome, SessionOptions, TEXT_FALLBACK,
    VOICE_FALLBACK, VOICE_PLACEHOLDER,
};
use intervue::types::{Difficulty, Language, Message, MessageRole, Problem, StarterCode};
use intervue::voice::VoiceRecorder;
use rand::SeedableRng;
use rand::rngs::StdRng;

// ============ Test Doubles ============

#[derive(Default)]
struct MockBackend {
    fail_session: bool,
    fail_messages: AtomicBool,
    session_calls: AtomicUsize,
    requests: Mutex<Vec<ChatMessageRequest>>,
    voice_requests: Mutex<Vec<VoiceMessageRequest>>,
    context_updates: Mutex<Vec<(String, ContextUpdate)>>,
}

impl MockBackend {
    fn failing_session() -> Self {
        Self {
            fail_session: true,
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<ChatMessageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn create_session(&self) -> Result<String> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_session {
            return Err(Error::Api {
                status: 503,
                detail: "unavailable".to_string(),
            });
        }
        Ok("session-1".to_string())
    }

    async fn send_message(&self, request: ChatMessageRequest) -> Result<ChatMessageResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if request.content.starts_with("slow") {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                detail: "boom".to_string(),
            });
        }

        Ok(ChatMessageResponse {
            message: Message::ai(format!("reply to {}", request.content)),
            session_id: request.session_id.unwrap_or_default(),
        })
    }

    async fn health(&self) -> bool {
        true
    }

    async fn send_voice_message(&self, request: VoiceMessageRequest) -> Result<VoiceMessageResponse> {
        self.voice_requests.lock().unwrap().push(request.clone());
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                detail: "boom".to_string(),
            });
        }
        Ok(VoiceMessageResponse {
            transcribed_text: "I would use a hash map".to_string(),
            ai_response: Message::ai("voice reply"),
            session_id: request.session_id.unwrap_or_default(),
        })
    }

    async fn update_session_context(&self, session_id: &str, update: &ContextUpdate) -> Result<()> {
        self.context_updates
            .lock()
            .unwrap()
            .push((session_id.to_string(), update.clone()));
        Ok(())
    }
}

/// One second of silence per recording
struct SilentSource {
    recording: bool,
}

impl AudioSource for SilentSource {
    fn start(&mut self) -> Result<()> {
        self.recording = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<CapturedAudio> {
        self.recording = false;
        Ok(CapturedAudio::new(vec![0.0; 16000], 16000))
    }

    fn is_recording(&self) -> bool {
        self.recording
    }
}

// ============ Helper Functions ============

fn problem(id: &str, difficulty: Difficulty) -> Problem {
    Problem {
        id: id.to_string(),
        title: format!("Title {id}"),
        difficulty,
        category: "Arrays".to_string(),
        description: format!("Describe {id}"),
        examples: vec![],
        constraints: vec![],
        hints: vec![format!("hint {id}")],
        starter_code: StarterCode {
            python: format!("# {id} python"),
            javascript: format!("// {id} javascript"),
            java: format!("// {id} java"),
            cpp: format!("// {id} cpp"),
        },
    }
}

/// Exactly enough problems for a five question interview
fn catalog() -> Arc<ProblemCatalog> {
    Arc::new(ProblemCatalog::new(vec![
        problem("e1", Difficulty::Easy),
        problem("e2", Difficulty::Easy),
        problem("m1", Difficulty::Medium),
        problem("m2", Difficulty::Medium),
        problem("h1", Difficulty::Hard),
    ]))
}

fn options() -> SessionOptions {
    SessionOptions {
        total_questions: 5,
        language: Language::Python,
    }
}

async fn start_session(backend: Arc<MockBackend>) -> InterviewSession<MockBackend> {
    let mut rng = StdRng::seed_from_u64(11);
    InterviewSession::start(backend, catalog(), options(), &mut rng)
        .await
        .unwrap()
}

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("intervue_test_{}", uuid::Uuid::new_v4()))
}

// ============ Initialization ============

#[tokio::test]
async fn test_start_posts_welcome_message() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend.clone()).await;

    assert_eq!(session.session_id().as_deref(), Some("session-1"));
    assert_eq!(session.questions().len(), 5);

    let state = session.state();
    assert_eq!(state.current_question(), 1);
    assert_eq!(state.total_questions(), 5);
    assert!(state.is_active());
    assert!(!state.is_ended());

    let first = &session.questions()[0];
    assert_eq!(state.current_code(), format!("# {} python", first.id));

    let messages = state.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Ai);
    assert!(messages[0].content.contains(&first.title));
    assert!(messages[0].content.contains(first.difficulty.as_str()));
    assert!(messages[0].content.contains("Arrays"));
    assert!(messages[0].timestamp <= Utc::now() - chrono::Duration::seconds(29));
}

#[tokio::test]
async fn test_session_creation_is_attempted_once() {
    let backend = Arc::new(MockBackend::failing_session());
    let session = start_session(backend.clone()).await;

    assert!(session.session_id().is_none());
    assert!(session.connect().await.is_none());
    assert_eq!(backend.session_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_catalog_is_an_error() {
    let backend = Arc::new(MockBackend::default());
    let result = InterviewSession::new(
        backend,
        Arc::new(ProblemCatalog::new(vec![])),
        options(),
        &mut StdRng::seed_from_u64(1),
    );
    assert!(matches!(result, Err(Error::Catalog(_))));
}

// ============ Text Messages ============

#[tokio::test]
async fn test_blank_messages_are_ignored() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend.clone()).await;
    let before = session.state();

    assert_eq!(session.send_text_message("").await, SendOutcome::Ignored);
    assert_eq!(session.send_text_message("   ").await, SendOutcome::Ignored);

    assert_eq!(session.state(), before);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_successful_send_appends_user_then_ai() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend.clone()).await;

    let outcome = session.send_text_message("test").await;
    assert_eq!(outcome, SendOutcome::Delivered);
    assert!(!session.is_awaiting_response());

    let state = session.state();
    let messages = state.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, MessageRole::User);
    assert_eq!(messages[1].content, "test");
    assert_eq!(messages[2].role, MessageRole::Ai);
    assert_eq!(messages[2].content, "reply to test");
    assert!(messages.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].session_id.as_deref(), Some("session-1"));
    assert_eq!(requests[0].code_context.as_deref(), Some(state.current_code()));
    let context = requests[0].question_context.as_ref().unwrap();
    assert_eq!(context.id, session.questions()[0].id);
    assert_eq!(context.number, 1);
}

#[tokio::test]
async fn test_failed_send_appends_fallback() {
    let backend = Arc::new(MockBackend::default());
    backend.fail_messages.store(true, Ordering::SeqCst);
    let session = start_session(backend.clone()).await;

    let outcome = session.send_text_message("hello").await;
    assert_eq!(outcome, SendOutcome::Fallback);
    assert!(!session.is_awaiting_response());

    let state = session.state();
    let last = state.messages().last().unwrap();
    assert_eq!(last.role, MessageRole::Ai);
    assert_eq!(last.content, TEXT_FALLBACK);
}

#[tokio::test]
async fn test_send_without_session_keeps_user_message() {
    let backend = Arc::new(MockBackend::failing_session());
    let session = start_session(backend.clone()).await;

    let outcome = session.send_text_message("  anyone there?  ").await;
    assert_eq!(outcome, SendOutcome::NoSession);

    let state = session.state();
    assert_eq!(state.messages().len(), 2);
    assert_eq!(state.messages()[1].content, "anyone there?");
    assert!(backend.requests().is_empty());
    assert!(!session.is_awaiting_response());
}

#[tokio::test]
async fn test_stale_reply_is_dropped() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend.clone()).await;

    let (slow, fast) = tokio::join!(
        session.send_text_message("slow question"),
        session.send_text_message("fast question"),
    );

    assert_eq!(fast, SendOutcome::Delivered);
    assert_eq!(slow, SendOutcome::Superseded);
    assert!(!session.is_awaiting_response());

    let contents: Vec<String> = session
        .state()
        .messages()
        .iter()
        .skip(1)
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(
        contents,
        vec![
            "slow question".to_string(),
            "fast question".to_string(),
            "reply to fast question".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_dispose_discards_inflight_reply() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend.clone()).await;

    let (outcome, ()) = tokio::join!(session.send_text_message("slow answer"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.dispose();
    });

    assert_eq!(outcome, SendOutcome::Cancelled);
    assert!(session.is_disposed());

    let after_dispose = session.state();
    assert_eq!(after_dispose.messages().len(), 2);
    assert_eq!(after_dispose.messages()[1].content, "slow answer");

    assert_eq!(session.send_text_message("again").await, SendOutcome::Cancelled);
    assert_eq!(session.state(), after_dispose);
}

// ============ Voice Messages ============

#[tokio::test]
async fn test_voice_message_sends_placeholder() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend.clone()).await;

    let dir = temp_dir();
    let mut recorder = VoiceRecorder::new(SilentSource { recording: false }, &dir);
    recorder.start().unwrap();
    let recording = recorder.stop().unwrap();
    assert_eq!(recording.duration_secs, 1);

    let outcome = session.send_voice_message(&recording).await;
    assert_eq!(outcome, SendOutcome::Delivered);

    let state = session.state();
    let user = &state.messages()[1];
    assert_eq!(user.content, "[Voice message - 1s]");
    assert_eq!(user.audio_url.as_deref(), Some(recording.url.as_str()));
    assert!(recording.url.starts_with("file://"));

    let requests = backend.requests();
    assert_eq!(requests[0].content, VOICE_PLACEHOLDER);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_voice_upload_uses_voice_endpoint() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend.clone()).await;

    let dir = temp_dir();
    let mut recorder = VoiceRecorder::new(SilentSource { recording: false }, &dir);
    recorder.start().unwrap();
    let recording = recorder.stop().unwrap();

    assert_eq!(session.send_voice_audio(&recording).await, SendOutcome::Delivered);

    let voice_requests = backend.voice_requests.lock().unwrap().clone();
    assert_eq!(voice_requests.len(), 1);
    assert!(!voice_requests[0].audio_data.is_empty());
    assert_eq!(voice_requests[0].session_id.as_deref(), Some("session-1"));
    assert!(backend.requests().is_empty());

    let state = session.state();
    assert_eq!(state.messages().last().unwrap().content, "voice reply");

    backend.fail_messages.store(true, Ordering::SeqCst);
    assert_eq!(session.send_voice_audio(&recording).await, SendOutcome::Fallback);
    assert_eq!(session.state().messages().last().unwrap().content, VOICE_FALLBACK);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_dispose_deletes_sent_recordings() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend).await;

    let dir = temp_dir();
    let mut recorder = VoiceRecorder::new(SilentSource { recording: false }, &dir);
    recorder.start().unwrap();
    let spoken = recorder.stop().unwrap();
    recorder.start().unwrap();
    let uploaded = recorder.stop().unwrap();

    session.send_voice_message(&spoken).await;
    session.send_voice_audio(&uploaded).await;
    assert!(session.holds_recording(&spoken.path));
    assert!(spoken.path.exists() && uploaded.path.exists());

    session.dispose();
    assert!(!spoken.path.exists());
    assert!(!uploaded.path.exists());
    assert!(!session.holds_recording(&spoken.path));

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_dropped_session_deletes_recordings() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend).await;

    let dir = temp_dir();
    let mut recorder = VoiceRecorder::new(SilentSource { recording: false }, &dir);
    recorder.start().unwrap();
    let recording = recorder.stop().unwrap();
    session.send_voice_message(&recording).await;

    drop(session);
    assert!(!recording.path.exists());
    let _ = std::fs::remove_dir_all(dir);
}

// ============ Navigation ============

#[tokio::test]
async fn test_advance_moves_one_question() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend).await;
    session.set_language(Language::JavaScript);
    let before = session.state();

    assert_eq!(session.advance(), AdvanceOutcome::Advanced(2));

    let after = session.state();
    let second = &session.questions()[1];
    assert_eq!(after.current_question(), 2);
    assert_eq!(after.current_code(), format!("// {} javascript", second.id));
    assert_eq!(after.messages().len(), before.messages().len() + 1);

    let announcement = after.messages().last().unwrap();
    assert!(announcement.content.contains("question 2"));
    assert!(announcement.content.contains(&second.title));
    assert!(announcement.content.contains(&second.description));
}

#[tokio::test]
async fn test_advance_at_last_question_ends() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend).await;

    for expected in 2..=5 {
        assert_eq!(session.advance(), AdvanceOutcome::Advanced(expected));
    }
    let before = session.state();

    assert_eq!(session.advance(), AdvanceOutcome::Ended);
    let after = session.state();
    assert_eq!(after.current_question(), 5);
    assert!(after.is_ended());
    assert!(!after.is_active());
    assert_eq!(after.messages().len(), before.messages().len());

    // terminal
    assert_eq!(session.advance(), AdvanceOutcome::Ended);
    assert_eq!(session.state().current_question(), 5);
}

// ============ Editor ============

#[tokio::test]
async fn test_language_change_resets_buffer() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend).await;
    let first = session.questions()[0].id.clone();

    session.set_code("def solve(): return 42");
    assert_eq!(session.state().current_code(), "def solve(): return 42");

    session.set_language(Language::Cpp);
    let state = session.state();
    assert_eq!(state.language(), Language::Cpp);
    assert_eq!(state.current_code(), format!("// {first} cpp"));
}

#[test]
fn test_language_switch_racing_advance_keeps_buffer_consistent() {
    for trial in 0..200 {
        let mut rng = StdRng::seed_from_u64(trial);
        let session = Arc::new(
            InterviewSession::new(Arc::new(MockBackend::default()), catalog(), options(), &mut rng)
                .unwrap(),
        );

        let switcher = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                for i in 0..20 {
                    let language = if i % 2 == 0 { Language::Cpp } else { Language::Java };
                    session.set_language(language);
                }
            })
        };
        let advancer = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                for _ in 0..4 {
                    session.advance();
                }
            })
        };
        switcher.join().unwrap();
        advancer.join().unwrap();

        let state = session.state();
        let current = &session.questions()[state.current_question() as usize - 1];
        let expected = format!("// {} {}", current.id, state.language());
        assert_eq!(state.current_code(), expected, "trial {trial}");
    }
}

#[tokio::test]
async fn test_editor_preferences_and_pause() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend).await;

    session.set_font_size(100);
    assert_eq!(session.state().font_size(), 24);

    assert!(!session.toggle_active());
    assert!(session.toggle_active());

    session.end();
    assert!(session.state().is_ended());
    assert_eq!(session.hints(), vec![format!("hint {}", session.questions()[0].id)]);
}

// ============ Remote Context ============

#[tokio::test]
async fn test_sync_context_sends_current_question() {
    let backend = Arc::new(MockBackend::default());
    let session = start_session(backend.clone()).await;
    session.advance();
    session.set_language(Language::Java);

    session.sync_context().await.unwrap();

    let updates = backend.context_updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    let (session_id, update) = &updates[0];
    assert_eq!(session_id, "session-1");
    assert_eq!(update.question_number, Some(2));
    assert_eq!(update.total_questions, Some(5));
    assert_eq!(update.programming_language.as_deref(), Some("java"));
    assert_eq!(
        update.current_question.as_ref().map(|q| q.id.as_str()),
        Some(session.questions()[1].id.as_str())
    );
}

#[tokio::test]
async fn test_sync_context_requires_session() {
    let backend = Arc::new(MockBackend::failing_session());
    let session = start_session(backend).await;
    assert!(matches!(session.sync_context().await, Err(Error::NotFound(_))));
}
