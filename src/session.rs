//! Mock interview session
//!
//! `InterviewSession` owns the interview state, the drawn question set and the
//! remote conversation id. Every state change goes through a pure transition
//! on `InterviewState`; the session only decides which snapshot is current.
//!
//! Each outgoing chat request carries a generation number. Only the reply to
//! the most recent request may clear the awaiting flag or append to the log;
//! replies to superseded requests are dropped. After `dispose` nothing that is
//! still in flight can touch the state, and recordings sent through the
//! session are deleted.

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::ProblemCatalog;
use crate::config::{Config, DEFAULT_TOTAL_QUESTIONS};
use crate::error::{Error, Result};
use crate::providers::{
    ChatBackend, ChatMessageRequest, ContextUpdate, ConversationHistory, QuestionContext,
    VoiceMessageRequest,
};
use crate::state::InterviewState;
use crate::types::{EditorTheme, Language, Message, Question};
use crate::voice::VoiceRecording;

/// Shown when a text message gets no reply
pub const TEXT_FALLBACK: &str =
    "I apologize, but I'm having trouble responding right now. Please try again in a moment.";

/// Shown when a voice message gets no reply
pub const VOICE_FALLBACK: &str =
    "I had trouble processing your voice message. Please try typing your response instead.";

/// Sent to the interviewer in place of a transcript for voice answers
pub const VOICE_PLACEHOLDER: &str =
    "[User sent a voice message - voice transcription not yet implemented]";

const WELCOME_BACKDATE_SECS: i64 = 30;

/// How a send attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, nothing changed
    Ignored,
    /// User message logged but there is no remote session to send it to
    NoSession,
    /// Interviewer reply appended
    Delivered,
    /// Request failed and the fallback reply was appended
    Fallback,
    /// A newer request was issued before this one settled, reply dropped
    Superseded,
    /// Session disposed before the request settled
    Cancelled,
}

/// Result of moving to the next question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Now on this 1-based question
    Advanced(u32),
    /// There was no next question, the interview is over
    Ended,
}

/// Settings fixed for the lifetime of one interview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub total_questions: usize,
    pub language: Language,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            total_questions: DEFAULT_TOTAL_QUESTIONS,
            language: Language::default(),
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            total_questions: config.total_questions,
            language: config.default_language,
        }
    }
}

enum Outgoing<'a> {
    Text(&'a str),
    Voice(Vec<u8>),
}

struct SessionInner {
    state: InterviewState,
    session_id: Option<String>,
    connect_attempted: bool,
    generation: u64,
    awaiting: bool,
}

/// One mock interview driven against a `ChatBackend`
pub struct InterviewSession<B: ChatBackend + ?Sized> {
    backend: Arc<B>,
    catalog: Arc<ProblemCatalog>,
    questions: Vec<Question>,
    inner: Mutex<SessionInner>,
    recordings: Mutex<Vec<VoiceRecording>>,
    cancel: CancellationToken,
}

impl<B: ChatBackend + ?Sized> InterviewSession<B> {
    /// Draw the question set and post the welcome message. No network access.
    pub fn new<R: Rng + ?Sized>(
        backend: Arc<B>,
        catalog: Arc<ProblemCatalog>,
        options: SessionOptions,
        rng: &mut R,
    ) -> Result<Self> {
        let questions = catalog.generate_interview_set(options.total_questions, rng);
        let Some(first) = questions.first() else {
            return Err(Error::Catalog(
                "no questions available for this interview".to_string(),
            ));
        };

        let starter = starter_code_for(&catalog, first, options.language);
        let welcome = Message::ai(welcome_message(first))
            .with_timestamp(Utc::now() - Duration::seconds(WELCOME_BACKDATE_SECS));
        let state = InterviewState::new(questions.len() as u32, options.language, starter)
            .with_message(welcome);

        info!(
            "Interview prepared: {} questions, starting with {}",
            questions.len(),
            first.id
        );

        Ok(Self {
            backend,
            catalog,
            questions,
            inner: Mutex::new(SessionInner {
                state,
                session_id: None,
                connect_attempted: false,
                generation: 0,
                awaiting: false,
            }),
            recordings: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Prepare the interview and open the remote conversation
    pub async fn start<R: Rng + ?Sized>(
        backend: Arc<B>,
        catalog: Arc<ProblemCatalog>,
        options: SessionOptions,
        rng: &mut R,
    ) -> Result<Self> {
        let session = Self::new(backend, catalog, options, rng)?;
        session.connect().await;
        Ok(session)
    }

    /// Request a remote session id. Attempted once; on failure messaging stays disabled.
    pub async fn connect(&self) -> Option<String> {
        {
            let mut inner = self.inner.lock();
            if inner.connect_attempted {
                return inner.session_id.clone();
            }
            inner.connect_attempted = true;
        }

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            result = self.backend.create_session() => result,
        };

        match result {
            Ok(session_id) => {
                info!("Chat session created: {}", session_id);
                let mut inner = self.inner.lock();
                inner.session_id = Some(session_id.clone());
                Some(session_id)
            }
            Err(e) => {
                error!("Failed to create chat session: {}", e);
                None
            }
        }
    }

    // ========== Queries ==========

    /// Snapshot of the current state
    pub fn state(&self) -> InterviewState {
        self.inner.lock().state.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.lock().session_id.clone()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&Question> {
        let index = self.inner.lock().state.current_question() as usize - 1;
        self.questions.get(index)
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.inner.lock().awaiting
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn hints(&self) -> Vec<String> {
        self.current_question()
            .map(|q| self.catalog.hints(&q.id))
            .unwrap_or_default()
    }

    // ========== Editor and lifecycle transitions ==========

    pub fn set_code(&self, code: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.state = inner.state.with_code(code);
    }

    /// Switch language, discarding edits in favor of the new starter template
    pub fn set_language(&self, language: Language) {
        let mut inner = self.inner.lock();
        let index = inner.state.current_question() as usize - 1;
        let Some(question) = self.questions.get(index) else {
            return;
        };
        let starter = starter_code_for(&self.catalog, question, language);
        inner.state = inner.state.with_language(language, starter);
        debug!("Language changed to {}", language);
    }

    pub fn set_theme(&self, theme: EditorTheme) {
        let mut inner = self.inner.lock();
        inner.state = inner.state.with_theme(theme);
    }

    pub fn set_font_size(&self, font_size: u32) {
        let mut inner = self.inner.lock();
        inner.state = inner.state.with_font_size(font_size);
    }

    pub fn toggle_active(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.state = inner.state.toggle_active();
        inner.state.is_active()
    }

    pub fn end(&self) {
        let mut inner = self.inner.lock();
        inner.state = inner.state.end();
        info!("Interview ended");
    }

    /// Move to the next question, or end the interview after the last one
    pub fn advance(&self) -> AdvanceOutcome {
        let mut inner = self.inner.lock();
        if inner.state.is_ended() {
            return AdvanceOutcome::Ended;
        }

        let current = inner.state.current_question();
        if !inner.state.has_next_question() {
            inner.state = inner.state.end();
            info!("Interview complete after question {}", current);
            return AdvanceOutcome::Ended;
        }

        let next_number = current + 1;
        let Some(next) = self.questions.get(next_number as usize - 1) else {
            warn!("Question {} missing from interview set", next_number);
            return AdvanceOutcome::Ended;
        };

        let starter = starter_code_for(&self.catalog, next, inner.state.language());
        let announcement = Message::ai(transition_message(next_number, next));
        inner.state = inner.state.with_next_question(starter, announcement);
        info!("Advanced to question {} ({})", next_number, next.id);
        AdvanceOutcome::Advanced(next_number)
    }

    // ========== Chat ==========

    /// Log a typed answer and ask the interviewer for a reply
    pub async fn send_text_message(&self, text: &str) -> SendOutcome {
        let content = text.trim();
        if content.is_empty() {
            return SendOutcome::Ignored;
        }
        self.exchange(Message::user(content), Outgoing::Text(content), TEXT_FALLBACK)
            .await
    }

    /// Log a recorded answer and ask the interviewer for a reply
    pub async fn send_voice_message(&self, recording: &VoiceRecording) -> SendOutcome {
        self.track_recording(recording);
        self.exchange(
            voice_user_message(recording),
            Outgoing::Text(VOICE_PLACEHOLDER),
            VOICE_FALLBACK,
        )
        .await
    }

    /// Upload a recorded answer to the voice endpoint so the backend can transcribe it
    pub async fn send_voice_audio(&self, recording: &VoiceRecording) -> SendOutcome {
        self.track_recording(recording);
        let wav = match recording.read_bytes() {
            Ok(wav) => wav,
            Err(e) => {
                warn!("Could not read recording {}: {}", recording.path.display(), e);
                return self.send_voice_message(recording).await;
            }
        };
        self.exchange(voice_user_message(recording), Outgoing::Voice(wav), VOICE_FALLBACK)
            .await
    }

    async fn exchange(
        &self,
        user_message: Message,
        outgoing: Outgoing<'_>,
        fallback: &str,
    ) -> SendOutcome {
        if self.cancel.is_cancelled() {
            return SendOutcome::Cancelled;
        }

        let (session_id, question, code, generation) = {
            let mut inner = self.inner.lock();
            inner.state = inner.state.with_message(user_message);

            let Some(session_id) = inner.session_id.clone() else {
                warn!("No chat session available, message not sent");
                return SendOutcome::NoSession;
            };

            let index = inner.state.current_question() as usize - 1;
            let code = inner.state.current_code().to_string();

            inner.generation += 1;
            inner.awaiting = true;
            (session_id, self.questions.get(index), code, inner.generation)
        };

        debug!("Sending chat message (generation {})", generation);

        let call = async {
            match outgoing {
                Outgoing::Text(content) => {
                    let mut request = ChatMessageRequest::new(content)
                        .with_session(session_id)
                        .with_code(code);
                    if let Some(question) = question {
                        request = request.with_question(question);
                    }
                    self.backend
                        .send_message(request)
                        .await
                        .map(|response| response.message)
                }
                Outgoing::Voice(wav) => {
                    let mut request = VoiceMessageRequest::from_wav(&wav).with_session(session_id);
                    if let Some(question) = question {
                        request = request.with_question(question);
                    }
                    self.backend
                        .send_voice_message(request)
                        .await
                        .map(|response| {
                            debug!("Backend transcript: {}", response.transcribed_text);
                            response.ai_response
                        })
                }
            }
        };

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return SendOutcome::Cancelled,
            result = call => result,
        };

        self.settle(generation, result, fallback)
    }

    fn settle(&self, generation: u64, reply: Result<Message>, fallback: &str) -> SendOutcome {
        if self.cancel.is_cancelled() {
            return SendOutcome::Cancelled;
        }

        let mut inner = self.inner.lock();
        if generation != inner.generation {
            debug!(
                "Dropping reply for generation {} (latest is {})",
                generation, inner.generation
            );
            return SendOutcome::Superseded;
        }

        inner.awaiting = false;
        match reply {
            Ok(message) => {
                inner.state = inner.state.with_message(message);
                SendOutcome::Delivered
            }
            Err(e) => {
                error!("Error sending message: {}", e);
                inner.state = inner.state.with_message(Message::ai(fallback));
                SendOutcome::Fallback
            }
        }
    }

    // ========== Remote conversation ==========

    /// Push the current question, code and language to the backend
    pub async fn sync_context(&self) -> Result<()> {
        let (session_id, update) = {
            let inner = self.inner.lock();
            let session_id = inner
                .session_id
                .clone()
                .ok_or_else(|| Error::NotFound("no chat session".to_string()))?;
            let index = inner.state.current_question() as usize - 1;
            let update = ContextUpdate {
                current_question: self.questions.get(index).map(QuestionContext::from),
                question_number: Some(inner.state.current_question()),
                total_questions: Some(inner.state.total_questions()),
                user_code: Some(inner.state.current_code().to_string()),
                programming_language: Some(inner.state.language().as_str().to_string()),
            };
            (session_id, update)
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(()),
            result = self.backend.update_session_context(&session_id, &update) => result,
        }
    }

    /// Conversation as recorded by the backend
    pub async fn history(&self) -> Result<ConversationHistory> {
        let session_id = self
            .session_id()
            .ok_or_else(|| Error::NotFound("no chat session".to_string()))?;
        self.backend.conversation_history(&session_id).await
    }

    pub async fn backend_healthy(&self) -> bool {
        self.backend.health().await
    }

    // ========== Recordings ==========

    /// Whether this session will delete the recording at `path` when disposed
    pub fn holds_recording(&self, path: &Path) -> bool {
        self.recordings.lock().iter().any(|r| r.path == path)
    }

    fn track_recording(&self, recording: &VoiceRecording) {
        let mut recordings = self.recordings.lock();
        if !recordings.iter().any(|r| r.path == recording.path) {
            recordings.push(recording.clone());
        }
    }

    /// Delete every recording sent through this session
    pub fn release_recordings(&self) -> usize {
        let recordings: Vec<VoiceRecording> = self.recordings.lock().drain(..).collect();
        let mut released = 0;
        for recording in recordings {
            let path = recording.path.clone();
            match recording.discard() {
                Ok(()) => released += 1,
                Err(e) => warn!("Failed to delete recording {}: {}", path.display(), e),
            }
        }
        released
    }

    /// Cancel everything in flight and delete the session's recordings.
    /// Later settlements leave the state untouched.
    pub fn dispose(&self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            info!("Interview session disposed");
        }
        let released = self.release_recordings();
        if released > 0 {
            debug!("Deleted {} recordings", released);
        }
    }
}

impl<B: ChatBackend + ?Sized> Drop for InterviewSession<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn voice_user_message(recording: &VoiceRecording) -> Message {
    Message::user(recording.label()).with_audio_url(recording.url.clone())
}

fn starter_code_for(catalog: &ProblemCatalog, question: &Question, language: Language) -> String {
    match &question.starter_code {
        Some(code) => code.get(language).to_string(),
        None => catalog.starter_code(&question.id, language),
    }
}

/// Opening message for the first question
pub fn welcome_message(question: &Question) -> String {
    format!(
        "Welcome to your mock interview! I'm here to help you practice coding challenges.\n\n\
         For this first question, you'll be working on \"{}\" - {} level {}.\n\n\
         Please take your time to read through the problem description, understand the \
         requirements, and feel free to ask questions or discuss your approach. You can type \
         your thoughts or use the voice recorder to explain your reasoning.\n\n\
         When you're ready, start implementing the solution in the code editor on the left. \
         Good luck!",
        question.title,
        question.difficulty,
        question.category().filter(|c| !c.is_empty()).unwrap_or("problem"),
    )
}

/// Announcement posted when moving to question `number`
pub fn transition_message(number: u32, question: &Question) -> String {
    format!(
        "Great work on the previous question! Let's move on to question {}.\n\n\
         **Problem: {}** ({} - {})\n\n\
         {}\n\n\
         I've updated the code editor with a fresh template to get you started. Take your \
         time to understand the problem and feel free to ask any questions!",
        number,
        question.title,
        question.difficulty,
        question.category()
            .filter(|c| !c.is_empty())
            .unwrap_or("Coding Challenge"),
        question.description,
    )
}
