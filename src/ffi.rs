//! FFI layer for native host integration
//!
//! Provides C-compatible functions that can be called from Swift or C.
//! Uses opaque pointers and C strings for cross-language compatibility;
//! structured results are returned as JSON strings.

// FFI functions necessarily work with raw pointers - this is expected behavior
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use crate::audio::MicrophoneStream;
use crate::catalog::ProblemCatalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::evaluation::{AnswerEvaluator, PracticeAttempt};
use crate::flashcards::{FlashcardGenerator, custom_set};
use crate::providers::{
    AzureSentimentProvider, CompletionProvider, HttpChatBackend, OpenAICompletionProvider,
    OpenAITranscriptionProvider,
};
use crate::session::{AdvanceOutcome, InterviewSession, SendOutcome, SessionOptions};
use crate::state::InterviewState;
use crate::storage::{
    SETTING_AZURE_TEXT_ANALYTICS_ENDPOINT, SETTING_AZURE_TEXT_ANALYTICS_KEY,
    SETTING_OPENAI_API_KEY, Storage,
};
use crate::types::{CardType, EditorTheme, Flashcard, FlashcardSetId, Language, Question};
use crate::voice::{PermissionState, VoiceRecorder, VoiceRecording};

type Session = InterviewSession<HttpChatBackend>;

/// Providers rebuilt whenever an API key changes
struct Providers {
    completion: Arc<dyn CompletionProvider>,
    evaluator: Arc<AnswerEvaluator>,
}

impl Providers {
    fn from_config(config: &Config) -> Self {
        let completion: Arc<dyn CompletionProvider> =
            Arc::new(OpenAICompletionProvider::new(config.openai_api_key.clone()));
        let transcription = Arc::new(OpenAITranscriptionProvider::new(
            config.openai_api_key.clone(),
        ));
        let sentiment = Arc::new(AzureSentimentProvider::new(
            config.azure_text_analytics_endpoint.clone(),
            config.azure_text_analytics_key.clone(),
        ));
        let evaluator =
            AnswerEvaluator::new(transcription, completion.clone()).with_sentiment(sentiment);
        Self {
            completion,
            evaluator: Arc::new(evaluator),
        }
    }
}

/// Opaque handle to the Intervue engine
pub struct IntervueHandle {
    runtime: Runtime,
    storage: Storage,
    config: Mutex<Config>,
    catalog: Arc<ProblemCatalog>,
    backend: Arc<HttpChatBackend>,
    session: Mutex<Option<Arc<Session>>>,
    recorder: Mutex<VoiceRecorder<MicrophoneStream>>,
    /// Most recent finished recording, kept for answer evaluation
    last_recording: Mutex<Option<VoiceRecording>>,
    providers: Mutex<Providers>,
    last_error: Mutex<Option<String>>,
}

#[derive(Serialize)]
struct InterviewSnapshot<'a> {
    state: &'a InterviewState,
    question: Option<&'a Question>,
    session_id: Option<String>,
    awaiting_response: bool,
    hints: Vec<String>,
}

#[derive(Deserialize)]
struct NewFlashcardSet {
    name: String,
    #[serde(default)]
    card_type: CardType,
    cards: Vec<Flashcard>,
}

fn set_last_error(handle: &IntervueHandle, message: impl Into<String>) {
    *handle.last_error.lock() = Some(message.into());
}

fn clear_last_error(handle: &IntervueHandle) {
    *handle.last_error.lock() = None;
}

/// Record a failure for `intervue_get_last_error`
fn fail(handle: &IntervueHandle, context: &str, e: impl std::fmt::Display) {
    let message = format!("{context}: {e}");
    error!("{message}");
    set_last_error(handle, message);
}

fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

fn into_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn json_result<T: Serialize>(handle: &IntervueHandle, value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => {
            clear_last_error(handle);
            into_c_string(json)
        }
        Err(e) => {
            fail(handle, "Failed to serialize result", e);
            ptr::null_mut()
        }
    }
}

fn current_session(handle: &IntervueHandle) -> Option<Arc<Session>> {
    let session = handle.session.lock().clone();
    if session.is_none() {
        set_last_error(handle, "No interview in progress");
    }
    session
}

/// Swap the pending recording and delete the old file unless the session holds it
fn replace_last_recording(handle: &IntervueHandle, next: Option<VoiceRecording>) {
    let Some(previous) = std::mem::replace(&mut *handle.last_recording.lock(), next) else {
        return;
    };
    let held = handle
        .session
        .lock()
        .as_ref()
        .is_some_and(|session| session.holds_recording(&previous.path));
    if held {
        return;
    }
    let path = previous.path.clone();
    if let Err(e) = previous.discard() {
        warn!("Failed to delete recording {}: {}", path.display(), e);
    }
}

fn card_type_from_u8(value: u8) -> CardType {
    match value {
        1 => CardType::Technical,
        _ => CardType::Behavioral,
    }
}

fn send_outcome_code(outcome: SendOutcome) -> i32 {
    match outcome {
        SendOutcome::Ignored => 0,
        SendOutcome::NoSession => 1,
        SendOutcome::Delivered => 2,
        SendOutcome::Fallback => 3,
        SendOutcome::Superseded => 4,
        SendOutcome::Cancelled => 5,
    }
}

fn load_config(storage: &Storage) -> Result<Config> {
    let config = Config::from_env().unwrap_or_else(|e| {
        warn!("Ignoring invalid environment configuration: {}", e);
        Config::default()
    });
    config.apply_settings(storage)
}

// ============ Lifecycle ============

/// Initialize the Intervue engine
/// Returns an opaque handle that must be passed to all other functions
/// Returns null on failure
#[unsafe(no_mangle)]
pub extern "C" fn intervue_init(db_path: *const c_char) -> *mut IntervueHandle {
    let db_path = if db_path.is_null() {
        Config::default().database_path()
    } else {
        match str_arg(db_path) {
            Some(s) => PathBuf::from(s),
            None => return ptr::null_mut(),
        }
    };

    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create async runtime: {}", e);
            return ptr::null_mut();
        }
    };

    let storage = match Storage::open(&db_path) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open storage: {}", e);
            return ptr::null_mut();
        }
    };

    let config = match load_config(&storage) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ptr::null_mut();
        }
    };

    let backend = match HttpChatBackend::from_config(&config) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            error!("Failed to create chat backend: {}", e);
            return ptr::null_mut();
        }
    };

    let catalog = match ProblemCatalog::builtin() {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            error!("Failed to load problem catalog: {}", e);
            return ptr::null_mut();
        }
    };

    let recorder = VoiceRecorder::new(MicrophoneStream::new(), config.recordings_dir());
    let providers = Providers::from_config(&config);

    info!(
        "Intervue engine initialized (backend {}, {} problems)",
        backend.base_url(),
        catalog.len()
    );

    Box::into_raw(Box::new(IntervueHandle {
        runtime,
        storage,
        config: Mutex::new(config),
        catalog,
        backend,
        session: Mutex::new(None),
        recorder: Mutex::new(recorder),
        last_recording: Mutex::new(None),
        providers: Mutex::new(providers),
        last_error: Mutex::new(None),
    }))
}

/// Destroy the Intervue engine and free resources
#[unsafe(no_mangle)]
pub extern "C" fn intervue_destroy(handle: *mut IntervueHandle) {
    if !handle.is_null() {
        let handle = unsafe { Box::from_raw(handle) };
        if let Some(session) = handle.session.lock().take() {
            session.dispose();
        }
        replace_last_recording(&handle, None);
        drop(handle);
        debug!("Intervue engine destroyed");
    }
}

// ============ Interview ============

/// Start a new interview, replacing any interview in progress
/// Returns true when the question set was drawn; the remote session may still be unavailable
#[unsafe(no_mangle)]
pub extern "C" fn intervue_start_interview(handle: *mut IntervueHandle) -> bool {
    let handle = unsafe { &*handle };
    let options = SessionOptions::from(&*handle.config.lock());

    if let Some(previous) = handle.session.lock().take() {
        previous.dispose();
    }
    replace_last_recording(handle, None);

    let result = handle.runtime.block_on(Session::start(
        handle.backend.clone(),
        handle.catalog.clone(),
        options,
        &mut rand::thread_rng(),
    ));

    match result {
        Ok(session) => {
            if session.session_id().is_none() {
                set_last_error(handle, "Chat session unavailable; messages will not be sent");
            } else {
                clear_last_error(handle);
            }
            *handle.session.lock() = Some(Arc::new(session));
            true
        }
        Err(e) => {
            fail(handle, "Failed to start interview", e);
            false
        }
    }
}

/// Current interview state as JSON (caller must free with intervue_free_string)
/// Returns null when no interview is in progress
#[unsafe(no_mangle)]
pub extern "C" fn intervue_get_state_json(handle: *mut IntervueHandle) -> *mut c_char {
    let handle = unsafe { &*handle };
    let Some(session) = current_session(handle) else {
        return ptr::null_mut();
    };

    let state = session.state();
    let snapshot = InterviewSnapshot {
        state: &state,
        question: session.current_question(),
        session_id: session.session_id(),
        awaiting_response: session.is_awaiting_response(),
        hints: session.hints(),
    };
    json_result(handle, &snapshot)
}

/// Send a typed message to the interviewer and wait for the reply
/// Returns 0 ignored, 1 no session, 2 delivered, 3 fallback, 4 superseded, 5 cancelled, -1 error
#[unsafe(no_mangle)]
pub extern "C" fn intervue_send_message(handle: *mut IntervueHandle, text: *const c_char) -> i32 {
    let handle = unsafe { &*handle };
    let Some(text) = str_arg(text) else {
        set_last_error(handle, "Invalid message text");
        return -1;
    };
    let Some(session) = current_session(handle) else {
        return -1;
    };

    let outcome = handle.runtime.block_on(session.send_text_message(text));
    debug!("Message outcome: {:?}", outcome);
    send_outcome_code(outcome)
}

/// Move to the next question
/// Returns the new 1-based question number, 0 when the interview ended, -1 on error
#[unsafe(no_mangle)]
pub extern "C" fn intervue_next_question(handle: *mut IntervueHandle) -> i32 {
    let handle = unsafe { &*handle };
    let Some(session) = current_session(handle) else {
        return -1;
    };

    match session.advance() {
        AdvanceOutcome::Advanced(number) => {
            if let Err(e) = handle.runtime.block_on(session.sync_context()) {
                warn!("Failed to sync interview context: {}", e);
            }
            number as i32
        }
        AdvanceOutcome::Ended => 0,
    }
}

/// Push the current question, code and language to the backend
#[unsafe(no_mangle)]
pub extern "C" fn intervue_sync_context(handle: *mut IntervueHandle) -> bool {
    let handle = unsafe { &*handle };
    let Some(session) = current_session(handle) else {
        return false;
    };

    match handle.runtime.block_on(session.sync_context()) {
        Ok(()) => {
            clear_last_error(handle);
            true
        }
        Err(e) => {
            fail(handle, "Failed to sync interview context", e);
            false
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn intervue_set_code(handle: *mut IntervueHandle, code: *const c_char) -> bool {
    let handle = unsafe { &*handle };
    let Some(code) = str_arg(code) else {
        set_last_error(handle, "Invalid code text");
        return false;
    };
    let Some(session) = current_session(handle) else {
        return false;
    };
    session.set_code(code);
    true
}

/// Switch the editor language ("python", "javascript", "java", "cpp")
/// Replaces the editor contents with the new starter template
#[unsafe(no_mangle)]
pub extern "C" fn intervue_set_language(
    handle: *mut IntervueHandle,
    language: *const c_char,
) -> bool {
    let handle = unsafe { &*handle };
    let Some(language) = str_arg(language).and_then(Language::parse) else {
        set_last_error(handle, "Unsupported language");
        return false;
    };
    let Some(session) = current_session(handle) else {
        return false;
    };
    session.set_language(language);
    true
}

/// theme: 0 = light, 1 = dark
#[unsafe(no_mangle)]
pub extern "C" fn intervue_set_theme(handle: *mut IntervueHandle, theme: u8) -> bool {
    let handle = unsafe { &*handle };
    let Some(session) = current_session(handle) else {
        return false;
    };
    session.set_theme(if theme == 0 {
        EditorTheme::Light
    } else {
        EditorTheme::Dark
    });
    true
}

/// Font size is clamped to the supported range
#[unsafe(no_mangle)]
pub extern "C" fn intervue_set_font_size(handle: *mut IntervueHandle, font_size: u32) -> bool {
    let handle = unsafe { &*handle };
    let Some(session) = current_session(handle) else {
        return false;
    };
    session.set_font_size(font_size);
    true
}

/// Pause or resume the timer. Returns the new active flag.
#[unsafe(no_mangle)]
pub extern "C" fn intervue_toggle_active(handle: *mut IntervueHandle) -> bool {
    let handle = unsafe { &*handle };
    match current_session(handle) {
        Some(session) => session.toggle_active(),
        None => false,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn intervue_end_interview(handle: *mut IntervueHandle) -> bool {
    let handle = unsafe { &*handle };
    let Some(session) = current_session(handle) else {
        return false;
    };
    session.end();
    true
}

/// Check whether the conversation backend is reachable
#[unsafe(no_mangle)]
pub extern "C" fn intervue_health_check(handle: *mut IntervueHandle) -> bool {
    use crate::providers::ChatBackend;

    let handle = unsafe { &*handle };
    handle.runtime.block_on(handle.backend.health())
}

// ============ Voice ============

/// Probe microphone access
/// Returns 0 = unknown, 1 = granted, 2 = denied
#[unsafe(no_mangle)]
pub extern "C" fn intervue_check_microphone(handle: *mut IntervueHandle) -> u8 {
    let handle = unsafe { &*handle };
    match handle.recorder.lock().check_permission() {
        PermissionState::Unknown => 0,
        PermissionState::Granted => 1,
        PermissionState::Denied => 2,
    }
}

/// Start recording an answer
/// Returns true on success
#[unsafe(no_mangle)]
pub extern "C" fn intervue_start_recording(handle: *mut IntervueHandle) -> bool {
    let handle = unsafe { &*handle };
    match handle.recorder.lock().start() {
        Ok(()) => {
            clear_last_error(handle);
            true
        }
        Err(e) => {
            fail(handle, "Failed to start recording", e);
            false
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn intervue_is_recording(handle: *mut IntervueHandle) -> bool {
    let handle = unsafe { &*handle };
    handle.recorder.lock().is_recording()
}

/// Current input level, 0.0 when idle
#[unsafe(no_mangle)]
pub extern "C" fn intervue_get_audio_level(handle: *mut IntervueHandle) -> f32 {
    let handle = unsafe { &*handle };
    handle.recorder.lock().level()
}

/// Stop recording and send the answer to the interviewer
/// upload_audio: false sends a placeholder transcript, true uploads the WAV for server transcription
/// Returns the same codes as intervue_send_message
#[unsafe(no_mangle)]
pub extern "C" fn intervue_stop_recording(handle: *mut IntervueHandle, upload_audio: bool) -> i32 {
    let handle = unsafe { &*handle };

    // release the device before any network wait
    let recording = match handle.recorder.lock().stop() {
        Ok(recording) => recording,
        Err(e) => {
            fail(handle, "Failed to stop recording", e);
            return -1;
        }
    };
    replace_last_recording(handle, Some(recording.clone()));

    let Some(session) = current_session(handle) else {
        return -1;
    };

    let outcome = if upload_audio {
        handle.runtime.block_on(session.send_voice_audio(&recording))
    } else {
        handle.runtime.block_on(session.send_voice_message(&recording))
    };
    send_outcome_code(outcome)
}

/// Stop recording without sending anything
#[unsafe(no_mangle)]
pub extern "C" fn intervue_cancel_recording(handle: *mut IntervueHandle) -> bool {
    let handle = unsafe { &*handle };
    match handle.recorder.lock().cancel() {
        Ok(()) => true,
        Err(e) => {
            fail(handle, "Failed to cancel recording", e);
            false
        }
    }
}

// ============ Answer practice ============

/// Transcribe and critique the most recent recording, saving it to practice history
/// card_type: 0 = behavioral, 1 = technical; question may be null
/// Returns feedback JSON (caller must free with intervue_free_string), or null on failure
#[unsafe(no_mangle)]
pub extern "C" fn intervue_evaluate_last_recording(
    handle: *mut IntervueHandle,
    user_id: *const c_char,
    card_type: u8,
    question: *const c_char,
) -> *mut c_char {
    let handle = unsafe { &*handle };
    let Some(user_id) = str_arg(user_id) else {
        set_last_error(handle, "Invalid user id");
        return ptr::null_mut();
    };
    let Some(recording) = handle.last_recording.lock().clone() else {
        set_last_error(handle, "No recording available - record an answer first");
        return ptr::null_mut();
    };

    let card_type = card_type_from_u8(card_type);
    let evaluator = handle.providers.lock().evaluator.clone();
    let feedback = match handle
        .runtime
        .block_on(evaluator.evaluate_recording(card_type, &recording))
    {
        Ok(feedback) => feedback,
        Err(e) => {
            fail(handle, "Answer evaluation failed", e);
            return ptr::null_mut();
        }
    };

    let attempt = PracticeAttempt::new(
        card_type,
        str_arg(question).map(String::from),
        &feedback,
        recording.duration_secs,
    );
    if let Err(e) = handle.storage.save_practice_attempt(user_id, &attempt) {
        error!("Failed to save practice attempt: {}", e);
    }

    json_result(handle, &feedback)
}

/// Recent practice attempts as JSON (caller must free with intervue_free_string)
#[unsafe(no_mangle)]
pub extern "C" fn intervue_get_practice_history_json(
    handle: *mut IntervueHandle,
    user_id: *const c_char,
    limit: usize,
) -> *mut c_char {
    let handle = unsafe { &*handle };
    let Some(user_id) = str_arg(user_id) else {
        set_last_error(handle, "Invalid user id");
        return ptr::null_mut();
    };
    match handle.storage.list_practice_attempts(user_id, limit) {
        Ok(attempts) => json_result(handle, &attempts),
        Err(e) => {
            fail(handle, "Failed to load practice history", e);
            ptr::null_mut()
        }
    }
}

// ============ Flashcards ============

/// Save a user-authored set from `{"name", "card_type"?, "cards": [{"question", "answer"?}]}`
/// Returns the saved set as JSON (caller must free with intervue_free_string), or null on failure
#[unsafe(no_mangle)]
pub extern "C" fn intervue_create_flashcard_set_json(
    handle: *mut IntervueHandle,
    user_id: *const c_char,
    set_json: *const c_char,
) -> *mut c_char {
    let handle = unsafe { &*handle };
    let (Some(user_id), Some(set_json)) = (str_arg(user_id), str_arg(set_json)) else {
        set_last_error(handle, "Invalid arguments");
        return ptr::null_mut();
    };

    let result = serde_json::from_str::<NewFlashcardSet>(set_json)
        .map_err(Error::from)
        .and_then(|input| custom_set(&input.name, input.card_type, input.cards))
        .and_then(|set| {
            handle.storage.create_flashcard_set(user_id, &set)?;
            Ok(set)
        });

    match result {
        Ok(set) => json_result(handle, &set),
        Err(e) => {
            fail(handle, "Failed to create flashcard set", e);
            ptr::null_mut()
        }
    }
}

/// All sets owned by the user as JSON, newest first (caller must free with intervue_free_string)
#[unsafe(no_mangle)]
pub extern "C" fn intervue_list_flashcard_sets_json(
    handle: *mut IntervueHandle,
    user_id: *const c_char,
) -> *mut c_char {
    let handle = unsafe { &*handle };
    let Some(user_id) = str_arg(user_id) else {
        set_last_error(handle, "Invalid user id");
        return ptr::null_mut();
    };
    match handle.storage.list_flashcard_sets(user_id) {
        Ok(sets) => json_result(handle, &sets),
        Err(e) => {
            fail(handle, "Failed to load flashcard sets", e);
            ptr::null_mut()
        }
    }
}

/// Delete a set by id
/// Returns true if a set was deleted
#[unsafe(no_mangle)]
pub extern "C" fn intervue_delete_flashcard_set(
    handle: *mut IntervueHandle,
    user_id: *const c_char,
    set_id: *const c_char,
) -> bool {
    let handle = unsafe { &*handle };
    let Some(user_id) = str_arg(user_id) else {
        set_last_error(handle, "Invalid user id");
        return false;
    };
    let Some(id) = str_arg(set_id).and_then(|s| FlashcardSetId::parse_str(s).ok()) else {
        set_last_error(handle, "Invalid flashcard set id");
        return false;
    };

    match handle.storage.delete_flashcard_set(user_id, &id) {
        Ok(deleted) => {
            clear_last_error(handle);
            deleted
        }
        Err(e) => {
            fail(handle, "Failed to delete flashcard set", e);
            false
        }
    }
}

/// Generate a set with the LLM and save it
/// card_type: 0 = behavioral, 1 = technical
/// Returns the saved set as JSON (caller must free with intervue_free_string), or null on failure
#[unsafe(no_mangle)]
pub extern "C" fn intervue_generate_flashcards_json(
    handle: *mut IntervueHandle,
    user_id: *const c_char,
    name: *const c_char,
    card_type: u8,
    topic: *const c_char,
    count: u32,
) -> *mut c_char {
    let handle = unsafe { &*handle };
    let (Some(user_id), Some(name), Some(topic)) =
        (str_arg(user_id), str_arg(name), str_arg(topic))
    else {
        set_last_error(handle, "Invalid arguments");
        return ptr::null_mut();
    };

    let generator = FlashcardGenerator::new(handle.providers.lock().completion.clone());
    if !generator.is_configured() {
        set_last_error(handle, "OpenAI API key not set");
        return ptr::null_mut();
    }

    let result = handle
        .runtime
        .block_on(generator.generate_set(
            name,
            card_type_from_u8(card_type),
            topic,
            count as usize,
        ))
        .and_then(|set| {
            handle.storage.create_flashcard_set(user_id, &set)?;
            Ok(set)
        });

    match result {
        Ok(set) => json_result(handle, &set),
        Err(e) => {
            fail(handle, "Flashcard generation failed", e);
            ptr::null_mut()
        }
    }
}

// ============ Settings ============

/// Save the OpenAI API key and rebuild the providers that use it
#[unsafe(no_mangle)]
pub extern "C" fn intervue_set_openai_api_key(
    handle: *mut IntervueHandle,
    api_key: *const c_char,
) -> bool {
    let handle = unsafe { &*handle };
    let Some(api_key) = str_arg(api_key) else {
        set_last_error(handle, "Invalid API key");
        return false;
    };

    if let Err(e) = handle.storage.set_setting(SETTING_OPENAI_API_KEY, api_key) {
        fail(handle, "Failed to save API key", e);
        return false;
    }

    let mut config = handle.config.lock();
    config.openai_api_key = Some(api_key.to_string()).filter(|k| !k.is_empty());
    *handle.providers.lock() = Providers::from_config(&config);
    clear_last_error(handle);
    info!("OpenAI API key updated");
    true
}

/// Save the Azure Text Analytics endpoint and key used for sentiment scoring
#[unsafe(no_mangle)]
pub extern "C" fn intervue_set_azure_text_analytics(
    handle: *mut IntervueHandle,
    endpoint: *const c_char,
    api_key: *const c_char,
) -> bool {
    let handle = unsafe { &*handle };
    let (Some(endpoint), Some(api_key)) = (str_arg(endpoint), str_arg(api_key)) else {
        set_last_error(handle, "Invalid arguments");
        return false;
    };

    let saved = handle
        .storage
        .set_setting(SETTING_AZURE_TEXT_ANALYTICS_ENDPOINT, endpoint)
        .and_then(|_| {
            handle
                .storage
                .set_setting(SETTING_AZURE_TEXT_ANALYTICS_KEY, api_key)
        });
    if let Err(e) = saved {
        fail(handle, "Failed to save Text Analytics settings", e);
        return false;
    }

    let mut config = handle.config.lock();
    config.azure_text_analytics_endpoint = Some(endpoint.to_string());
    config.azure_text_analytics_key = Some(api_key.to_string());
    *handle.providers.lock() = Providers::from_config(&config);
    clear_last_error(handle);
    true
}

/// Check if flashcard generation and answer feedback are available
#[unsafe(no_mangle)]
pub extern "C" fn intervue_is_configured(handle: *mut IntervueHandle) -> bool {
    let handle = unsafe { &*handle };
    handle.providers.lock().evaluator.is_configured()
}

// ============ Utilities ============

/// Get the last error message (caller must free with intervue_free_string)
#[unsafe(no_mangle)]
pub extern "C" fn intervue_get_last_error(handle: *mut IntervueHandle) -> *mut c_char {
    let handle = unsafe { &*handle };
    let message = handle.last_error.lock().clone();
    match message {
        Some(text) => into_c_string(text),
        None => ptr::null_mut(),
    }
}

/// Free a string returned by intervue functions
#[unsafe(no_mangle)]
pub extern "C" fn intervue_free_string(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}
