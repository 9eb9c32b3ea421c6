//! Integration tests for flashcard generation and spoken answer feedback
//!
//! Remote providers are replaced by scripted implementations of the
//! provider traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use intervue::error::{Error, Result};
use intervue::evaluation::{
    AnswerEvaluator, EVALUATION_SYSTEM_PROMPT, FEEDBACK_MAX_TOKENS, PracticeAttempt,
};
use intervue::flashcards::{FLASHCARD_SYSTEM_PROMPT, FlashcardGenerator};
use intervue::providers::{
    CompletionProvider, CompletionRequest, CompletionResponse, ConfidenceScores, SentimentLabel,
    SentimentProvider, SentimentResult, TranscriptionProvider, TranscriptionRequest,
    TranscriptionResponse,
};
use intervue::storage::Storage;
use intervue::types::CardType;

// ============ Test Doubles ============

struct ScriptedCompletion {
    reply: String,
    prompts: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.prompts.lock().unwrap().push(request);
        Ok(CompletionResponse {
            text: self.reply.clone(),
            usage: None,
            model: None,
        })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

struct ScriptedTranscription {
    text: String,
}

#[async_trait]
impl TranscriptionProvider for ScriptedTranscription {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse> {
        if request.wav.is_empty() {
            return Err(Error::Transcription("empty audio".to_string()));
        }
        Ok(TranscriptionResponse {
            text: self.text.clone(),
            language: request.language,
            duration_ms: None,
        })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

struct CountingSentiment {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl SentimentProvider for CountingSentiment {
    fn name(&self) -> &'static str {
        "Counting"
    }

    async fn analyze(&self, _text: &str) -> Result<SentimentResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Sentiment("quota exceeded".to_string()));
        }
        Ok(SentimentResult {
            label: SentimentLabel::Positive,
            confidence: ConfidenceScores {
                positive: 0.9,
                neutral: 0.1,
                negative: 0.0,
            },
        })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

fn evaluator(
    transcript: &str,
    sentiment: Arc<CountingSentiment>,
) -> (AnswerEvaluator, Arc<ScriptedCompletion>) {
    let completion = Arc::new(ScriptedCompletion::new("  Clear and well structured.  "));
    let evaluator = AnswerEvaluator::new(
        Arc::new(ScriptedTranscription {
            text: transcript.to_string(),
        }),
        completion.clone(),
    )
    .with_sentiment(sentiment);
    (evaluator, completion)
}

// ============ Flashcard Generation ============

#[tokio::test]
async fn test_generate_technical_set() {
    let provider = Arc::new(ScriptedCompletion::new(
        r#"[{"question": "What is an index?", "answer": "A lookup structure."}, {"question": "What is sharding?", "answer": "Horizontal partitioning."}]"#,
    ));
    let generator = FlashcardGenerator::new(provider.clone());

    let set = generator
        .generate_set("Databases", CardType::Technical, " databases ", 2)
        .await
        .unwrap();

    assert_eq!(set.name, "Databases");
    assert_eq!(set.description, "AI-generated set about databases");
    assert_eq!(set.card_type, Some(CardType::Technical));
    assert_eq!(set.cards.len(), 2);

    let prompts = provider.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].prompt.contains("2 technical interview flashcards on databases"));
    assert_eq!(prompts[0].system_prompt.as_deref(), Some(FLASHCARD_SYSTEM_PROMPT));
    assert_eq!(prompts[0].max_tokens, None);
}

#[tokio::test]
async fn test_generate_rejects_bad_input_before_calling_provider() {
    let provider = Arc::new(ScriptedCompletion::new("[]"));
    let generator = FlashcardGenerator::new(provider.clone());

    let blank_topic = generator.generate_for_topic(CardType::Behavioral, "  ", 5).await;
    assert!(matches!(blank_topic, Err(Error::InvalidInput(_))));

    let too_many = generator.generate_for_topic(CardType::Behavioral, "teamwork", 51).await;
    assert!(matches!(too_many, Err(Error::InvalidInput(_))));

    let blank_name = generator.generate_set("", CardType::Behavioral, "teamwork", 5).await;
    assert!(matches!(blank_name, Err(Error::InvalidInput(_))));

    assert!(provider.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unparseable_reply_is_completion_error() {
    let provider = Arc::new(ScriptedCompletion::new("Here are some great questions!"));
    let generator = FlashcardGenerator::new(provider);

    let result = generator.generate_for_topic(CardType::Behavioral, "conflict", 3).await;
    assert!(matches!(result, Err(Error::Completion(_))));
}

#[tokio::test]
async fn test_generated_set_persists() {
    let provider = Arc::new(ScriptedCompletion::new(
        r#"{"flashcards": [{"question": "Tell me about a time you disagreed with a teammate."}]}"#,
    ));
    let generator = FlashcardGenerator::new(provider);
    let storage = Storage::in_memory().unwrap();

    let set = generator
        .generate_set("Conflict", CardType::Behavioral, "conflict", 1)
        .await
        .unwrap();
    storage.create_flashcard_set("user-1", &set).unwrap();

    let sets = storage.list_flashcard_sets("user-1").unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].cards[0].answer, None);
}

// ============ Answer Evaluation ============

#[tokio::test]
async fn test_behavioral_answer_gets_sentiment_and_feedback() {
    let sentiment = Arc::new(CountingSentiment {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let (evaluator, completion) =
        evaluator("I organized the team around weekly goals.", sentiment.clone());

    let feedback = evaluator
        .evaluate(CardType::Behavioral, b"RIFF....".to_vec())
        .await
        .unwrap();

    assert_eq!(feedback.transcript, "I organized the team around weekly goals.");
    assert_eq!(feedback.feedback, "Clear and well structured.");
    assert_eq!(
        feedback.sentiment.as_ref().map(|s| s.label),
        Some(SentimentLabel::Positive)
    );
    assert_eq!(sentiment.calls.load(Ordering::SeqCst), 1);

    let prompts = completion.prompts.lock().unwrap();
    assert!(prompts[0].prompt.contains("tone, confidence, and clarity"));
    assert_eq!(prompts[0].system_prompt.as_deref(), Some(EVALUATION_SYSTEM_PROMPT));
    assert_eq!(prompts[0].max_tokens, Some(FEEDBACK_MAX_TOKENS));
}

#[tokio::test]
async fn test_technical_answer_skips_sentiment() {
    let sentiment = Arc::new(CountingSentiment {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let (evaluator, completion) = evaluator("Use a min-heap of size k.", sentiment.clone());

    let feedback = evaluator
        .evaluate(CardType::Technical, b"RIFF....".to_vec())
        .await
        .unwrap();

    assert!(feedback.sentiment.is_none());
    assert_eq!(sentiment.calls.load(Ordering::SeqCst), 0);
    assert!(completion.prompts.lock().unwrap()[0]
        .prompt
        .contains("correctness and completeness"));
}

#[tokio::test]
async fn test_sentiment_failure_is_not_fatal() {
    let sentiment = Arc::new(CountingSentiment {
        calls: AtomicUsize::new(0),
        fail: true,
    });
    let (evaluator, _) = evaluator("I stayed calm.", sentiment);

    let feedback = evaluator
        .evaluate(CardType::Behavioral, b"RIFF....".to_vec())
        .await
        .unwrap();
    assert!(feedback.sentiment.is_none());
    assert_eq!(feedback.feedback, "Clear and well structured.");
}

#[tokio::test]
async fn test_silent_answer_is_transcription_error() {
    let sentiment = Arc::new(CountingSentiment {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let (evaluator, completion) = evaluator("   ", sentiment);

    let result = evaluator.evaluate(CardType::Behavioral, b"RIFF....".to_vec()).await;
    assert!(matches!(result, Err(Error::Transcription(_))));
    assert!(completion.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_evaluated_attempt_saved_to_history() {
    let sentiment = Arc::new(CountingSentiment {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let (evaluator, _) = evaluator("I shipped it a day early.", sentiment);
    let storage = Storage::in_memory().unwrap();

    let feedback = evaluator
        .evaluate(CardType::Behavioral, b"RIFF....".to_vec())
        .await
        .unwrap();
    let attempt = PracticeAttempt::new(
        CardType::Behavioral,
        Some("Tell me about a deadline.".to_string()),
        &feedback,
        17,
    );
    storage.save_practice_attempt("user-1", &attempt).unwrap();

    let history = storage.list_practice_attempts("user-1", 5).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sentiment.as_deref(), Some("positive"));
    assert_eq!(history[0].question_text.as_deref(), Some("Tell me about a deadline."));
    assert_eq!(history[0].duration_secs, 17);
}
