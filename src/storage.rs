//! SQLite storage layer for settings, flashcard sets and practice history

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::evaluation::PracticeAttempt;
use crate::migrations::run_migrations;
use crate::types::{CardType, Flashcard, FlashcardSet, FlashcardSetId};

/// Storage backend using SQLite
pub struct Storage {
    conn: Mutex<Connection>,
}

pub const SETTING_API_BASE_URL: &str = "api_base_url";
pub const SETTING_TOTAL_QUESTIONS: &str = "total_questions";
pub const SETTING_DEFAULT_LANGUAGE: &str = "default_language";
pub const SETTING_OPENAI_API_KEY: &str = "openai_api_key";
pub const SETTING_AZURE_TEXT_ANALYTICS_ENDPOINT: &str = "azure_text_analytics_endpoint";
pub const SETTING_AZURE_TEXT_ANALYTICS_KEY: &str = "azure_text_analytics_key";

impl Storage {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&conn)?;
        info!("Database schema initialized");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ========== Settings ==========

    /// Save or update a setting value
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Get a setting value
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    // ========== Flashcard sets ==========

    /// Save a new flashcard set owned by `user_id`
    pub fn create_flashcard_set(&self, user_id: &str, set: &FlashcardSet) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO flashcard_sets (id, user_id, name, description, card_type, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                set.id.to_string(),
                user_id,
                set.name,
                set.description,
                set.card_type.map(|t| t.as_str()),
                format_timestamp(set.created_at),
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO flashcards (set_id, position, question, answer) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, card) in set.cards.iter().enumerate() {
                stmt.execute(params![
                    set.id.to_string(),
                    position as i64,
                    card.question,
                    card.answer,
                ])?;
            }
        }
        tx.commit()?;
        debug!(
            "Saved flashcard set {} ({} cards) for user {}",
            set.id,
            set.cards.len(),
            user_id
        );
        Ok(())
    }

    /// All sets owned by `user_id`, newest first
    pub fn list_flashcard_sets(&self, user_id: &str) -> Result<Vec<FlashcardSet>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, description, card_type, created_at
            FROM flashcard_sets
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )?;

        let mut sets = stmt
            .query_map(params![user_id], read_set_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for set in &mut sets {
            set.cards = load_cards(&conn, &set.id)?;
        }

        Ok(sets)
    }

    /// One set by id, only when owned by `user_id`
    pub fn get_flashcard_set(&self, user_id: &str, id: &FlashcardSetId) -> Result<Option<FlashcardSet>> {
        let conn = self.conn.lock();
        let set = conn
            .query_row(
                r#"
                SELECT id, name, description, card_type, created_at
                FROM flashcard_sets
                WHERE user_id = ?1 AND id = ?2
                "#,
                params![user_id, id.to_string()],
                read_set_row,
            )
            .optional()?;

        match set {
            Some(mut set) => {
                set.cards = load_cards(&conn, &set.id)?;
                Ok(Some(set))
            }
            None => Ok(None),
        }
    }

    /// Delete a set and its cards. Returns false when nothing matched.
    pub fn delete_flashcard_set(&self, user_id: &str, id: &FlashcardSetId) -> Result<bool> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute(
            "DELETE FROM flashcard_sets WHERE user_id = ?1 AND id = ?2",
            params![user_id, id.to_string()],
        )?;
        debug!("Deleted flashcard set {}: {} rows affected", id, rows_affected);
        Ok(rows_affected > 0)
    }

    pub fn flashcard_set_count(&self, user_id: &str) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM flashcard_sets WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ========== Practice history ==========

    pub fn save_practice_attempt(&self, user_id: &str, attempt: &PracticeAttempt) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO practice_attempts
                (id, user_id, card_type, question_text, transcript, sentiment, feedback, duration_secs, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                attempt.id.to_string(),
                user_id,
                attempt.card_type.as_str(),
                attempt.question_text,
                attempt.transcript,
                attempt.sentiment,
                attempt.feedback,
                attempt.duration_secs,
                format_timestamp(attempt.created_at),
            ],
        )?;
        debug!("Saved practice attempt {} for user {}", attempt.id, user_id);
        Ok(())
    }

    /// Most recent attempts by `user_id`, newest first
    pub fn list_practice_attempts(&self, user_id: &str, limit: usize) -> Result<Vec<PracticeAttempt>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, card_type, question_text, transcript, sentiment, feedback, duration_secs, created_at
            FROM practice_attempts
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;

        let attempts = stmt
            .query_map(params![user_id, limit as i64], read_attempt_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(attempts)
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn read_set_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FlashcardSet> {
    let id: String = row.get(0)?;
    let card_type: Option<String> = row.get(3)?;
    let created_at: String = row.get(4)?;

    Ok(FlashcardSet {
        id: Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        name: row.get(1)?,
        description: row.get(2)?,
        cards: Vec::new(),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        card_type: card_type.as_deref().and_then(CardType::parse),
    })
}

fn read_attempt_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PracticeAttempt> {
    let id: String = row.get(0)?;
    let card_type: String = row.get(1)?;
    let created_at: String = row.get(7)?;

    Ok(PracticeAttempt {
        id: Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        card_type: CardType::parse(&card_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("unknown card type: {card_type}").into(),
            )
        })?,
        question_text: row.get(2)?,
        transcript: row.get(3)?,
        sentiment: row.get(4)?,
        feedback: row.get(5)?,
        duration_secs: row.get(6)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
    })
}

fn load_cards(conn: &Connection, set_id: &FlashcardSetId) -> rusqlite::Result<Vec<Flashcard>> {
    let mut stmt = conn.prepare(
        "SELECT question, answer FROM flashcards WHERE set_id = ?1 ORDER BY position",
    )?;
    stmt.query_map(params![set_id.to_string()], |row| {
        Ok(Flashcard {
            question: row.get(0)?,
            answer: row.get(1)?,
        })
    })?
    .collect()
}
