//! Runtime configuration
//!
//! Values come from the environment first, then from settings persisted in
//! storage, which win when present.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::{
    SETTING_API_BASE_URL, SETTING_AZURE_TEXT_ANALYTICS_ENDPOINT, SETTING_AZURE_TEXT_ANALYTICS_KEY,
    SETTING_DEFAULT_LANGUAGE, SETTING_OPENAI_API_KEY, SETTING_TOTAL_QUESTIONS, Storage,
};
use crate::types::Language;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TOTAL_QUESTIONS: usize = 5;
pub const MAX_TOTAL_QUESTIONS: usize = 20;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the conversation backend (without the `/api/v1` prefix)
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Questions drawn per interview
    pub total_questions: usize,
    pub default_language: Language,
    pub openai_api_key: Option<String>,
    pub azure_text_analytics_endpoint: Option<String>,
    pub azure_text_analytics_key: Option<String>,
    /// Root for the database and saved recordings
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            total_questions: DEFAULT_TOTAL_QUESTIONS,
            default_language: Language::default(),
            openai_api_key: None,
            azure_text_analytics_endpoint: None,
            azure_text_analytics_key: None,
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("intervue"),
        }
    }
}

impl Config {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (environment-style names)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("INTERVUE_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(secs) = get("INTERVUE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| Error::Config(format!("invalid request timeout: {secs}")))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(total) = get("INTERVUE_TOTAL_QUESTIONS") {
            config.total_questions = parse_total_questions(&total)?;
        }
        if let Some(lang) = get("INTERVUE_DEFAULT_LANGUAGE") {
            config.default_language = Language::parse(&lang)
                .ok_or_else(|| Error::Config(format!("unsupported language: {lang}")))?;
        }
        if let Some(dir) = get("INTERVUE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.openai_api_key = get("OPENAI_API_KEY");
        config.azure_text_analytics_endpoint = get("AZURE_TEXT_ANALYTICS_ENDPOINT");
        config.azure_text_analytics_key = get("AZURE_TEXT_ANALYTICS_KEY");

        if config.openai_api_key.is_none() {
            warn!("OpenAI API key not configured - flashcard generation and feedback disabled");
        }

        Ok(config)
    }

    /// Overlay values saved in the settings table
    pub fn apply_settings(mut self, storage: &Storage) -> Result<Self> {
        if let Some(url) = storage.get_setting(SETTING_API_BASE_URL)? {
            self.api_base_url = url;
        }
        if let Some(total) = storage.get_setting(SETTING_TOTAL_QUESTIONS)? {
            self.total_questions = parse_total_questions(&total)?;
        }
        if let Some(lang) = storage.get_setting(SETTING_DEFAULT_LANGUAGE)?
            && let Some(parsed) = Language::parse(&lang)
        {
            self.default_language = parsed;
        }
        if let Some(key) = storage.get_setting(SETTING_OPENAI_API_KEY)? {
            self.openai_api_key = Some(key);
        }
        if let Some(endpoint) = storage.get_setting(SETTING_AZURE_TEXT_ANALYTICS_ENDPOINT)? {
            self.azure_text_analytics_endpoint = Some(endpoint);
        }
        if let Some(key) = storage.get_setting(SETTING_AZURE_TEXT_ANALYTICS_KEY)? {
            self.azure_text_analytics_key = Some(key);
        }
        debug!("Applied persisted settings to configuration");
        Ok(self)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("intervue.db")
    }

    pub fn recordings_dir(&self) -> PathBuf {
        self.data_dir.join("recordings")
    }
}

fn parse_total_questions(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if (1..=MAX_TOTAL_QUESTIONS).contains(&n) => Ok(n),
        _ => Err(Error::Config(format!(
            "total questions must be between 1 and {MAX_TOTAL_QUESTIONS}, got {raw}"
        ))),
    }
}
