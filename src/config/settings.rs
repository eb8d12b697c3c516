//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every struct is `#[serde(default)]`, so a partial file fills the gaps
//! with built-in values.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};

use super::AppPaths;
use crate::model::Language;

// ---------------------------------------------------------------------------
// LanguageConfig
// ---------------------------------------------------------------------------

/// Source and target language of the translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Language spoken in the audio.
    #[serde(deserialize_with = "source_or_default")]
    pub source: Language,
    /// Language the captions are translated into.
    #[serde(deserialize_with = "target_or_default")]
    pub target: Language,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source: Language::Ja,
            target: Language::Zh,
        }
    }
}

impl LanguageConfig {
    /// Change the source language.  A non-Chinese source resets the target to
    /// Chinese; a Chinese source leaves the target alone.
    pub fn set_source(&mut self, source: Language) {
        self.source = source;
        if source != Language::Zh {
            self.target = Language::default_target_for(source);
        }
    }

    pub fn set_target(&mut self, target: Language) {
        self.target = target;
    }

    /// Whether processing needs the translation backend at all.
    pub fn needs_translation(&self) -> bool {
        self.source != self.target
    }

    /// Human-readable direction, e.g. `"Japanese → Chinese"`.
    pub fn direction_label(&self) -> String {
        format!(
            "{} → {}",
            self.source.display_name(),
            self.target.display_name()
        )
    }
}

fn lenient_language<'de, D>(deserializer: D, fallback: Language) -> Result<Language, D::Error>
where
    D: Deserializer<'de>,
{
    let code = String::deserialize(deserializer)?;
    Ok(code.parse().unwrap_or_else(|_| {
        log::warn!("config: unknown language code {code:?}, using {fallback}");
        fallback
    }))
}

fn source_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<Language, D::Error> {
    lenient_language(d, LanguageConfig::default().source)
}

fn target_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<Language, D::Error> {
    lenient_language(d, LanguageConfig::default().target)
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the whisper recognizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Model id from the registry (e.g. `"medium"`) or a custom file stem.
    pub model: String,
    /// Attempt GPU-accelerated inference when available.
    pub use_gpu: bool,
    /// Upper bound on inference threads.
    pub max_threads: usize,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "medium".into(),
            use_gpu: true,
            max_threads: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// TranslatorConfig
// ---------------------------------------------------------------------------

/// Settings for the Ollama translation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Model tag sent with every request.
    pub model: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Attempts per chunk before it degrades to the original text.
    pub max_retries: u32,
    /// Linear backoff unit: attempt `n` waits `n × retry_backoff_secs`.
    pub retry_backoff_secs: u64,
    /// Segments per request.
    pub batch_size: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".into(),
            model: "qwen2.5:3b".into(),
            timeout_secs: 120,
            max_retries: 3,
            retry_backoff_secs: 3,
            batch_size: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `preferences.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use subtitle_translator::config::AppConfig;
/// use subtitle_translator::model::Language;
///
/// let mut config = AppConfig::load_or_default();
/// config.languages.set_source(Language::Ko);
/// config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub languages: LanguageConfig,
    pub stt: SttConfig,
    pub translator: TranslatorConfig,
}

impl AppConfig {
    /// Load from the platform `preferences.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().preferences_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`load`](Self::load) but never fails: unreadable or corrupt files
    /// are logged and replaced by defaults.
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&AppPaths::new().preferences_file)
    }

    pub fn load_or_default_from(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            log::warn!("config: could not load {}: {e:#}; using defaults", path.display());
            Self::default()
        })
    }

    /// Save to the platform `preferences.toml`, creating parent directories.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().preferences_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
