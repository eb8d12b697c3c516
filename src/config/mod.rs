//! Configuration module.
//!
//! Provides `AppConfig` (language pair, recognizer and translator settings),
//! `AppPaths` for cross-platform directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, LanguageConfig, SttConfig, TranslatorConfig};
