//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (language preferences and backend settings):
//!   Windows: %APPDATA%\subtitle-translator\
//!   macOS:   ~/Library/Application Support/subtitle-translator/
//!   Linux:   ~/.config/subtitle-translator/
//!
//! Data dir (whisper models):
//!   Windows: %LOCALAPPDATA%\subtitle-translator\
//!   macOS:   ~/Library/Application Support/subtitle-translator/
//!   Linux:   ~/.local/share/subtitle-translator/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `preferences.toml`.
    pub config_dir: PathBuf,
    /// Full path to `preferences.toml`.
    pub preferences_file: PathBuf,
    /// Directory for downloaded GGML model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "subtitle-translator";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            preferences_file: config_dir.join("preferences.toml"),
            models_dir: data_dir.join("models"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
