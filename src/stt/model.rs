//! Whisper model registry and path resolution.
//!
//! All four supported languages are covered by the multilingual ggml
//! checkpoints published with whisper.cpp, so a single registry suffices.
//! [`ModelPaths`] resolves where a model file lives under
//! [`AppPaths::models_dir`](crate::config::AppPaths).

use std::path::PathBuf;

use crate::config::AppPaths;

/// Capacity tier of a ggml checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

/// Static metadata for one ggml model file.
#[derive(Debug)]
pub struct ModelInfo {
    /// Identifier used in `SttConfig::model` (e.g. `"medium"`).
    pub id: &'static str,
    pub size: ModelSize,
    /// File name under the models directory.
    pub file_name: &'static str,
    /// Approximate download size in megabytes.
    pub file_size_mb: u64,
}

const DOWNLOAD_BASE: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Multilingual whisper.cpp checkpoints, smallest first.
pub const WHISPER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "tiny",
        size: ModelSize::Tiny,
        file_name: "ggml-tiny.bin",
        file_size_mb: 75,
    },
    ModelInfo {
        id: "base",
        size: ModelSize::Base,
        file_name: "ggml-base.bin",
        file_size_mb: 142,
    },
    ModelInfo {
        id: "small",
        size: ModelSize::Small,
        file_name: "ggml-small.bin",
        file_size_mb: 466,
    },
    ModelInfo {
        id: "medium",
        size: ModelSize::Medium,
        file_name: "ggml-medium.bin",
        file_size_mb: 1_500,
    },
    ModelInfo {
        id: "large-v3",
        size: ModelSize::Large,
        file_name: "ggml-large-v3.bin",
        file_size_mb: 3_100,
    },
];

impl ModelInfo {
    /// Where the file can be downloaded from.
    pub fn download_url(&self) -> String {
        format!("{DOWNLOAD_BASE}/{}", self.file_name)
    }
}

pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    WHISPER_MODELS.iter().find(|m| m.id == id)
}

/// Resolves model files inside the models directory.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub models_dir: PathBuf,
}

impl ModelPaths {
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self::new(app_paths.models_dir.clone())
    }

    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Path for a configured model id.
    ///
    /// Known ids map to their registry file name; anything else is treated
    /// as a file stem (`<id>.bin`) so custom checkpoints can be dropped in.
    pub fn resolve(&self, id: &str) -> PathBuf {
        match find_model_by_id(id) {
            Some(model) => self.models_dir.join(model.file_name),
            None => self.models_dir.join(format!("{id}.bin")),
        }
    }

    pub fn is_available(&self, id: &str) -> bool {
        self.resolve(id).is_file()
    }
}
