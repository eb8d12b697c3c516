//! Headless entry point — translate subtitles for a batch of audio files.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (defaults on first run); CLI language
//!    flags override it and are persisted.
//! 3. Create the [`tokio`] runtime.
//! 4. Load the whisper model once and build the Ollama translator.
//! 5. Queue the files, run auto mode to completion, and write a `.txt`
//!    export plus a `.json` result for every finished file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use subtitle_translator::{
    audio::FileAudioLoader,
    cache::SubtitleTrack,
    config::{AppConfig, AppPaths},
    export::{write_text, ExportOptions},
    model::{Language, TranslationResult},
    pipeline::{Collaborators, Notification, Orchestrator, PipelineError},
    queue::QueueStore,
    stt::{find_model_by_id, optimal_threads, ModelPaths, RecognizerParams, WhisperRecognizer},
    translate::OllamaTranslator,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Recognise and translate speech in audio files.
#[derive(Parser, Debug)]
#[command(name = "subtitle-translator", version)]
struct Cli {
    /// Spoken language (ja, en, ko, zh). Saved as the new default.
    #[arg(long, value_name = "LANG")]
    source: Option<Language>,

    /// Subtitle language (ja, en, ko, zh). Saved as the new default.
    #[arg(long, value_name = "LANG")]
    target: Option<Language>,

    /// Write exports here instead of next to each audio file.
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Audio files (.wav, .mp3); at most five are processed.
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// Export helpers
// ---------------------------------------------------------------------------

fn export_path(audio: &Path, export_dir: Option<&Path>, extension: &str) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitles".into());
    let dir = export_dir
        .map(Path::to_path_buf)
        .or_else(|| audio.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{stem}.{extension}"))
}

fn write_outputs(
    identity: &str,
    track: &SubtitleTrack,
    config: &AppConfig,
    export_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let audio = Path::new(identity);

    let txt = export_path(audio, export_dir, "txt");
    write_text(&txt, track.segments(), ExportOptions::BOTH)
        .with_context(|| format!("writing {}", txt.display()))?;

    let result = TranslationResult::new(
        identity,
        config.languages.source,
        config.languages.target,
        track.segments().to_vec(),
    );
    let json = export_path(audio, export_dir, "json");
    std::fs::write(&json, result.to_json()?)
        .with_context(|| format!("writing {}", json.display()))?;
    log::info!("saved {} and {}", txt.display(), json.display());
    Ok(())
}

/// Advice for a failure that may clear up on its own.
fn failure_hint(error: &PipelineError) -> Option<&'static str> {
    error
        .is_transient()
        .then_some("temporary failure; rerun once the translation backend is reachable")
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    // Whisper model (loaded once, reused for every file)
    let model_id = config.stt.model.as_str();
    let model_path = ModelPaths::from_app_paths(&AppPaths::new()).resolve(model_id);
    let params = RecognizerParams {
        n_threads: optimal_threads(config.stt.max_threads),
        ..RecognizerParams::default()
    };
    let recognizer = WhisperRecognizer::load(&model_path, params, config.stt.use_gpu)
        .with_context(|| match find_model_by_id(model_id) {
            Some(info) => format!(
                "whisper model '{model_id}' missing; download it from {} into {}",
                info.download_url(),
                model_path.display()
            ),
            None => format!("could not load whisper model {}", model_path.display()),
        })?;
    log::info!("Whisper model loaded: {}", model_path.display());

    let collab = Collaborators::new(
        Arc::new(FileAudioLoader::new()),
        Arc::new(recognizer),
        Arc::new(OllamaTranslator::from_config(&config.translator)),
    );
    let mut orc = Orchestrator::new(collab, config.languages.clone());

    let paths: Vec<String> = cli
        .files
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let admitted = orc.add_files(&paths).await;
    if admitted < paths.len() {
        log::warn!(
            "{} file(s) skipped: only .wav/.mp3 are supported and at most {} files are queued",
            paths.len() - admitted,
            QueueStore::MAX_ITEMS
        );
    }
    if admitted == 0 {
        anyhow::bail!("no files to process");
    }

    let export_dir = cli.export_dir.as_deref();
    if let Some(dir) = export_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut failures = 0usize;
    orc.start_auto().await;
    while let Some(notification) = orc.next_notification().await {
        match notification {
            Notification::Started { identity } => {
                log::info!("{identity}: started ({})", config.languages.direction_label());
            }
            Notification::Progress {
                identity,
                fraction,
                stage,
            } => {
                log::info!("{identity}: {} {:>3.0}%", stage.label(), fraction * 100.0);
            }
            Notification::Ready {
                identity, track, ..
            } => {
                log::info!("{identity}: {} caption(s) ready", track.len());
                if let Err(e) = write_outputs(&identity, &track, &config, export_dir) {
                    log::error!("{identity}: export failed: {e:#}");
                    failures += 1;
                }
            }
            Notification::Failed { identity, error } => {
                log::error!("{identity}: {error}");
                if let Some(hint) = failure_hint(&error) {
                    log::warn!("{identity}: {hint}");
                }
                failures += 1;
            }
            Notification::Cancelled { identity } => {
                log::warn!("{identity}: cancelled");
            }
            Notification::AutoFinished | Notification::QueueFinished => {}
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {admitted} file(s) failed");
    }
    log::info!("all {admitted} file(s) done");
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // 2. Configuration
    let mut config = AppConfig::load_or_default();
    if cli.source.is_some() || cli.target.is_some() {
        if let Some(source) = cli.source {
            config.languages.set_source(source);
        }
        if let Some(target) = cli.target {
            config.languages.set_target(target);
        }
        if let Err(e) = config.save() {
            log::warn!("Failed to save language preferences: {e:#}");
        }
    }
    log::info!(
        "subtitle-translator starting ({})",
        config.languages.direction_label()
    );

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(cli, config))
}
