//! Core `Translator` trait and the Ollama-backed implementation.
//!
//! `OllamaTranslator` calls Ollama's native `/api/generate` endpoint with a
//! numbered-lines prompt per chunk.  All connection details come from
//! [`TranslatorConfig`]; nothing is hardcoded.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TranslatorConfig;
use crate::model::{Language, TranscriptSegment, TranslationSegment};
use crate::stt::ProgressFn;
use crate::translate::prompt::{parse_numbered, PromptBuilder};

// ---------------------------------------------------------------------------
// TranslateError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the translation backend.
#[derive(Debug, Clone, Error)]
pub enum TranslateError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("translation request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse backend response: {0}")]
    Parse(String),

    /// The backend returned no usable text.
    #[error("backend returned an empty response")]
    EmptyResponse,

    /// Every attempt failed; the backend is considered unreachable.
    #[error("translation backend unreachable after {attempts} attempt(s): {reason}")]
    BackendUnreachable { attempts: u32, reason: String },
}

impl From<reqwest::Error> for TranslateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranslateError::Timeout
        } else if let Some(status) = e.status() {
            TranslateError::Status(status.as_u16())
        } else {
            TranslateError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Translator trait
// ---------------------------------------------------------------------------

/// Async trait for batch segment translation.
///
/// # Contract
/// * The output has the same length and order as `segments`, with times
///   copied through.
/// * When `source == target`, `translated == original` for every element and
///   no external service is contacted.
/// * `on_progress` receives non-decreasing fractions of the batch done.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_batch(
        &self,
        segments: &[TranscriptSegment],
        source: Language,
        target: Language,
        on_progress: ProgressFn,
    ) -> Result<Vec<TranslationSegment>, TranslateError>;
}

/// Pair every segment with itself as its translation.
pub fn echo_segments(
    segments: &[TranscriptSegment],
    source: Language,
    target: Language,
) -> Vec<TranslationSegment> {
    segments
        .iter()
        .map(|s| TranslationSegment {
            start: s.start,
            end: s.end,
            original: s.text.clone(),
            translated: s.text.clone(),
            source_language: source,
            target_language: target,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// OllamaTranslator
// ---------------------------------------------------------------------------

/// Translates through a local Ollama server.
///
/// Segments are sent in chunks of `batch_size`.  Each chunk request is
/// retried `max_retries` times with linear backoff; a chunk whose retries
/// are exhausted degrades to echoing its original text.  Only when no chunk
/// reaches the backend at all does `translate_batch` fail with
/// [`TranslateError::BackendUnreachable`].
pub struct OllamaTranslator {
    client: reqwest::Client,
    config: TranslatorConfig,
}

impl OllamaTranslator {
    /// Build from application config.  The HTTP client carries the
    /// per-request timeout from `config.timeout_secs`.
    pub fn from_config(config: &TranslatorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    /// One `/api/generate` round trip.
    async fn generate(&self, prompt: &str) -> Result<String, TranslateError> {
        let body = serde_json::json!({
            "model":  self.config.model,
            "prompt": prompt,
            "stream": false
        });

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))?;

        let text = json["response"]
            .as_str()
            .ok_or(TranslateError::EmptyResponse)?
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(TranslateError::EmptyResponse);
        }
        Ok(text)
    }

    /// [`generate`](Self::generate) with bounded retries.
    ///
    /// Attempt `n` (1-based) that fails is followed by a pause of
    /// `n × retry_backoff_secs` unless it was the last one.
    async fn generate_with_retry(&self, prompt: &str) -> Result<String, TranslateError> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = TranslateError::EmptyResponse;

        for attempt in 1..=attempts {
            match self.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    log::debug!("translate: attempt {attempt}/{attempts} failed: {e}");
                    last_error = e;
                }
            }
            if attempt < attempts {
                let wait = self.config.retry_backoff_secs * u64::from(attempt);
                tokio::time::sleep(Duration::from_secs(wait)).await;
            }
        }

        Err(TranslateError::BackendUnreachable {
            attempts,
            reason: last_error.to_string(),
        })
    }

    /// Translate one chunk, echoing any segment the model did not return.
    async fn translate_chunk(
        &self,
        chunk: &[TranscriptSegment],
        source: Language,
        target: Language,
    ) -> Result<Vec<TranslationSegment>, TranslateError> {
        let prompt = PromptBuilder::new(source, target).build_batch(chunk);
        let response = self.generate_with_retry(&prompt).await?;
        let mut parsed = parse_numbered(&response, chunk.len());

        if parsed.len() < chunk.len() {
            log::debug!(
                "translate: model answered {}/{} lines; echoing the rest",
                parsed.len(),
                chunk.len()
            );
        }

        Ok(chunk
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                let translated = parsed.remove(&(i + 1)).unwrap_or_else(|| seg.text.clone());
                TranslationSegment {
                    start: seg.start,
                    end: seg.end,
                    original: seg.text.clone(),
                    translated,
                    source_language: source,
                    target_language: target,
                }
            })
            .collect())
    }

    /// Translate a single sentence.
    ///
    /// Never fails: returns `text` unchanged when it is blank, when no
    /// translation is needed, or when the backend cannot be reached.
    pub async fn translate_one(&self, text: &str, source: Language, target: Language) -> String {
        if text.trim().is_empty() || source == target {
            return text.to_string();
        }
        let prompt = PromptBuilder::new(source, target).build_sentence(text);
        match self.generate_with_retry(&prompt).await {
            Ok(translated) => translated,
            Err(e) => {
                log::warn!("translate: sentence translation failed, keeping original: {e}");
                text.to_string()
            }
        }
    }
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate_batch(
        &self,
        segments: &[TranscriptSegment],
        source: Language,
        target: Language,
        on_progress: ProgressFn,
    ) -> Result<Vec<TranslationSegment>, TranslateError> {
        if segments.is_empty() || source == target {
            on_progress(1.0);
            return Ok(echo_segments(segments, source, target));
        }

        let batch_size = self.config.batch_size.max(1);
        let chunk_count = segments.len().div_ceil(batch_size);
        let mut out = Vec::with_capacity(segments.len());
        let mut failed = 0usize;
        let mut last_error = None;

        for (n, chunk) in segments.chunks(batch_size).enumerate() {
            match self.translate_chunk(chunk, source, target).await {
                Ok(translated) => out.extend(translated),
                Err(e) => {
                    log::warn!(
                        "translate: chunk {}/{chunk_count} failed, keeping originals: {e}",
                        n + 1
                    );
                    failed += 1;
                    last_error = Some(e);
                    out.extend(echo_segments(chunk, source, target));
                }
            }
            on_progress((n + 1) as f32 / chunk_count as f32);
        }

        match last_error {
            Some(e) if failed == chunk_count => Err(e),
            _ => Ok(out),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingTranslator  (test-only)
// ---------------------------------------------------------------------------

/// Test double that "translates" by prefixing the target code and counts
/// calls.  It honours the same-language contract itself.
#[cfg(test)]
pub struct RecordingTranslator {
    fail: bool,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl RecordingTranslator {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: Default::default(),
        }
    }

    /// Translator whose backend is always unreachable.
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Default::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl Translator for RecordingTranslator {
    async fn translate_batch(
        &self,
        segments: &[TranscriptSegment],
        source: Language,
        target: Language,
        on_progress: ProgressFn,
    ) -> Result<Vec<TranslationSegment>, TranslateError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail {
            return Err(TranslateError::BackendUnreachable {
                attempts: 3,
                reason: "connection refused".into(),
            });
        }
        on_progress(0.5);
        let out = if source == target {
            echo_segments(segments, source, target)
        } else {
            segments
                .iter()
                .map(|s| s.translated(format!("{target}:{}", s.text), target))
                .collect()
        };
        on_progress(1.0);
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::no_progress;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn segs(texts: &[&str]) -> Vec<TranscriptSegment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TranscriptSegment::new(i as f64, i as f64 + 1.0, *t, Language::Ja))
            .collect()
    }

    fn config(base_url: impl Into<String>) -> TranslatorConfig {
        TranslatorConfig {
            base_url: base_url.into(),
            timeout_secs: 5,
            max_retries: 2,
            retry_backoff_secs: 0,
            batch_size: 2,
            ..TranslatorConfig::default()
        }
    }

    /// Minimal HTTP server answering each connection with the next canned
    /// `/api/generate` body.  Returns its base URL.
    async fn fake_ollama(replies: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for reply in replies {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                read_request(&mut sock).await;
                let body = serde_json::json!({ "response": reply }).to_string();
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = sock.write_all(head.as_bytes()).await;
                let _ = sock.write_all(body.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    async fn read_request(sock: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(n) = sock.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    #[test]
    fn echo_keeps_times_and_text() {
        let out = echo_segments(&segs(&["a", "b"]), Language::Ja, Language::Ja);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|s| s.original == s.translated));
        assert_eq!(out[1].start, 1.0);
    }

    #[tokio::test]
    async fn same_language_never_contacts_backend() {
        // Port 9 (discard) is never an Ollama server; any request would fail.
        let t = OllamaTranslator::from_config(&config("http://127.0.0.1:9"));
        let out = t
            .translate_batch(&segs(&["x", "y", "z"]), Language::Zh, Language::Zh, no_progress())
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|s| s.translated == s.original));
    }

    #[tokio::test]
    async fn unreachable_backend_fails_whole_batch() {
        let t = OllamaTranslator::from_config(&config("http://127.0.0.1:9"));
        let err = t
            .translate_batch(&segs(&["a", "b", "c"]), Language::Ja, Language::Zh, no_progress())
            .await
            .unwrap_err();
        assert!(
            matches!(err, TranslateError::BackendUnreachable { attempts: 2, .. }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn translate_one_returns_input_on_failure() {
        let t = OllamaTranslator::from_config(&config("http://127.0.0.1:9"));
        assert_eq!(t.translate_one("こんにちは", Language::Ja, Language::Zh).await, "こんにちは");
        assert_eq!(t.translate_one("same", Language::En, Language::En).await, "same");
    }

    #[tokio::test]
    async fn chunks_are_translated_in_order() {
        let url = fake_ollama(vec!["[1] 一\n[2] 二", "[1] 三"]).await;
        let t = OllamaTranslator::from_config(&config(url));
        let out = t
            .translate_batch(&segs(&["ichi", "ni", "san"]), Language::Ja, Language::Zh, no_progress())
            .await
            .unwrap();

        let translated: Vec<_> = out.iter().map(|s| s.translated.as_str()).collect();
        assert_eq!(translated, vec!["一", "二", "三"]);
        assert_eq!(out[2].original, "san");
        assert_eq!(out[2].start, 2.0);
        assert!(out.iter().all(|s| s.target_language == Language::Zh));
    }

    #[tokio::test]
    async fn progress_advances_per_chunk() {
        let url = fake_ollama(vec!["[1] 一\n[2] 二", "[1] 三"]).await;
        let t = OllamaTranslator::from_config(&config(url));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        t.translate_batch(
            &segs(&["ichi", "ni", "san"]),
            Language::Ja,
            Language::Zh,
            Arc::new(move |p| sink.lock().unwrap().push(p)),
        )
        .await
        .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0.5, 1.0]);
    }

    #[tokio::test]
    async fn missing_lines_echo_original() {
        let url = fake_ollama(vec!["[2] 二"]).await;
        let t = OllamaTranslator::from_config(&config(url));
        let out = t
            .translate_batch(&segs(&["ichi", "ni"]), Language::Ja, Language::Zh, no_progress())
            .await
            .unwrap();
        assert_eq!(out[0].translated, "ichi");
        assert_eq!(out[1].translated, "二");
    }

    #[tokio::test]
    async fn failed_chunk_degrades_when_another_succeeds() {
        // Only one reply: the second chunk's connections are refused once the
        // listener task ends.
        let url = fake_ollama(vec!["[1] 一\n[2] 二"]).await;
        let t = OllamaTranslator::from_config(&config(url));
        let out = t
            .translate_batch(&segs(&["ichi", "ni", "san"]), Language::Ja, Language::Zh, no_progress())
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].translated, "二");
        assert_eq!(out[2].translated, "san");
    }

    #[tokio::test]
    async fn recording_translator_counts_calls() {
        let t = RecordingTranslator::new();
        let out = t
            .translate_batch(&segs(&["a"]), Language::Ja, Language::Zh, no_progress())
            .await
            .unwrap();
        assert_eq!(out[0].translated, "zh:a");
        assert_eq!(t.call_count(), 1);
    }

    #[test]
    fn translator_is_object_safe() {
        let t: Box<dyn Translator> =
            Box::new(OllamaTranslator::from_config(&TranslatorConfig::default()));
        drop(t);
    }
}
