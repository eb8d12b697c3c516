//! Prompt construction and response parsing for the translation backend.
//!
//! A chunk of segments is sent as numbered lines:
//!
//! ```text
//! [1] 今日はいい天気ですね
//! [2] 散歩に行きましょう
//! ```
//!
//! and the model is asked to answer with the same markers.  Parsing is
//! tolerant: content may span several lines, markers may come back out of
//! order, and anything the model dropped is simply absent from the result.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Language, TranscriptSegment};

const BATCH_INSTRUCTION: &str = "\
You are a subtitle translator.
Translate each numbered line below from {source} into {target}.

Rules:
1. Keep the [number] marker at the start of every translated line.
2. Translate every line; do not merge, split or drop lines.
3. Reply with ONLY the translated lines, no explanation.";

const SENTENCE_INSTRUCTION: &str = "\
Translate the following {source} text into natural {target}.
Smooth out spoken or awkward phrasing, but do not add content.
Reply with ONLY the translation.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds flat prompts for Ollama's `/api/generate`.
///
/// # Example
/// ```rust
/// use subtitle_translator::model::{Language, TranscriptSegment};
/// use subtitle_translator::translate::PromptBuilder;
///
/// let builder = PromptBuilder::new(Language::Ja, Language::Zh);
/// let segs = [TranscriptSegment::new(0.0, 1.0, "こんにちは", Language::Ja)];
/// let prompt = builder.build_batch(&segs);
/// assert!(prompt.contains("[1] こんにちは"));
/// assert!(prompt.contains("Japanese"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    source: Language,
    target: Language,
}

impl PromptBuilder {
    pub fn new(source: Language, target: Language) -> Self {
        Self { source, target }
    }

    /// Prompt for one chunk.  Markers are 1-based positions in `segments`;
    /// blank segments keep their number but are not sent.
    pub fn build_batch(&self, segments: &[TranscriptSegment]) -> String {
        let mut prompt = String::with_capacity(512 + segments.len() * 64);
        prompt.push_str(&self.fill(BATCH_INSTRUCTION));
        prompt.push_str("\n\n");
        for (i, seg) in segments.iter().enumerate() {
            let text = seg.text.trim();
            if text.is_empty() {
                continue;
            }
            prompt.push_str(&format!("[{}] {}\n", i + 1, text));
        }
        prompt.push_str("\nTranslation:\n");
        prompt
    }

    /// Prompt for a single free-standing sentence.
    pub fn build_sentence(&self, text: &str) -> String {
        format!("{}\n\n{}\n", self.fill(SENTENCE_INSTRUCTION), text.trim())
    }

    fn fill(&self, template: &str) -> String {
        template
            .replace("{source}", self.source.display_name())
            .replace("{target}", self.target.display_name())
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("valid marker regex"))
}

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[(\d+)\]\s*(.+)$").expect("valid line regex"))
}

/// Extract `number → text` pairs from a model response.
///
/// The first pass takes everything between consecutive markers (so a
/// translation may wrap onto several lines).  If that yields fewer than
/// `expected` entries, a line-by-line pass fills in numbers still missing.
/// Empty contents are ignored.
pub fn parse_numbered(response: &str, expected: usize) -> HashMap<usize, String> {
    let mut result = HashMap::new();

    let markers: Vec<_> = marker_re().captures_iter(response).collect();
    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(response.len(), |m| m.start());
        let content = response[whole.end()..end].trim();
        if content.is_empty() {
            continue;
        }
        if let Ok(n) = num.as_str().parse::<usize>() {
            result.insert(n, content.to_string());
        }
    }

    if result.len() < expected {
        for line in response.lines() {
            let Some(caps) = line_re().captures(line) else {
                continue;
            };
            let Ok(n) = caps[1].parse::<usize>() else {
                continue;
            };
            let content = caps[2].trim();
            if !content.is_empty() {
                result.entry(n).or_insert_with(|| content.to_string());
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> TranscriptSegment {
        TranscriptSegment::new(0.0, 1.0, text, Language::Ja)
    }

    #[test]
    fn batch_prompt_numbers_segments_and_names_languages() {
        let p = PromptBuilder::new(Language::Ko, Language::Zh)
            .build_batch(&[seg("안녕"), seg("세계")]);
        assert!(p.contains("from Korean into Chinese"));
        assert!(p.contains("[1] 안녕\n[2] 세계\n"));
        assert!(p.ends_with("Translation:\n"));
    }

    #[test]
    fn blank_segments_keep_their_number() {
        let p = PromptBuilder::new(Language::Ja, Language::Zh)
            .build_batch(&[seg("a"), seg("   "), seg("c")]);
        assert!(p.contains("[1] a\n[3] c\n"));
        assert!(!p.contains("[2]"));
    }

    #[test]
    fn sentence_prompt_contains_text() {
        let p = PromptBuilder::new(Language::En, Language::Zh).build_sentence("  hello  ");
        assert!(p.contains("English"));
        assert!(p.ends_with("hello\n"));
    }

    #[test]
    fn parses_one_marker_per_line() {
        let m = parse_numbered("[1] 你好\n[2] 世界\n", 2);
        assert_eq!(m.len(), 2);
        assert_eq!(m[&1], "你好");
        assert_eq!(m[&2], "世界");
    }

    #[test]
    fn content_may_span_lines() {
        let m = parse_numbered("[1] first\ncontinued\n[2] second", 2);
        assert_eq!(m[&1], "first\ncontinued");
        assert_eq!(m[&2], "second");
    }

    #[test]
    fn markers_on_one_line_are_split() {
        let m = parse_numbered("Here you go: [2] b [1] a", 2);
        assert_eq!(m[&1], "a");
        assert_eq!(m[&2], "b");
    }

    #[test]
    fn missing_numbers_are_absent() {
        let m = parse_numbered("[1] only one", 3);
        assert_eq!(m.len(), 1);
        assert!(!m.contains_key(&2));
    }

    #[test]
    fn empty_content_is_ignored() {
        let m = parse_numbered("[1]\n[2] b", 2);
        assert!(!m.contains_key(&1));
        assert_eq!(m[&2], "b");
    }

    #[test]
    fn no_markers_yields_nothing() {
        assert!(parse_numbered("I cannot translate this.", 1).is_empty());
    }
}
