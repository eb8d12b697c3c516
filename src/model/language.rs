//! Supported source / target languages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A language code outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported language: {0} (supported: ja, en, ko, zh)")]
pub struct LanguageError(pub String);

/// Languages understood by both the recognizer and the translator.
///
/// Serialised as the ISO-639-1 code (`"ja"`, `"en"`, `"ko"`, `"zh"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ja,
    En,
    Ko,
    Zh,
}

impl Language {
    /// Every supported language, in display order.
    pub const ALL: [Language; 4] = [Language::Ja, Language::En, Language::Ko, Language::Zh];

    /// ISO-639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
            Language::Ko => "ko",
            Language::Zh => "zh",
        }
    }

    /// Human-readable name used in translation prompts and status text.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::Ja => "Japanese",
            Language::En => "English",
            Language::Ko => "Korean",
            Language::Zh => "Chinese",
        }
    }

    /// The default translation target for a given source.
    ///
    /// Every source translates into Chinese; a Chinese source stays Chinese
    /// (no translation call is made).
    pub fn default_target_for(_source: Language) -> Language {
        Language::Zh
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ja" => Ok(Language::Ja),
            "en" => Ok(Language::En),
            "ko" => Ok(Language::Ko),
            "zh" => Ok(Language::Zh),
            _ => Err(LanguageError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("JA".parse::<Language>().unwrap(), Language::Ja);
        assert_eq!(" zh ".parse::<Language>().unwrap(), Language::Zh);
    }

    #[test]
    fn rejects_unknown_code() {
        let err = "fr".parse::<Language>().unwrap_err();
        assert!(err.to_string().contains("fr"));
    }

    #[test]
    fn code_round_trips_through_from_str() {
        for lang in Language::ALL {
            assert_eq!(lang.code().parse::<Language>().unwrap(), lang);
        }
    }

    #[test]
    fn serde_uses_lowercase_code() {
        let json = serde_json::to_string(&Language::Ko).unwrap();
        assert_eq!(json, "\"ko\"");
    }

    #[test]
    fn default_target_is_chinese() {
        assert_eq!(Language::default_target_for(Language::En), Language::Zh);
        assert_eq!(Language::default_target_for(Language::Zh), Language::Zh);
    }
}
