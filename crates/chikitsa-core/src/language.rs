use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Language variant of the conversation.
///
/// Selects both the label set and the diagnosis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Hindi => "hindi",
        }
    }

    pub fn all() -> Vec<Language> {
        vec![Language::English, Language::Hindi]
    }

    /// Name of the language written in that language, for the toggle button.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "हिंदी",
        }
    }

    /// The language after this one, wrapping around.
    pub fn next(&self) -> Language {
        let all = Language::all();
        let idx = all.iter().position(|l| l == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "hi" | "hindi" => Ok(Language::Hindi),
            _ => Err(ConfigError::UnknownLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_aliases() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::English);
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert_eq!("HI".parse::<Language>().unwrap(), Language::Hindi);
        assert_eq!(" hindi ".parse::<Language>().unwrap(), Language::Hindi);
    }

    #[test]
    fn test_parse_unknown_language_fails() {
        let err = "tamil".parse::<Language>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLanguage(ref s) if s == "tamil"));
    }

    #[test]
    fn test_next_wraps_around() {
        assert_eq!(Language::English.next(), Language::Hindi);
        assert_eq!(Language::Hindi.next(), Language::English);
    }

    #[test]
    fn test_default_is_english() {
        assert_eq!(Language::default(), Language::English);
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Language::Hindi).unwrap();
        assert_eq!(json, "\"hindi\"");
        let parsed: Language = serde_json::from_str("\"english\"").unwrap();
        assert_eq!(parsed, Language::English);
    }
}
