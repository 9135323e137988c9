//! Per-language label sets and endpoint bindings.
//!
//! Everything language-specific the controller needs lives in a
//! [`LocaleTable`]: the static text shown by the front-end, the fallback text
//! used when the diagnosis service fails, and the endpoint path the
//! dispatcher targets. Supporting a new language means adding an entry here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::language::Language;

/// Display text for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    pub title: String,
    pub disclaimer_banner: String,
    pub welcome: String,
    pub placeholder: String,
    pub send: String,
    pub analyzing: String,
    pub new_chat: String,
    pub history: String,
    pub scroll: String,
    pub quit: String,
    pub diagnosis_result: String,
    pub condition: String,
    pub confidence: String,
    pub matched_symptoms: String,
    pub recommendation: String,
    pub user: String,
    /// Bot turn shown instead of a diagnosis when the service fails.
    pub service_unavailable: String,
    pub fallback_disease: String,
    pub fallback_recommendation: String,
    pub fallback_disclaimer: String,
}

impl Labels {
    pub fn english() -> Self {
        Self {
            title: "ChikitsaAI".to_string(),
            disclaimer_banner: "This chatbot provides preliminary screening only. Not a replacement for a doctor.".to_string(),
            welcome: "Hello! I am ChikitsaAI, your AI healthcare assistant. How can I help you today?".to_string(),
            placeholder: "Describe your symptoms...".to_string(),
            send: "Send".to_string(),
            analyzing: "Analyzing".to_string(),
            new_chat: "New Chat".to_string(),
            history: "History".to_string(),
            scroll: "Scroll".to_string(),
            quit: "Quit".to_string(),
            diagnosis_result: "Diagnosis Result".to_string(),
            condition: "Condition:".to_string(),
            confidence: "Confidence:".to_string(),
            matched_symptoms: "Matched Symptoms:".to_string(),
            recommendation: "Recommendation:".to_string(),
            user: "User".to_string(),
            service_unavailable: "Sorry, I'm having trouble connecting to the diagnosis service. Please try again later.".to_string(),
            fallback_disease: "Service Unavailable".to_string(),
            fallback_recommendation: "Please try again later".to_string(),
            fallback_disclaimer: "Error connecting to the diagnosis service".to_string(),
        }
    }

    pub fn hindi() -> Self {
        Self {
            title: "चिकित्साAI".to_string(),
            disclaimer_banner: "यह चैटबॉट केवल प्रारंभिक जांच प्रदान करता है। डॉक्टर का विकल्प नहीं है।".to_string(),
            welcome: "नमस्ते! मैं चिकित्साAI हूं, आपका AI स्वास्थ्य सहायक। आज मैं आपकी कैसे मदद कर सकता हूं?".to_string(),
            placeholder: "अपने लक्षणों का वर्णन करें...".to_string(),
            send: "भेजें".to_string(),
            analyzing: "विश्लेषण कर रहे हैं".to_string(),
            new_chat: "नई चैट".to_string(),
            history: "इतिहास".to_string(),
            scroll: "स्क्रॉल".to_string(),
            quit: "बाहर निकलें".to_string(),
            diagnosis_result: "निदान परिणाम".to_string(),
            condition: "स्थिति:".to_string(),
            confidence: "विश्वास:".to_string(),
            matched_symptoms: "मिलान किए गए लक्षण:".to_string(),
            recommendation: "सिफारिश:".to_string(),
            user: "उपयोगकर्ता".to_string(),
            service_unavailable: "क्षमा करें, निदान सेवा से कनेक्ट होने में समस्या हो रही है। कृपया बाद में पुनः प्रयास करें।".to_string(),
            fallback_disease: "सेवा अनुपलब्ध".to_string(),
            fallback_recommendation: "कृपया बाद में पुनः प्रयास करें".to_string(),
            fallback_disclaimer: "निदान सेवा से कनेक्ट करने में त्रुटि".to_string(),
        }
    }
}

/// Labels plus the endpoint path for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleEntry {
    /// Path appended to the service base URL, e.g. `/predict`.
    pub endpoint: String,
    pub labels: Labels,
}

/// Partial replacement for a locale entry, as read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleTable {
    entries: HashMap<Language, LocaleEntry>,
}

impl LocaleTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// English on `/predict`, Hindi on `/predict-hindi`.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.insert(
            Language::English,
            LocaleEntry {
                endpoint: "/predict".to_string(),
                labels: Labels::english(),
            },
        );
        table.insert(
            Language::Hindi,
            LocaleEntry {
                endpoint: "/predict-hindi".to_string(),
                labels: Labels::hindi(),
            },
        );
        table
    }

    pub fn insert(&mut self, language: Language, entry: LocaleEntry) {
        self.entries.insert(language, entry);
    }

    pub fn get(&self, language: Language) -> Result<&LocaleEntry, ConfigError> {
        self.entries
            .get(&language)
            .ok_or(ConfigError::MissingLocale(language))
    }

    pub fn labels(&self, language: Language) -> Result<&Labels, ConfigError> {
        self.get(language).map(|entry| &entry.labels)
    }

    pub fn contains(&self, language: Language) -> bool {
        self.entries.contains_key(&language)
    }

    /// Apply config-file overrides on top of the current entries.
    ///
    /// An override for a language without an entry must carry both the
    /// endpoint and the labels.
    pub fn apply_overrides(
        &mut self,
        overrides: &HashMap<Language, LocaleOverride>,
    ) -> Result<(), ConfigError> {
        for (language, over) in overrides {
            match self.entries.get_mut(language) {
                Some(entry) => {
                    if let Some(endpoint) = &over.endpoint {
                        entry.endpoint = endpoint.clone();
                    }
                    if let Some(labels) = &over.labels {
                        entry.labels = labels.clone();
                    }
                }
                None => match (&over.endpoint, &over.labels) {
                    (Some(endpoint), Some(labels)) => {
                        self.insert(
                            *language,
                            LocaleEntry {
                                endpoint: endpoint.clone(),
                                labels: labels.clone(),
                            },
                        );
                    }
                    _ => return Err(ConfigError::MissingLocale(*language)),
                },
            }
        }
        Ok(())
    }
}

impl Default for LocaleTable {
    fn default() -> Self {
        Self::builtin()
    }
}
