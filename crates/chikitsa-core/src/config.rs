use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatcher::DEFAULT_TIMEOUT;
use crate::error::ConfigError;
use crate::language::Language;
use crate::locale::{LocaleOverride, LocaleTable};

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub locales: HashMap<Language, LocaleOverride>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config dir; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_language(language: Language) -> Result<(), ConfigError> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_language = Some(language.as_str().to_string());
        config.save()
    }

    /// `CHIKITSA_SERVICE_URL` and `CHIKITSA_LANGUAGE` win over the file.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("CHIKITSA_SERVICE_URL") {
            self.service_url = Some(url);
        }
        if let Ok(language) = std::env::var("CHIKITSA_LANGUAGE") {
            self.default_language = Some(language);
        }
    }

    pub fn service_url(&self) -> &str {
        self.service_url.as_deref().unwrap_or(DEFAULT_SERVICE_URL)
    }

    pub fn language(&self) -> Result<Language, ConfigError> {
        match &self.default_language {
            Some(lang) => lang.parse(),
            None => Ok(Language::default()),
        }
    }

    /// A zero timeout would fail every request, so it is rejected.
    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        match self.request_timeout_secs {
            Some(0) => Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            )),
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => Ok(DEFAULT_TIMEOUT),
        }
    }

    /// Built-in locales with this config's overrides applied.
    pub fn locale_table(&self) -> Result<LocaleTable, ConfigError> {
        let mut table = LocaleTable::builtin();
        table.apply_overrides(&self.locales)?;
        Ok(table)
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))?;

        Ok(config_dir.join("chikitsa").join("config.json"))
    }
}
