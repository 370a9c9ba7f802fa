use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::history::{self, Limits};
use crate::locale::Language;
use crate::storage::DEFAULT_QUOTA_BYTES;

fn default_host() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_memory_limit() -> usize {
    history::MEMORY_LIMIT
}

fn default_persist_limit() -> usize {
    history::PERSIST_LIMIT
}

fn default_gallery_limit() -> usize {
    history::GALLERY_LIMIT
}

fn default_storage_quota() -> usize {
    DEFAULT_QUOTA_BYTES
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            host: default_host(),
            api_key: String::new(),
            image_model: default_image_model(),
            text_model: default_text_model(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_memory_limit")]
    pub memory_limit: usize,
    #[serde(default = "default_persist_limit")]
    pub persist_limit: usize,
    #[serde(default = "default_gallery_limit")]
    pub gallery_limit: usize,
    #[serde(default = "default_storage_quota")]
    pub storage_quota_bytes: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            memory_limit: default_memory_limit(),
            persist_limit: default_persist_limit(),
            gallery_limit: default_gallery_limit(),
            storage_quota_bytes: default_storage_quota(),
        }
    }
}

impl HistoryConfig {
    pub fn limits(&self) -> Limits {
        let limits = Limits {
            memory: self.memory_limit,
            persist: self.persist_limit,
            gallery: self.gallery_limit,
        };
        let normalized = limits.normalized();
        if normalized != limits {
            tracing::warn!(?limits, ?normalized, "history limits adjusted");
        }
        normalized
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 960,
            height: 900,
            min_width: 640,
            min_height: 600,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        let mut config = if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                    tracing::error!(error = %e, "error parsing config.toml, using defaults");
                    Config::default()
                }),
                Err(e) => {
                    tracing::error!(error = %e, "error reading config.toml, using defaults");
                    Config::default()
                }
            }
        } else {
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            Config::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        if config.gemini.api_key.is_empty() {
            tracing::warn!("no Gemini API key configured; set GEMINI_API_KEY or gemini.api_key");
        }
        config
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// `GEMINI_API_KEY` wins over `API_KEY`, both win over the file.
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());
        if let Some(key) = key {
            self.gemini.api_key = key.trim().to_string();
        }
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/khayal")
        } else {
            PathBuf::from(".")
        }
    }

    pub fn get_storage_dir() -> PathBuf {
        Self::get_config_dir().join("storage")
    }

    pub fn download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.ui.download_dir {
            return dir.clone();
        }
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join("Downloads")
        } else {
            PathBuf::from(".")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.gemini.image_model, "gemini-2.5-flash-image");
        assert_eq!(config.gemini.text_model, "gemini-2.5-flash");
        assert_eq!(config.history.memory_limit, 10);
        assert_eq!(config.history.persist_limit, 6);
        assert_eq!(config.ui.language, Language::En);
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
[gemini]
api_key = "from-file"

[history]
persist_limit = 4

[ui]
language = "ar"
download_dir = "/tmp/khayal"
"#,
        )
        .unwrap();

        assert_eq!(config.gemini.api_key, "from-file");
        assert_eq!(config.gemini.host, "https://generativelanguage.googleapis.com");
        assert_eq!(config.history.limits(), Limits { memory: 10, persist: 4, gallery: 7 });
        assert_eq!(config.ui.language, Language::Ar);
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/khayal"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(Config::parse("[history]\nmemory_limit = \"lots\"").is_err());
    }

    #[test]
    fn test_limits_are_clamped() {
        let config = Config::parse("[history]\nmemory_limit = 4\npersist_limit = 6").unwrap();
        assert_eq!(config.history.limits(), Limits { memory: 4, persist: 4, gallery: 4 });
    }

    #[test]
    fn test_env_overrides_api_key() {
        let mut config = Config::parse("[gemini]\napi_key = \"from-file\"").unwrap();
        config.apply_env(|name| match name {
            "API_KEY" => Some("generic".to_string()),
            _ => None,
        });
        assert_eq!(config.gemini.api_key, "generic");

        config.apply_env(|name| match name {
            "GEMINI_API_KEY" => Some("specific".to_string()),
            "API_KEY" => Some("generic".to_string()),
            _ => None,
        });
        assert_eq!(config.gemini.api_key, "specific");

        config.apply_env(|_| Some("   ".to_string()));
        assert_eq!(config.gemini.api_key, "specific");
    }
}
