use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATABASE_PATH: &str = "blog.db";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_VERSIONS: usize = 10;
pub const DEFAULT_RESEARCH_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RESEARCH_REQUEST_DELAY_MS: u64 = 1000;

pub const BRAVE_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const PEXELS_API_URL: &str = "https://api.pexels.com/v1";
pub const UNSPLASH_API_URL: &str = "https://api.unsplash.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("unsupported image provider: {0}")]
    UnsupportedImageProvider(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProviderKind {
    Pexels,
    Unsplash,
}

impl ImageProviderKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pexels" => Some(Self::Pexels),
            "unsplash" => Some(Self::Unsplash),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pexels => "pexels",
            Self::Unsplash => "unsplash",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Pexels => "Pexels",
            Self::Unsplash => "Unsplash",
        }
    }

    pub fn home_url(self) -> &'static str {
        match self {
            Self::Pexels => "https://www.pexels.com/",
            Self::Unsplash => "https://unsplash.com/",
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Database
    pub database_path: PathBuf,

    // Research (Brave Search)
    pub brave_api_key: Option<String>,
    pub brave_api_url: String,
    pub research_max_retries: u32,
    pub research_request_delay: Duration,

    // LLM providers
    pub groq_api_key: Option<String>,
    pub groq_api_url: String,
    pub groq_model: String,
    pub openai_api_key: Option<String>,
    pub openai_api_url: String,
    pub openai_model: String,
    pub generation_fallback: bool,

    // Images
    pub image_provider: ImageProviderKind,
    pub pexels_api_key: Option<String>,
    pub pexels_api_url: String,
    pub unsplash_api_key: Option<String>,
    pub unsplash_api_url: String,

    // Editing
    pub max_versions: usize,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let database_path = get("DATABASE_PATH")
            .or_else(|| get("BLOG_DB_PATH"))
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        let max_versions = match get("EDIT_MAX_VERSIONS") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "EDIT_MAX_VERSIONS",
                    value: raw,
                })?,
            None => DEFAULT_MAX_VERSIONS,
        };

        let research_max_retries = get("RESEARCH_MAX_RETRIES")
            .and_then(|raw| raw.parse::<u32>().ok())
            .map(|value| value.min(10))
            .unwrap_or(DEFAULT_RESEARCH_MAX_RETRIES);

        let research_request_delay = Duration::from_millis(
            get("RESEARCH_REQUEST_DELAY_MS")
                .and_then(|raw| raw.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RESEARCH_REQUEST_DELAY_MS),
        );

        let generation_fallback = match get("GENERATION_FALLBACK") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                name: "GENERATION_FALLBACK",
                value: raw,
            })?,
            None => false,
        };

        let pexels_api_key = get("PEXELS_API_KEY");
        let unsplash_api_key = get("UNSPLASH_API_KEY");
        let image_provider = match get("IMAGE_PROVIDER") {
            Some(raw) => ImageProviderKind::parse(&raw)
                .ok_or(ConfigError::UnsupportedImageProvider(raw))?,
            // Prefer Pexels, fall back to Unsplash when only that key exists.
            None if pexels_api_key.is_none() && unsplash_api_key.is_some() => {
                ImageProviderKind::Unsplash
            }
            None => ImageProviderKind::Pexels,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_path: PathBuf::from(database_path),
            brave_api_key: get("BRAVE_API_KEY"),
            brave_api_url: get("BRAVE_API_URL").unwrap_or_else(|| BRAVE_SEARCH_URL.to_string()),
            research_max_retries,
            research_request_delay,
            groq_api_key: get("GROQ_API_KEY"),
            groq_api_url: get("GROQ_API_URL").unwrap_or_else(|| GROQ_API_URL.to_string()),
            groq_model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_api_url: get("OPENAI_API_URL").unwrap_or_else(|| OPENAI_API_URL.to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            generation_fallback,
            image_provider,
            pexels_api_key,
            pexels_api_url: get("PEXELS_API_URL").unwrap_or_else(|| PEXELS_API_URL.to_string()),
            unsplash_api_key,
            unsplash_api_url: get("UNSPLASH_API_URL")
                .unwrap_or_else(|| UNSPLASH_API_URL.to_string()),
            max_versions,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// API key for the configured image provider, if any.
    pub fn image_api_key(&self) -> Option<&str> {
        match self.image_provider {
            ImageProviderKind::Pexels => self.pexels_api_key.as_deref(),
            ImageProviderKind::Unsplash => self.unsplash_api_key.as_deref(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(config.max_versions, DEFAULT_MAX_VERSIONS);
        assert_eq!(config.image_provider, ImageProviderKind::Pexels);
        assert!(config.brave_api_key.is_none());
        assert!(!config.generation_fallback);
    }

    #[test]
    fn database_path_prefers_database_path_over_blog_db_path() {
        let config = config_from(&[("DATABASE_PATH", "a.db"), ("BLOG_DB_PATH", "b.db")]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("a.db"));

        let config = config_from(&[("BLOG_DB_PATH", "b.db")]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("b.db"));
    }

    #[test]
    fn blank_keys_are_treated_as_missing() {
        let config = config_from(&[("GROQ_API_KEY", "   ")]).unwrap();
        assert!(config.groq_api_key.is_none());
    }

    #[test]
    fn unsplash_is_selected_when_it_is_the_only_image_key() {
        let config = config_from(&[("UNSPLASH_API_KEY", "u")]).unwrap();
        assert_eq!(config.image_provider, ImageProviderKind::Unsplash);
        assert_eq!(config.image_api_key(), Some("u"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("EDIT_MAX_VERSIONS", "0")]).is_err());
        assert!(config_from(&[("GENERATION_FALLBACK", "maybe")]).is_err());
        assert!(config_from(&[("IMAGE_PROVIDER", "flickr")]).is_err());
    }
}
