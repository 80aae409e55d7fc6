use serde::{Deserialize, Serialize};
use std::fs;
use anyhow::Result;

use crate::persona::Persona;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub persona: Persona,
    #[serde(default)]
    pub assistant_service: AssistantServiceConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
    /// Seconds between run status polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Maximum polls before a run is abandoned with a timeout error.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantServiceConfig {
    #[serde(default = "default_assistant_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Filled from ASSISTANT_API_KEY at load time; never read from the file.
    #[serde(skip)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_news_base_url")]
    pub news_base_url: String,
    #[serde(default = "default_recipe_base_url")]
    pub recipe_base_url: String,
    #[serde(skip)]
    pub news_api_key: String,
    #[serde(skip)]
    pub recipe_api_key: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_store_dir() -> String {
    "assistant_store".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_polls() -> u32 {
    60
}

fn default_assistant_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo-16k".to_string()
}

fn default_news_base_url() -> String {
    "https://newsapi.org".to_string()
}

fn default_recipe_base_url() -> String {
    "https://api.spoonacular.com".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;

        // Determine file type by extension
        let path_lower = path.to_lowercase();
        let mut config: Config = if path_lower.ends_with(".json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.overlay_env();
        Ok(config)
    }

    /// Secrets come from the process environment, matching how the service
    /// is deployed. A missing key is not fatal here; the first outbound call
    /// using it fails instead, so we only warn.
    fn overlay_env(&mut self) {
        self.assistant_service.api_key =
            std::env::var("ASSISTANT_API_KEY").unwrap_or_default();
        self.lookup.news_api_key = std::env::var("NEWS_API_KEY").unwrap_or_default();
        self.lookup.recipe_api_key =
            std::env::var("SPOONACULAR_API_KEY").unwrap_or_default();

        if self.assistant_service.api_key.is_empty() {
            tracing::warn!("ASSISTANT_API_KEY is not set; assistant calls will fail");
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            system: SystemConfig::default(),
            persona: Persona::default(),
            assistant_service: AssistantServiceConfig::default(),
            lookup: LookupConfig::default(),
        };
        config.overlay_env();
        config
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store_dir: default_store_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            max_polls: default_max_polls(),
        }
    }
}

impl Default for AssistantServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_assistant_base_url(),
            model: default_model(),
            api_key: String::new(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            news_base_url: default_news_base_url(),
            recipe_base_url: default_recipe_base_url(),
            news_api_key: String::new(),
            recipe_api_key: String::new(),
        }
    }
}
