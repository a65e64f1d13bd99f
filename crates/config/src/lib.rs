//! Configuration management for tablechat
//!
//! Loads and saves the JSON config file and layers environment overrides on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, store_dir};

/// Errors in configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Credentials for one model provider
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// Model providers, checked in declaration order
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openrouter: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
}

/// Default model-call parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tool_roundtrips")]
    pub max_tool_roundtrips: u32,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_tool_roundtrips: default_max_tool_roundtrips(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tool_roundtrips() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

/// Airtable access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_id: String,
    #[serde(default = "default_airtable_api_base")]
    pub api_base: String,
    /// Table mentioned to the model when the page does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_table: Option<String>,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_id: String::new(),
            api_base: default_airtable_api_base(),
            default_table: None,
        }
    }
}

fn default_airtable_api_base() -> String {
    "https://api.airtable.com/v0".to_string()
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
            max_duration_secs: default_max_duration_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_allowed_origin() -> String {
    "https://www.wonderland.guru".to_string()
}

fn default_max_duration_secs() -> u64 {
    30
}

/// Local conversation store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

fn default_store_dir() -> String {
    "~/.tablechat/state".to_string()
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub airtable: AirtableConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load from the default location with environment overrides applied
    pub async fn load() -> Result<Self> {
        let path = config_path();
        let mut config = Self::load_from(&path).await?;
        config.apply_env();
        Ok(config)
    }

    /// Load from a specific file; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific file, creating parent directories
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Saving config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup; empty values are ignored
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENROUTER_API_KEY") {
            self.providers.openrouter.api_key = key;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.providers.openai.api_key = key;
        }
        if let Some(key) = get("AIRTABLE_API_KEY") {
            self.airtable.api_key = key;
        }
        if let Some(base) = get("AIRTABLE_BASE_ID") {
            self.airtable.base_id = base;
        }
        if let Some(model) = get("TABLECHAT_MODEL") {
            self.agent.defaults.model = model;
        }
        if let Some(port) = get("TABLECHAT_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid TABLECHAT_PORT: {}", port),
            }
        }
    }

    /// Model provider key, openrouter first
    pub fn api_key(&self) -> Option<String> {
        [&self.providers.openrouter, &self.providers.openai]
            .into_iter()
            .map(|p| p.api_key.clone())
            .find(|k| !k.is_empty())
    }

    /// Model provider base URL matching the selected key
    pub fn api_base(&self) -> Option<String> {
        if !self.providers.openrouter.api_key.is_empty() {
            return self
                .providers
                .openrouter
                .api_base
                .clone()
                .or_else(|| Some("https://openrouter.ai/api/v1".to_string()));
        }

        self.providers
            .openai
            .api_base
            .clone()
            .filter(|b| !b.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn has_airtable_credentials(&self) -> bool {
        !self.airtable.api_key.is_empty() && !self.airtable.base_id.is_empty()
    }

    pub fn default_model(&self) -> String {
        self.agent.defaults.model.clone()
    }

    pub fn max_tool_roundtrips(&self) -> u32 {
        self.agent.defaults.max_tool_roundtrips
    }

    /// Store directory with `~` expanded
    pub fn store_path(&self) -> PathBuf {
        paths::expand_home(&self.store.dir)
    }

    /// Socket address string for the HTTP server
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Write a default config if none exists and prepare the store directory
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("Config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("Created config at {:?}", config_path);
    }

    let config = Config::load_from(&config_path).await?;
    let store = config.store_path();
    tokio::fs::create_dir_all(&store).await?;
    info!("Conversation store ready at {:?}", store);

    Ok(config)
}
