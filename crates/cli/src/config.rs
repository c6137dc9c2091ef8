//! Configuration loading from toolbridge.toml.

use runtime::{DEFAULT_BASE_URL, DEFAULT_SYSTEM_PROMPT, DiscoveryMode, OpenAiBackend};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use utcp::{ManifestClient, Variables};

pub const CONFIG_FILE: &str = "toolbridge.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Model provider configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Tool discovery and invocation.
    #[serde(default)]
    pub utcp: UtcpConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend provider configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Provider name (currently only "openai" supported).
    pub provider: String,

    /// Model to use.
    pub model: String,

    /// Bearer token. Overridden by `OPENAI_API_KEY`.
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    pub max_tokens: Option<u32>,

    /// Timeout for a single model call.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: None,
            timeout_secs: 120,
        }
    }
}

/// UTCP client configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UtcpConfig {
    /// Manifest discovery URLs. When several are given the last one wins.
    pub manual_urls: Vec<String>,

    pub discovery: DiscoveryMode,

    /// Per-request timeout for discovery and tool calls.
    pub timeout_secs: u64,

    /// Drop query parameters whose placeholders stay unresolved.
    pub omit_unresolved_query_params: bool,

    /// Values for `${NAME}` placeholders in manifests, such as API keys.
    pub variables: Variables,
}

impl Default for UtcpConfig {
    fn default() -> Self {
        Self {
            manual_urls: Vec::new(),
            discovery: DiscoveryMode::default(),
            timeout_secs: utcp::DEFAULT_TIMEOUT.as_secs(),
            omit_unresolved_query_params: false,
            variables: Variables::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if given, else `toolbridge.toml` if present, else defaults.
    /// Environment overrides are applied last.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE)?,
            None => Self::default(),
        };
        Ok(config.with_env(|name| std::env::var(name).ok()))
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `OPENAI_API_KEY` and `TOOLBRIDGE_MODEL` from `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.backend.api_key = Some(key);
        }
        if let Some(model) = lookup("TOOLBRIDGE_MODEL").filter(|m| !m.is_empty()) {
            self.backend.model = model;
        }
        self
    }

    /// Replace the configured manual URLs when `overrides` is non-empty.
    pub fn manual_urls(&self, overrides: &[String]) -> Result<Vec<String>, ConfigError> {
        let urls = if overrides.is_empty() {
            &self.utcp.manual_urls
        } else {
            overrides
        };
        if urls.is_empty() {
            return Err(ConfigError::MissingManuals);
        }
        Ok(urls.to_vec())
    }

    /// Build the model backend.
    pub fn backend(&self) -> Result<OpenAiBackend, ConfigError> {
        if self.backend.provider != "openai" {
            return Err(ConfigError::UnsupportedProvider(self.backend.provider.clone()));
        }

        let mut builder = OpenAiBackend::builder(&self.backend.model)
            .base_url(&self.backend.base_url)
            .timeout(Duration::from_secs(self.backend.timeout_secs));
        if let Some(key) = &self.backend.api_key {
            builder = builder.api_key(key);
        }
        if let Some(max_tokens) = self.backend.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        builder
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Build the UTCP client.
    pub fn manifest_client(&self) -> Result<ManifestClient, ConfigError> {
        ManifestClient::builder()
            .variables(self.utcp.variables.clone())
            .timeout(Duration::from_secs(self.utcp.timeout_secs))
            .omit_unresolved_query_params(self.utcp.omit_unresolved_query_params)
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unsupported provider '{0}': only 'openai' is available")]
    UnsupportedProvider(String),

    #[error("no manual URLs configured: set utcp.manual_urls or pass --manual")]
    MissingManuals,

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.provider, "openai");
        assert_eq!(config.backend.model, "gpt-4o-mini");
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.utcp.timeout_secs, 30);
        assert_eq!(config.utcp.discovery, DiscoveryMode::EveryCall);
        assert!(!config.utcp.omit_unresolved_query_params);
        assert_eq!(config.chat.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn parses_full_config() {
        let config = Config::parse(
            r#"
            [backend]
            model = "gpt-4o"
            api_key = "sk-file"
            base_url = "http://localhost:11434/v1"
            max_tokens = 512

            [utcp]
            manual_urls = ["https://localhost:7247/api/v1/utcp"]
            discovery = "once"
            timeout_secs = 5
            omit_unresolved_query_params = true

            [utcp.variables]
            WEATHER_KEY = "s3cret"

            [chat]
            system_prompt = "Answer in French."
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.model, "gpt-4o");
        assert_eq!(config.backend.max_tokens, Some(512));
        assert_eq!(config.utcp.manual_urls, ["https://localhost:7247/api/v1/utcp"]);
        assert_eq!(config.utcp.discovery, DiscoveryMode::Once);
        assert_eq!(config.utcp.timeout_secs, 5);
        assert!(config.utcp.omit_unresolved_query_params);
        assert_eq!(config.utcp.variables["WEATHER_KEY"], "s3cret");
        assert_eq!(config.chat.system_prompt, "Answer in French.");
        assert!(config.backend().is_ok());
        assert!(config.manifest_client().is_ok());
    }

    #[test]
    fn environment_overrides_file() {
        let config = Config::parse("[backend]\napi_key = \"sk-file\"\nmodel = \"gpt-4o\"")
            .unwrap()
            .with_env(|name| match name {
                "OPENAI_API_KEY" => Some("sk-env".to_string()),
                "TOOLBRIDGE_MODEL" => Some(String::new()),
                _ => None,
            });
        assert_eq!(config.backend.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.backend.model, "gpt-4o");
    }

    #[test]
    fn manual_override_replaces_configured_urls() {
        let config = Config::parse("[utcp]\nmanual_urls = [\"http://a/utcp\"]").unwrap();
        assert_eq!(config.manual_urls(&[]).unwrap(), ["http://a/utcp"]);
        assert_eq!(
            config.manual_urls(&["http://b/utcp".to_string()]).unwrap(),
            ["http://b/utcp"]
        );
        assert!(matches!(
            Config::default().manual_urls(&[]),
            Err(ConfigError::MissingManuals)
        ));
    }

    #[test]
    fn rejects_unknown_provider_and_bad_discovery() {
        let config = Config::parse("[backend]\nprovider = \"anthropic\"").unwrap();
        assert!(matches!(
            config.backend(),
            Err(ConfigError::UnsupportedProvider(p)) if p == "anthropic"
        ));
        assert!(matches!(
            Config::parse("[utcp]\ndiscovery = \"sometimes\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
