use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use dd_research::ResearchConfig;
use dd_web::{HttpConfig, DEFAULT_USER_AGENT};

/// Environment variable prefix; nested keys use `__`
/// (e.g. `DEEPDUCK_RESEARCH__URLS_PER_ROUND=2`).
pub const ENV_PREFIX: &str = "DEEPDUCK_";

pub const DEFAULT_PROVIDER: &str = "gemini";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub web: WebSettings,
}

/// The `[provider]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider name; also selects the `<NAME>_API_KEY` env var.
    #[serde(default)]
    pub name: Option<String>,

    /// `gemini` or `openai`. Inferred from the name or base_url when unset.
    #[serde(default, rename = "type")]
    pub provider_type: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI-compatible endpoint (Ollama, vLLM, OpenRouter, ...)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_page_chars() -> usize {
    dd_web::fetch::DEFAULT_MAX_PAGE_CHARS
}

/// The `[web]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSettings {
    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Characters kept from each fetched page
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: default_timeout_secs(),
            max_page_chars: default_max_page_chars(),
        }
    }
}

impl WebSettings {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::new(
            self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

impl Config {
    /// Load configuration from layered sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (prefixed with `DEEPDUCK_`)
    /// 2. The config file (`explicit_path`, or `~/.config/deepduck/config.toml`)
    /// 3. Built-in defaults
    ///
    /// A missing default config file is fine; a missing explicit one is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::config_path().ok().filter(|p| p.exists()),
        };

        Self::figment(path.as_deref())
            .extract()
            .with_context(|| match &path {
                Some(p) => format!("Invalid configuration in {}", p.display()),
                None => "Invalid configuration".to_string(),
            })
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("deepduck"))
    }
}
