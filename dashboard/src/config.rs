//! NodeGuard configuration loading and parsing

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "nodeguard.toml";

/// Root configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct NodeGuardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_api_timeout(),
        }
    }
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The RPC health-check budget is fixed at 3 s and is not configurable
#[derive(Debug, Default, Deserialize)]
pub struct RpcConfig {
    #[serde(default)]
    pub url: String,
}

impl RpcConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_log_chars")]
    pub max_log_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_log_chars: default_max_log_chars(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind() -> String { "0.0.0.0:8501".into() }
fn default_base_url() -> String { nodeguard_core::openai::DEFAULT_BASE_URL.into() }
fn default_model() -> String { nodeguard_core::openai::DEFAULT_MODEL.into() }
fn default_temperature() -> f32 { nodeguard_core::openai::DEFAULT_TEMPERATURE }
fn default_api_timeout() -> u64 { nodeguard_core::openai::DEFAULT_TIMEOUT.as_secs() }
fn default_max_log_chars() -> usize { nodeguard_core::analyzer::DEFAULT_MAX_LOG_CHARS }
fn default_log_level() -> String { "info".into() }

impl NodeGuardConfig {
    /// Environment wins over the file for credentials and endpoints
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai.api_key = key;
        }
        if let Some(model) = non_empty("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(base_url) = non_empty("OPENAI_BASE_URL") {
            self.openai.base_url = base_url;
        }
        if let Some(url) = non_empty("QUICKNODE_RPC_URL") {
            self.rpc.url = url;
        }
        if let Some(bind) = non_empty("NODEGUARD_BIND") {
            self.server.bind = bind;
        }
    }
}

/// Load configuration from `NODEGUARD_CONFIG` (or ./nodeguard.toml), then the environment.
///
/// Also returns the path the file was read from, if one existed. Logging is not
/// set up yet when this runs, so the caller reports it.
pub fn load_config() -> Result<(NodeGuardConfig, Option<String>)> {
    let config_path = std::env::var("NODEGUARD_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let (mut config, source) = if Path::new(&config_path).exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {config_path}"))?;
        let config: NodeGuardConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {config_path}"))?;
        (config, Some(config_path))
    } else {
        (NodeGuardConfig::default(), None)
    };

    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok((config, source))
}
