//! Configuration module for the generation engine

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Main engine settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub pipeline: PipelineSettings,
}

/// Photo/asset fetch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Polite ceiling for third-party photo hosts
    pub rate_limit_per_minute: u32,
    /// Retries per URL (direct and proxied attempts each get this budget)
    pub max_retries: u32,
    /// CORS proxy prefix; the encoded source URL is appended. `None`
    /// disables the proxy fallback entirely.
    pub proxy_base: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            rate_limit_per_minute: 120,
            max_retries: 2,
            proxy_base: Some("https://corsproxy.io/?".to_string()),
        }
    }
}

/// Bulk generation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Renders in flight at once; kept small to avoid hammering photo hosts
    pub concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings { concurrency: 3 }
    }
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with FLYERGEN_)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("FLYERGEN")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fetch: FetchSettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}
