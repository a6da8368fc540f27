//! `getty.toml` loading.
//!
//! Every section is optional and falls back to its defaults. String values of the form
//! `${VAR}` are resolved from the environment when they are used, so a checked-in config file
//! can point at `${REDIS_URL}` without embedding credentials.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{date_key::Calendar, feed::FeedPolicy, graph::WriteMode, posts::LikeStrategy};

pub const DEFAULT_CONFIG_FILE: &str = "getty.toml";

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env pattern"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("environment variable {0} not set")]
    MissingEnv(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GettyConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub posts: PostsConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Redis => "redis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_redis_url(),
            prefix: default_prefix(),
        }
    }
}

impl StoreConfig {
    /// The Redis URL with environment references expanded.
    pub fn redis_url(&self) -> Result<String, ConfigError> {
        expand_env(&self.url)
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "getty".to_string()
}

fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub write_mode: WriteMode,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::default(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostsConfig {
    #[serde(default)]
    pub like_strategy: LikeStrategy,
    #[serde(default)]
    pub calendar: Calendar,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            like_strategy: LikeStrategy::default(),
            calendar: Calendar::default(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub policy: FeedPolicy,
    #[serde(default)]
    pub include_own_posts: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl GettyConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` when given, otherwise `getty.toml` from the working directory if it exists,
    /// otherwise the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let candidate = Path::new(DEFAULT_CONFIG_FILE);
                if candidate.exists() {
                    Self::load(candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Replaces every `${VAR}` in `value` with the variable's value.
pub fn expand_env(value: &str) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(value.len());
    let mut last = 0;
    for captures in ENV_REFERENCE.captures_iter(value) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let resolved = std::env::var(name.as_str()).map_err(|_| ConfigError::MissingEnv(name.as_str().to_string()))?;
        expanded.push_str(&value[last..whole.start()]);
        expanded.push_str(&resolved);
        last = whole.end();
    }
    expanded.push_str(&value[last..]);
    Ok(expanded)
}
