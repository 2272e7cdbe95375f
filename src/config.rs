//! Layered settings: defaults, YAML file, then environment

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Default AniList GraphQL endpoint
pub const DEFAULT_API_URL: &str = "https://graphql.anilist.co";

/// Environment variables accepted without the `ANILIST_MCP_` prefix
const LEGACY_ENV: [(&str, &str); 2] = [
    ("redis_url", "cache.redis_url"),
    ("anilist_api_url", "anilist.api_url"),
];

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before `${VAR}` expansion.
    /// `~/` paths are home-relative; later files win over earlier ones.
    pub env_files: Vec<String>,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Upstream GraphQL API
    pub anilist: AniListConfig,
    /// Response cache
    pub cache: CacheConfig,
    /// API key authentication for the HTTP transport
    pub auth: AuthConfig,
    /// stdio transport
    pub stdio: StdioConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 39500,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024,
        }
    }
}

/// AniList client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AniListConfig {
    /// GraphQL endpoint
    pub api_url: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// User-Agent header sent upstream
    pub user_agent: String,
}

impl Default for AniListConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(15),
            user_agent: format!("anilist-mcp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Which cache backend to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Redis when `redis_url` is set, otherwise disabled
    #[default]
    Auto,
    /// Redis; `redis_url` is required
    Redis,
    /// In-process map
    Memory,
    /// Every read misses
    Disabled,
}

/// Cache configuration for response caching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend selection
    pub backend: CacheBackendKind,
    /// Redis connection URL
    pub redis_url: Option<String>,
    /// Maximum number of entries for the memory backend
    pub max_entries: usize,
    /// Redis connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Auto,
            redis_url: None,
            max_entries: 10_000,
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Enable authentication
    pub enabled: bool,

    /// API keys, one per client
    pub api_keys: Vec<ApiKeyConfig>,

    /// Paths that bypass authentication (default: `["/health"]`)
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string()]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_keys: Vec::new(),
            public_paths: default_public_paths(),
        }
    }
}

/// API key configuration for one client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    /// The API key value (supports `env:VAR_NAME`)
    pub key: String,

    /// Human-readable name for this client
    #[serde(default)]
    pub name: String,

    /// AniList user id acting as this client's identity
    #[serde(default)]
    pub user_id: Option<i64>,

    /// Rate limit (requests per minute, 0 = unlimited)
    #[serde(default)]
    pub rate_limit: u32,
}

impl ApiKeyConfig {
    /// The secret itself; `env:NAME` reads `NAME`, falling back to the literal
    #[must_use]
    pub fn resolve_key(&self) -> String {
        self.key
            .strip_prefix("env:")
            .and_then(|var| env::var(var).ok())
            .unwrap_or_else(|| self.key.clone())
    }
}

/// stdio transport configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StdioConfig {
    /// AniList user id of the local caller
    pub user_id: Option<i64>,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or carries an invalid AniList URL.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path
            && !p.exists()
        {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                p.display()
            )));
        }

        Self::from_figment(&Self::figment(path))
    }

    /// Provider stack: defaults, YAML file, legacy env names, `ANILIST_MCP_*` env
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();

        if let Some(p) = path {
            figment = figment.merge(Yaml::file(p));
        }

        figment
            .merge(
                Env::raw()
                    .only(&LEGACY_ENV.map(|(var, _)| var))
                    .map(|key| legacy_key(key.as_str()).unwrap_or(key.as_str()).into()),
            )
            .merge(Env::prefixed("ANILIST_MCP_").split("__"))
    }

    /// Extract and post-process a configuration from any provider stack
    ///
    /// # Errors
    ///
    /// Returns an error if extraction fails or the AniList URL is invalid.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Env files first so their variables are visible to expansion
        config.load_env_files();
        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.anilist.api_url)
            .map_err(|e| Error::Config(format!("Invalid anilist.api_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "anilist.api_url must be http(s), got {}",
                url.scheme()
            )));
        }
        if self.cache.backend == CacheBackendKind::Memory && self.cache.max_entries == 0 {
            return Err(Error::Config(
                "cache.max_entries must be > 0 for the memory backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Source each `env_files` entry into the process environment, in order.
    /// Missing files are skipped.
    fn load_env_files(&self) {
        for path in self.env_files.iter().map(|p| home_relative(p)) {
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "No env file, skipping");
                continue;
            }
            if let Err(e) = dotenvy::from_path(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Could not read env file");
            } else {
                tracing::info!(path = %path.display(), "Env file loaded");
            }
        }
    }

    /// Substitute `${VAR}` / `${VAR:-fallback}` in the settings that take secrets or URLs
    fn expand_env_vars(&mut self) {
        let Ok(re) = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}") else {
            return;
        };

        if let Some(url) = self.cache.redis_url.as_mut() {
            *url = Self::expand_string(&re, url);
        }
        // An empty URL after expansion means "not configured"
        if self.cache.redis_url.as_deref().is_some_and(str::is_empty) {
            self.cache.redis_url = None;
        }

        self.anilist.api_url = Self::expand_string(&re, &self.anilist.api_url);

        for key in &mut self.auth.api_keys {
            key.key = Self::expand_string(&re, &key.key);
        }
    }

    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            env::var(&caps[1])
                .ok()
                .or_else(|| caps.get(2).map(|fallback| fallback.as_str().to_owned()))
                .unwrap_or_default()
        })
        .into_owned()
    }
}

/// `~/x` resolved against the home directory; other paths unchanged
fn home_relative(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches('/')),
        _ => PathBuf::from(path),
    }
}

/// Nested config path for an unprefixed legacy variable
fn legacy_key(var: &str) -> Option<&'static str> {
    LEGACY_ENV
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(var))
        .map(|(_, path)| *path)
}

/// Human-readable durations for serde (`"30s"`, `"5m"`, `"100ms"`)
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Whole seconds as `"30s"`, anything finer as milliseconds
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = match duration.subsec_millis() {
            0 => format!("{}s", duration.as_secs()),
            _ => format!("{}ms", duration.as_millis()),
        };
        serializer.serialize_str(&text)
    }

    /// Accepts a bare integer (seconds) or `<n><unit>` with unit `ms`, `s`, `m` or `h`
    ///
    /// # Errors
    ///
    /// Fails on a missing number or an unknown unit.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u64),
            Text(String),
        }

        let s = match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => return Ok(Duration::from_secs(secs)),
            Raw::Text(s) => s,
        };

        let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (amount, unit) = s.split_at(digits_end);
        let amount: u64 = amount.parse().map_err(serde::de::Error::custom)?;
        let scale = match unit.trim() {
            "ms" => return Ok(Duration::from_millis(amount)),
            "" | "s" => 1,
            "m" => 60,
            "h" => 3600,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "unknown duration unit '{other}' in '{s}'"
                )));
            }
        };
        Ok(Duration::from_secs(amount.saturating_mul(scale)))
    }
}
