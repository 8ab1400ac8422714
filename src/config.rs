//! Runtime configuration
//!
//! All configuration lives in an explicit [`Settings`] object assembled from
//! the environment at startup and passed down by value; no component reads
//! the environment or holds global state. A missing credential is a fatal
//! startup error, never retried.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};

use crate::client::{HttpConfig, RateLimitConfig};

/// Default API root when neither root nor legacy base URL is configured.
pub const DEFAULT_API_ROOT: &str = "https://www.freelancer.com/api";

/// Header carrying the OAuth credential on every request.
pub const AUTH_HEADER: &str = "freelancer-oauth-v1";

/// Configuration errors (fatal at startup)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required credential absent from the environment
    #[error("missing credential: set {0} in the environment")]
    MissingCredential(&'static str),

    /// An environment value did not parse
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Remote sink coordinates.
#[derive(Debug, Clone)]
pub struct SinkSettings {
    /// Store base URL
    pub url: String,
    /// Service key used for both `apikey` and bearer auth
    pub service_key: String,
    /// Target table name
    pub table: String,
}

/// Everything the pipeline needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// API root all endpoint paths are joined onto
    pub api_root: String,
    /// OAuth access token (required)
    pub oauth_token: String,
    /// Cursor state document path
    pub state_path: PathBuf,
    /// Lead log path
    pub leads_path: PathBuf,
    /// Reviewer cache database path
    pub cache_path: PathBuf,
    /// Directory page size
    pub directory_limit: u64,
    /// Review fetch limit per entity
    pub reviews_limit: u64,
    /// Reviewer ids per batched lookup
    pub users_batch_size: usize,
    /// Directory search query
    pub query: String,
    /// Request pacing
    pub rate_limit: RateLimitConfig,
    /// Retry/timeout behavior
    pub http: HttpConfig,
    /// Remote sink, when configured
    pub sink: Option<SinkSettings>,
}

impl Settings {
    /// Assemble settings from `LEADGEN_*` environment variables, applying
    /// defaults for everything except the OAuth token.
    pub fn from_env() -> Result<Self, ConfigError> {
        let oauth_token = env_string("LEADGEN_OAUTH_TOKEN")
            .ok_or(ConfigError::MissingCredential("LEADGEN_OAUTH_TOKEN"))?;

        let api_root = match env_string("LEADGEN_API_ROOT") {
            Some(root) => root.trim_end_matches('/').to_string(),
            None => match env_string("LEADGEN_API_BASE_URL") {
                Some(legacy) => derive_api_root_from_legacy(&legacy),
                None => DEFAULT_API_ROOT.to_string(),
            },
        };

        let sink = match (env_string("LEADGEN_SINK_URL"), env_string("LEADGEN_SINK_KEY")) {
            (Some(url), Some(service_key))
                if !url.starts_with('<') && !service_key.starts_with('<') =>
            {
                Some(SinkSettings {
                    url,
                    service_key,
                    table: env_string("LEADGEN_SINK_TABLE")
                        .unwrap_or_else(|| "clients".to_string()),
                })
            }
            _ => None,
        };

        Ok(Self {
            api_root,
            oauth_token,
            state_path: env_path("LEADGEN_STATE_PATH", "state.json"),
            leads_path: env_path("LEADGEN_LEADS_PATH", "leads.jsonl"),
            cache_path: env_path("LEADGEN_CACHE_PATH", "user_cache.db"),
            directory_limit: env_parse("LEADGEN_DIRECTORY_LIMIT", 20)?,
            reviews_limit: env_parse("LEADGEN_REVIEWS_LIMIT", 100)?,
            users_batch_size: env_parse("LEADGEN_USERS_BATCH_SIZE", 50)?,
            query: env_string("LEADGEN_QUERY").unwrap_or_default(),
            rate_limit: RateLimitConfig {
                min_interval: Duration::from_millis(env_parse(
                    "LEADGEN_MIN_INTERVAL_MS",
                    800u64,
                )?),
                requests_per_minute: Some(env_parse("LEADGEN_REQUESTS_PER_MINUTE", 50u32)?)
                    .filter(|rpm| *rpm > 0),
                jitter_max: Duration::from_millis(env_parse("LEADGEN_JITTER_MS", 200u64)?),
            },
            http: HttpConfig {
                timeout: Duration::from_secs(env_parse("LEADGEN_TIMEOUT_S", 30u64)?),
                max_retries: env_parse("LEADGEN_MAX_RETRIES", 6u32)?,
                backoff_base: Duration::from_millis(env_parse(
                    "LEADGEN_BACKOFF_BASE_MS",
                    1_000u64,
                )?),
                backoff_max: Duration::from_millis(env_parse(
                    "LEADGEN_BACKOFF_MAX_MS",
                    60_000u64,
                )?),
            },
            sink,
        })
    }

    /// The credential header attached to every outbound API request.
    pub fn auth_header(&self) -> Result<(HeaderName, HeaderValue), ConfigError> {
        let value =
            HeaderValue::from_str(&self.oauth_token).map_err(|_| ConfigError::InvalidValue {
                name: "LEADGEN_OAUTH_TOKEN",
                value: "<not a valid header value>".to_string(),
            })?;
        Ok((HeaderName::from_static(AUTH_HEADER), value))
    }
}

/// Derive the API root from a legacy versioned base URL, e.g.
/// `https://host/api/users/0.1` -> `https://host/api`.
pub fn derive_api_root_from_legacy(api_base_url: &str) -> String {
    let trimmed = api_base_url.trim_end_matches('/');
    if let Some(root) = trimmed.strip_suffix("/users/0.1") {
        return root.to_string();
    }
    if let Some((host, _)) = trimmed.split_once("/api/") {
        return format!("{host}/api");
    }
    trimmed.to_string()
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_path(name: &str, default: &str) -> PathBuf {
    env_string(name).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(default))
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_string(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(default),
    }
}
