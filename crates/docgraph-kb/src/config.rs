//! Runtime configuration
//!
//! Everything comes from environment variables (optionally seeded from a `.env` file by the
//! binary). Credentials are mandatory and checked up front; tuning knobs fall back to defaults.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, warn};

use crate::data::errors::CoreError;
use crate::services::ingestion::ThrottlePolicy;

/// Configuration for Neo4j connection
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: Option<String>,
    pub pool_size: usize,
    pub connection_retry_count: u32,
    pub connection_retry_delay: Duration,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "neo4j://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: String::new(),
            database: Some("neo4j".to_string()),
            pool_size: 4,
            connection_retry_count: 3,
            connection_retry_delay: Duration::from_secs(2),
        }
    }
}

/// Credentials for the completion service.
#[derive(Debug, Clone, Default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    /// Overrides the default API base URL
    pub api_base: Option<String>,
}

impl OpenAiSettings {
    pub fn require_api_key(&self) -> Result<&str, CoreError> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => {
                error!("Missing environment variable: OPENAI_API_KEY");
                Err(CoreError::Config("OPENAI_API_KEY is not set".to_string()))
            }
        }
    }
}

/// Knobs of the ingestion and extraction runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub throttle: ThrottlePolicy,
    /// Documents with fewer characters are not sent to the LLM
    pub min_text_length: usize,
    pub max_tokens: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            throttle: ThrottlePolicy::default(),
            min_text_length: 100,
            max_tokens: 2000,
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone)]
pub struct KgConfig {
    pub neo4j: Neo4jConfig,
    pub openai: OpenAiSettings,
    pub pipeline: PipelineSettings,
    /// Holds `schema.txt`, `queries/` and `prompts/`
    pub config_dir: PathBuf,
}

impl KgConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |key: &str| {
            lookup(key).filter(|v| !v.is_empty()).unwrap_or_else(|| {
                error!("Missing environment variable: {}", key);
                missing.push(key.to_string());
                String::new()
            })
        };
        let uri = required("NEO4J_URI");
        let username = required("NEO4J_USER");
        let password = required("NEO4J_PWD");
        if !missing.is_empty() {
            return Err(CoreError::Config(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        }

        let mut neo4j = Neo4jConfig {
            uri,
            username,
            password,
            ..Neo4jConfig::default()
        };
        if let Some(database) = lookup("NEO4J_DATABASE") {
            neo4j.database = Some(database);
        }

        let openai = OpenAiSettings {
            api_key: lookup("OPENAI_API_KEY"),
            api_base: lookup("OPENAI_API_BASE"),
        };

        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            throttle: ThrottlePolicy {
                every: parse_or("KG_THROTTLE_EVERY", &lookup, defaults.throttle.every),
                pause: Duration::from_secs(parse_or(
                    "KG_THROTTLE_PAUSE_SECS",
                    &lookup,
                    defaults.throttle.pause.as_secs(),
                )),
            },
            min_text_length: parse_or("KG_MIN_TEXT_LENGTH", &lookup, defaults.min_text_length),
            max_tokens: parse_or("KG_MAX_TOKENS", &lookup, defaults.max_tokens),
        };

        let config_dir = lookup("KG_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config"));

        Ok(Self {
            neo4j,
            openai,
            pipeline,
            config_dir,
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid {} value: {}", key, raw);
            default
        }),
        None => default,
    }
}
