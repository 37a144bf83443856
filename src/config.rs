use std::env;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use crate::backend::{DataSource, EndpointShape, SyncOptions};

/// Default dashboard layout: twenty panels across the two Winsen boards.
const DEFAULT_SERIES: &str = "winsen1/pm25,winsen1/pm10,winsen1/co2,winsen1/temp,winsen1/humidity,\
winsen1/voc,winsen2/pm25,winsen2/pm10,winsen2/co2,winsen2/temp,winsen2/humidity,winsen2/voc,\
winsen1/pm1,winsen1/ch2o,winsen1/co,winsen1/o3,winsen1/no2,winsen2/pm1,winsen2/ch2o,winsen2/co";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }

    /// Read `DEPLOYMENT` directly, before the rest of the configuration.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_str(&env::var("DEPLOYMENT").unwrap_or_default())
    }

    /// Deployed environments log JSON lines; local runs log plain text.
    #[must_use]
    pub fn json_logs(&self) -> bool {
        *self != Self::Local
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Backend
    pub backend_base_url: String,
    pub backend_timeout_seconds: u64,
    pub nodes_path: String,
    pub locations_path: String,
    pub topology_path: String,

    // Synchronizer
    pub poll_interval_ms: u64,
    pub autostart: bool,
    pub max_points: NonZeroUsize,
    pub data_source: DataSource,
    pub latest_path: String,
    pub history_path: String,

    // Series population
    pub node_id: Option<String>,
    pub series: Vec<String>,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Caching
    pub cache_ttl_seconds: u64,

    // Application metadata
    pub deployment: Deployment,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a value is present but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a value is present but unusable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let poll_interval_ms: u64 = parse_var(&lookup, "POLL_INTERVAL_MS", 5000)?;
        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_points = var("MAX_POINTS", "50")
            .parse::<usize>()
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| ConfigError::Invalid {
                key: "MAX_POINTS",
                reason: "must be a positive integer".to_string(),
            })?;

        let data_source = DataSource::parse(&var("DATA_SOURCE", "latest")).ok_or_else(|| {
            ConfigError::Invalid {
                key: "DATA_SOURCE",
                reason: "expected 'latest' or 'history'".to_string(),
            }
        })?;

        let latest_path = var("LATEST_PATH", "/api/gas/{stream}/latest");
        let history_path = var("HISTORY_PATH", "/api/{stream}");
        let topology_path = var("TOPOLOGY_PATH", "/api/nodes/{node}/sensors");
        require_placeholder("LATEST_PATH", &latest_path, EndpointShape::STREAM_PLACEHOLDER)?;
        require_placeholder("HISTORY_PATH", &history_path, EndpointShape::STREAM_PLACEHOLDER)?;
        require_placeholder("TOPOLOGY_PATH", &topology_path, "{node}")?;

        let series = var("SERIES", DEFAULT_SERIES)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();

        Ok(Self {
            // Backend
            backend_base_url: var("BACKEND_BASE_URL", "http://localhost:5000")
                .trim_end_matches('/')
                .to_string(),
            backend_timeout_seconds: parse_var(&lookup, "BACKEND_TIMEOUT_SECONDS", 30)?,
            nodes_path: var("NODES_PATH", "/api/get_all_nodes"),
            locations_path: var("LOCATIONS_PATH", "/api/get_latest_aqi_data"),
            topology_path,

            // Synchronizer
            poll_interval_ms,
            autostart: parse_var(&lookup, "AUTOSTART", true)?,
            max_points,
            data_source,
            latest_path,
            history_path,

            // Series population
            node_id: lookup("NODE_ID").filter(|s| !s.trim().is_empty()),
            series,

            // API settings
            api_host: var("API_HOST", "0.0.0.0"),
            api_port: parse_var(&lookup, "API_PORT", 3000)?,

            // Caching
            cache_ttl_seconds: parse_var(&lookup, "CACHE_TTL_SECONDS", 60)?,

            // Application metadata
            deployment: Deployment::from_str(&var("DEPLOYMENT", "local")),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            data_source: self.data_source,
            endpoint: EndpointShape {
                latest_path: self.latest_path.clone(),
                history_path: self.history_path.clone(),
            },
            max_points: self.max_points,
        }
    }
}

/// Parse an optional key, falling back to `default` only when it is unset.
fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: format!("'{raw}': {e}"),
        }),
    }
}

fn require_placeholder(
    key: &'static str,
    template: &str,
    placeholder: &str,
) -> Result<(), ConfigError> {
    if template.contains(placeholder) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            reason: format!("template must contain {placeholder}"),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
