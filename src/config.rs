use crate::feed::{FeedOptions, DEFAULT_MAX_INTERVAL, DEFAULT_MIN_INTERVAL};
use crate::geo::LatLng;
use crate::pipeline::{
    PipelineOptions, DEFAULT_DEBOUNCE, DEFAULT_MAP_CENTER, DEFAULT_SEARCH_RADIUS_M, MIN_QUERY_LEN,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 4000;
pub const DEFAULT_API_BASE: &str = "http://localhost:4000";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub data: Option<DataSection>,
    #[serde(default)]
    pub search: Option<SearchSection>,
    #[serde(default)]
    pub feed: Option<FeedSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port the companion service listens on (default: 4000)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSection {
    /// Serve everything from the bundled fixture store (default: true)
    pub use_fixture: Option<bool>,
    /// Base URL of the remote service when fixtures are off
    pub api_base: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchSection {
    pub debounce_ms: Option<u64>,
    pub radius_m: Option<f64>,
    pub map_center_lat: Option<f64>,
    pub map_center_lng: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSection {
    pub min_interval_ms: Option<u64>,
    pub max_interval_ms: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    pub fn log_level(&self) -> &str {
        &self.logging.level
    }

    /// Returns the server port (default: 4000)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Whether the pipeline runs on the bundled fixture store (default: true)
    pub fn use_fixture(&self) -> bool {
        self.data.as_ref().and_then(|d| d.use_fixture).unwrap_or(true)
    }

    pub fn api_base(&self) -> &str {
        self.data
            .as_ref()
            .and_then(|d| d.api_base.as_deref())
            .unwrap_or(DEFAULT_API_BASE)
    }

    pub fn map_center(&self) -> LatLng {
        self.search
            .as_ref()
            .and_then(|s| Some(LatLng::new(s.map_center_lat?, s.map_center_lng?)))
            .unwrap_or(DEFAULT_MAP_CENTER)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        let debounce_ms = self
            .search
            .as_ref()
            .and_then(|s| s.debounce_ms)
            .unwrap_or(DEFAULT_DEBOUNCE.as_millis() as u64);
        let radius_m = self
            .search
            .as_ref()
            .and_then(|s| s.radius_m)
            .unwrap_or(DEFAULT_SEARCH_RADIUS_M);
        PipelineOptions {
            debounce: Duration::from_millis(debounce_ms),
            min_query_len: MIN_QUERY_LEN,
            radius_m,
            map_center: self.map_center(),
            feed: self.feed_options(),
        }
    }

    pub fn feed_options(&self) -> FeedOptions {
        let min_ms = self
            .feed
            .as_ref()
            .and_then(|f| f.min_interval_ms)
            .unwrap_or(DEFAULT_MIN_INTERVAL.as_millis() as u64);
        let max_ms = self
            .feed
            .as_ref()
            .and_then(|f| f.max_interval_ms)
            .unwrap_or(DEFAULT_MAX_INTERVAL.as_millis() as u64);
        FeedOptions {
            min_interval: Duration::from_millis(min_ms),
            max_interval: Duration::from_millis(max_ms),
        }
    }
}

/// Data-source overrides parsed from a query string, the same `mock` and
/// `api` parameters the demo page accepts. `mock=0` switches to the remote
/// source, any other `mock` value forces fixtures, `api=` replaces the base
/// URL.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DataOverrides {
    pub use_fixture: Option<bool>,
    pub api_base: Option<String>,
}

impl DataOverrides {
    pub fn from_query(query: &str) -> Self {
        let mut overrides = Self::default();
        for pair in query.trim_start_matches('?').split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "mock" => overrides.use_fixture = Some(value != "0"),
                "api" if !value.is_empty() => overrides.api_base = Some(value.to_string()),
                _ => {}
            }
        }
        overrides
    }

    pub fn use_fixture(&self, config: &Config) -> bool {
        self.use_fixture.unwrap_or_else(|| config.use_fixture())
    }

    pub fn api_base<'a>(&'a self, config: &'a Config) -> &'a str {
        self.api_base.as_deref().unwrap_or_else(|| config.api_base())
    }
}
