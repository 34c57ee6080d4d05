use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::duration;

/// Unprefixed Jellyfin variables, mapped onto the `upstream` section.
const LEGACY_UPSTREAM_ENV: [&str; 3] = ["JELLYFIN_URL", "JELLYFIN_API_KEY", "JELLYFIN_LIBRARY_ID"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `max-age` advertised on served images
    #[serde(default = "default_image_max_age", with = "duration")]
    pub image_max_age: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Parent id of the library swept during reconciliation
    #[serde(default)]
    pub library_id: String,
    #[serde(default = "default_request_timeout", with = "duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Wipe every cached poster before the listener binds
    #[serde(default = "default_clear_on_startup")]
    pub clear_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Longest edge in pixels; larger posters are downscaled. Unset keeps the source size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dimension: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcileConfig {
    #[serde(default = "default_reconcile_enabled")]
    pub enabled: bool,
    /// Cron expression (with seconds) evaluated in the local timezone
    #[serde(default = "default_reconcile_schedule")]
    pub schedule: String,
    /// Items whose upstream image changed within this window are refreshed
    #[serde(default = "default_recency_window", with = "duration")]
    pub recency_window: Duration,
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,
    /// Fetch snapshot items that have no cache entry yet
    #[serde(default = "default_warm_missing_entries")]
    pub warm_missing_entries: bool,
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_image_max_age() -> Duration {
    parse_default_duration(DEFAULT_IMAGE_MAX_AGE)
}

// Upstream defaults
fn default_upstream_base_url() -> String {
    DEFAULT_UPSTREAM_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    parse_default_duration(DEFAULT_REQUEST_TIMEOUT)
}

fn default_connect_timeout() -> Duration {
    parse_default_duration(DEFAULT_CONNECT_TIMEOUT)
}

// Storage defaults
fn default_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_PATH)
}

fn default_clear_on_startup() -> bool {
    DEFAULT_CLEAR_ON_STARTUP
}

// Transform defaults
fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

// Reconcile defaults
fn default_reconcile_enabled() -> bool {
    DEFAULT_RECONCILE_ENABLED
}

fn default_reconcile_schedule() -> String {
    DEFAULT_RECONCILE_SCHEDULE.to_string()
}

fn default_recency_window() -> Duration {
    parse_default_duration(DEFAULT_RECENCY_WINDOW)
}

fn default_probe_concurrency() -> usize {
    DEFAULT_PROBE_CONCURRENCY
}

fn default_warm_missing_entries() -> bool {
    DEFAULT_WARM_MISSING_ENTRIES
}

fn default_run_on_startup() -> bool {
    DEFAULT_RUN_ON_STARTUP
}

// Logging defaults
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn parse_default_duration(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or_default()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            image_max_age: default_image_max_age(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            api_key: String::new(),
            library_id: String::new(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            clear_on_startup: default_clear_on_startup(),
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            max_dimension: None,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconcile_enabled(),
            schedule: default_reconcile_schedule(),
            recency_window: default_recency_window(),
            probe_concurrency: default_probe_concurrency(),
            warm_missing_entries: default_warm_missing_entries(),
            run_on_startup: default_run_on_startup(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            upstream: UpstreamConfig::default(),
            storage: StorageConfig::default(),
            transform: TransformConfig::default(),
            reconcile: ReconcileConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `config_file`, writing a default file first if
    /// none exists, then layering environment overrides on top.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> Result<Self> {
        let config_file = config_file.as_ref();
        if !config_file.exists() {
            let contents = toml::to_string_pretty(&Self::default())?;
            std::fs::write(config_file, contents).with_context(|| {
                format!("Failed to write default config file {}", config_file.display())
            })?;
            info!("Created default config file: {}", config_file.display());
        }

        Self::figment(config_file)
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", config_file.display()))
    }

    /// Provider stack: defaults, then the TOML file, then `POSTER_CACHE_*`
    /// variables (`__` separates sections), then the Jellyfin variables.
    pub fn figment<P: AsRef<Path>>(config_file: P) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_file.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&LEGACY_UPSTREAM_ENV)
                    .map(|key| match key.as_str().to_ascii_uppercase().as_str() {
                        "JELLYFIN_URL" => "upstream.base_url".into(),
                        "JELLYFIN_API_KEY" => "upstream.api_key".into(),
                        _ => "upstream.library_id".into(),
                    }),
            )
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), String> {
        let base_url = url::Url::parse(&self.upstream.base_url)
            .map_err(|e| format!("Invalid upstream.base_url '{}': {e}", self.upstream.base_url))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(format!(
                "upstream.base_url must use http or https, got '{}'",
                base_url.scheme()
            ));
        }

        if self.upstream.library_id.trim().is_empty() {
            return Err(
                "upstream.library_id is required (set it in the config file or JELLYFIN_LIBRARY_ID)"
                    .to_string(),
            );
        }

        if !(1..=100).contains(&self.transform.jpeg_quality) {
            return Err(format!(
                "transform.jpeg_quality must be between 1 and 100, got {}",
                self.transform.jpeg_quality
            ));
        }

        if self.transform.max_dimension == Some(0) {
            return Err("transform.max_dimension must be greater than zero".to_string());
        }

        if self.reconcile.probe_concurrency == 0 {
            return Err("reconcile.probe_concurrency must be at least 1".to_string());
        }

        crate::job_scheduling::parse_schedule(&self.reconcile.schedule)?;

        Ok(())
    }
}
