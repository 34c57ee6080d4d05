/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_IMAGE_MAX_AGE: &str = "1h";

// Upstream catalog defaults
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "http://localhost:8096";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "30s";
pub const DEFAULT_CONNECT_TIMEOUT: &str = "10s";

// Storage defaults
pub const DEFAULT_CACHE_PATH: &str = "./data/posters";
pub const DEFAULT_CLEAR_ON_STARTUP: bool = true;
pub const CACHE_FILE_EXTENSION: &str = "jpg";

// Transform defaults
pub const DEFAULT_JPEG_QUALITY: u8 = 30;

// Reconciliation defaults
pub const DEFAULT_RECONCILE_ENABLED: bool = true;
pub const DEFAULT_RECONCILE_SCHEDULE: &str = "0 0 3 * * *"; // Daily at 03:00 local time
pub const DEFAULT_RECENCY_WINDOW: &str = "24h";
pub const DEFAULT_PROBE_CONCURRENCY: usize = 4;
pub const DEFAULT_WARM_MISSING_ENTRIES: bool = true;
pub const DEFAULT_RUN_ON_STARTUP: bool = false;

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Environment
pub const ENV_PREFIX: &str = "POSTER_CACHE_";
