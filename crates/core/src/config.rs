use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::category::{TableEngine, WriteDisposition};

/// Public TLC trip record mirror.
pub const DEFAULT_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data/";

pub const DEFAULT_BATCH_SIZE: usize = 100_000;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Key lookup used to build a [`Config`]. The process environment in
/// production, a map in tests.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled key: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt(env: Lookup<'_>, profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env(&prefixed).filter(|s| !s.is_empty()) {
            return Some(v);
        }
    }
    env(key).filter(|s| !s.is_empty())
}

fn profiled_or(env: Lookup<'_>, profile: &str, key: &str, default: &str) -> String {
    profiled_opt(env, profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_u64(env: Lookup<'_>, profile: &str, key: &str, default: u64) -> u64 {
    profiled_opt(env, profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a profiled key, recording values that do not parse in `ignored`.
fn profiled_parse<T: std::str::FromStr + Default>(
    env: Lookup<'_>,
    profile: &str,
    key: &str,
    ignored: &mut Vec<IgnoredValue>,
) -> T {
    match profiled_opt(env, profile, key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            ignored.push(IgnoredValue::new(key, &raw));
            T::default()
        }),
        None => T::default(),
    }
}

/// A config value that was present but rejected in favour of the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredValue {
    pub key: String,
    pub value: String,
}

impl IgnoredValue {
    fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Deployment environment; anything but `production` is treated as local.
    pub environment: String,
    pub logging: LoggingConfig,
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub aws: AwsConfig,
    /// Values rejected while loading. Config is built before logging is
    /// up, so these are reported by [`Config::log_summary`].
    #[serde(skip)]
    pub ignored: Vec<IgnoredValue>,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TRIPDATA_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = process_env("TRIPDATA_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        Self::from_lookup(profile, &process_env)
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(profile: &str, env: Lookup<'_>) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let environment = profiled_or(env, p, "ENVIRONMENT", "production").to_lowercase();
        let is_production = environment == "production";
        let mut ignored = Vec::new();
        Self {
            profile: p.to_string(),
            logging: LoggingConfig::from_env_profiled(env, p, is_production, &mut ignored),
            source: SourceConfig::from_env_profiled(env, p, &mut ignored),
            storage: StorageConfig::from_env_profiled(env, p),
            aws: AwsConfig::from_env_profiled(env, p),
            environment,
            ignored,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}, environment: {}):", self.profile_label(), self.environment);
        tracing::info!("  logging:  level={}, format={:?}", self.logging.level, self.logging.format);
        tracing::info!(
            "  source:   base_url={}, batch_size={}, timeout={}s, probe_workers={}",
            self.source.base_url,
            self.source.batch_size,
            self.source.request_timeout.as_secs(),
            self.source.resolved_probe_workers()
        );
        tracing::info!(
            "  merge:    write_disposition={}, table_engine={}",
            self.source.write_disposition,
            self.source.table_engine
        );
        tracing::info!("  storage:  staging_dir={}", self.storage.staging_dir.display());
        tracing::info!("  aws:      region={}, bucket={}", self.aws.region, self.aws.s3_bucket.as_deref().unwrap_or("(none)"));
        for ignored in &self.ignored {
            tracing::warn!(key = %ignored.key, value = %ignored.value, "ignoring invalid config value, using default");
        }
    }
}

// ── Logging ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    pub level: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    fn from_env_profiled(
        env: Lookup<'_>,
        p: &str,
        is_production: bool,
        ignored: &mut Vec<IgnoredValue>,
    ) -> Self {
        let raw = profiled_or(env, p, "LOG_LEVEL", "info").trim().to_lowercase();
        let level = if LOG_LEVELS.contains(&raw.as_str()) {
            raw
        } else {
            ignored.push(IgnoredValue::new("LOG_LEVEL", &raw));
            "info".to_string()
        };
        let format = match profiled_opt(env, p, "LOG_FORMAT").map(|s| s.to_lowercase()) {
            Some(f) if f == "json" => LogFormat::Json,
            Some(f) if f == "pretty" => LogFormat::Pretty,
            _ if is_production => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        Self { level, format }
    }
}

// ── Trip record source ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory URL holding the monthly files (`http(s)://` or `file://`).
    pub base_url: String,
    /// Rows per emitted batch.
    pub batch_size: usize,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Probe pool size. 0 = available parallelism.
    pub probe_workers: usize,
    pub write_disposition: WriteDisposition,
    pub table_engine: TableEngine,
}

impl SourceConfig {
    fn from_env_profiled(env: Lookup<'_>, p: &str, ignored: &mut Vec<IgnoredValue>) -> Self {
        let batch_size = match profiled_u64(env, p, "TLC_BATCH_SIZE", DEFAULT_BATCH_SIZE as u64) {
            0 => DEFAULT_BATCH_SIZE,
            n => n as usize,
        };
        Self {
            base_url: profiled_or(env, p, "TLC_BASE_URL", DEFAULT_BASE_URL),
            batch_size,
            request_timeout: Duration::from_secs(profiled_u64(env, p, "TLC_REQUEST_TIMEOUT_SECS", 30)),
            connect_timeout: Duration::from_secs(profiled_u64(env, p, "TLC_CONNECT_TIMEOUT_SECS", 10)),
            probe_workers: profiled_u64(env, p, "TLC_PROBE_WORKERS", 0) as usize,
            write_disposition: profiled_parse(env, p, "TLC_WRITE_DISPOSITION", ignored),
            table_engine: profiled_parse(env, p, "TLC_TABLE_ENGINE", ignored),
        }
    }

    pub fn resolved_probe_workers(&self) -> usize {
        if self.probe_workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.probe_workers
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            probe_workers: 0,
            write_disposition: WriteDisposition::default(),
            table_engine: TableEngine::default(),
        }
    }
}

// ── Staging storage ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub staging_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(env: Lookup<'_>, p: &str) -> Self {
        Self {
            staging_dir: PathBuf::from(profiled_or(env, p, "STAGING_DIR", "data/staging")),
        }
    }
}

// ── AWS / S3 ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(env: Lookup<'_>, p: &str) -> Self {
        Self {
            region: profiled_or(env, p, "AWS_REGION", "us-east-1"),
            access_key_id: profiled_opt(env, p, "AWS_ACCESS_KEY_ID"),
            secret_access_key: profiled_opt(env, p, "AWS_SECRET_ACCESS_KEY"),
            session_token: profiled_opt(env, p, "AWS_SESSION_TOKEN"),
            s3_bucket: profiled_opt(env, p, "S3_BUCKET"),
            s3_prefix: profiled_opt(env, p, "S3_PREFIX"),
            endpoint_url: profiled_opt(env, p, "AWS_ENDPOINT_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.access_key_id.is_some() && self.s3_bucket.is_some()
    }
}
