//! Client configuration.
//!
//! Every tunable of the client lives in one explicit structure, loaded with a
//! precedence system:
//! 1. Bundled defaults (include_str! from concierge.toml)
//! 2. User config in home directory (~/.config/concierge/concierge.toml)
//! 3. User config in current directory (./concierge.toml)
//! 4. Environment variables (`CONCIERGE__UPSTREAM__PARTNER_TOKEN`, ...)
//!
//! Every field has a default, so each layer only needs to name what it
//! changes.

use crate::Operation;
use concierge_cache::CacheConfig;
use concierge_error::{ConciergeError, ConciergeResult, ConfigError};
use concierge_rate_limit::{ReservoirConfig, WindowConfig};
use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Connection settings for the booking service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct UpstreamConfig {
    /// API root, e.g. `https://api.alteg.io/api/v1`
    #[serde(default = "default_base_url")]
    #[setters(into)]
    base_url: String,

    /// Partner bearer token
    #[serde(default)]
    #[setters(into)]
    partner_token: String,

    /// User token, appended to the authorization header when present
    #[serde(default)]
    #[setters(into)]
    user_token: String,

    /// Company (tenant) identifier used in every endpoint path
    #[serde(default)]
    company_id: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,

    /// Value of the `Accept` header
    #[serde(default = "default_accept")]
    #[setters(into)]
    accept: String,
}

fn default_base_url() -> String {
    "https://api.alteg.io/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_accept() -> String {
    "application/vnd.api.v2+json".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            partner_token: String::new(),
            user_token: String::new(),
            company_id: 0,
            timeout_secs: default_timeout_secs(),
            accept: default_accept(),
        }
    }
}

impl UpstreamConfig {
    /// Per-request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        if self.user_token.is_empty() {
            format!("Bearer {}", self.partner_token)
        } else {
            format!("Bearer {}, User {}", self.partner_token, self.user_token)
        }
    }
}

// Tokens stay out of logs
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(token: &str) -> &'static str {
            if token.is_empty() { "<unset>" } else { "<redacted>" }
        }

        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("partner_token", &redact(&self.partner_token))
            .field("user_token", &redact(&self.user_token))
            .field("company_id", &self.company_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("accept", &self.accept)
            .finish()
    }
}

/// Retry and backoff parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    max_retries: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,

    /// Upper bound for any delay (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    max_delay_ms: u64,

    /// Random extra delay as a fraction of the computed delay
    #[serde(default = "default_jitter_ratio")]
    jitter_ratio: f64,

    /// Prefer a server `Retry-After` hint over the computed delay
    #[serde(default = "default_honor_retry_after")]
    honor_retry_after: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter_ratio() -> f64 {
    0.1
}

fn default_honor_retry_after() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio(),
            honor_retry_after: default_honor_retry_after(),
        }
    }
}

impl RetryConfig {
    /// Base delay as a duration.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Delay cap as a duration.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Canonical cache lifetime for each read operation.
///
/// Mutating operations are never cached and have no entry here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct TtlTable {
    /// Company profile (seconds)
    #[serde(default = "default_company_secs")]
    company_secs: u64,
    /// Service catalog (seconds)
    #[serde(default = "default_catalog_secs")]
    services_secs: u64,
    /// Staff roster (seconds)
    #[serde(default = "default_catalog_secs")]
    staff_secs: u64,
    /// Bookable dates (seconds)
    #[serde(default = "default_dates_secs")]
    available_dates_secs: u64,
    /// Bookable time slots (seconds)
    #[serde(default = "default_times_secs")]
    available_times_secs: u64,
    /// Booking listings (seconds)
    #[serde(default = "default_listing_secs")]
    bookings_secs: u64,
    /// Client search (seconds)
    #[serde(default = "default_listing_secs")]
    clients_secs: u64,
}

fn default_company_secs() -> u64 {
    3600
}

fn default_catalog_secs() -> u64 {
    1800
}

fn default_dates_secs() -> u64 {
    600
}

fn default_times_secs() -> u64 {
    300
}

fn default_listing_secs() -> u64 {
    60
}

impl Default for TtlTable {
    fn default() -> Self {
        Self {
            company_secs: default_company_secs(),
            services_secs: default_catalog_secs(),
            staff_secs: default_catalog_secs(),
            available_dates_secs: default_dates_secs(),
            available_times_secs: default_times_secs(),
            bookings_secs: default_listing_secs(),
            clients_secs: default_listing_secs(),
        }
    }
}

impl TtlTable {
    /// Cache lifetime for `operation`, or `None` if it must not be cached.
    ///
    /// A zero entry disables caching for that operation.
    pub fn ttl_for(&self, operation: Operation) -> Option<Duration> {
        let secs = match operation {
            Operation::CompanyProfile => self.company_secs,
            Operation::Services => self.services_secs,
            Operation::Staff => self.staff_secs,
            Operation::AvailableDates => self.available_dates_secs,
            Operation::AvailableTimes => self.available_times_secs,
            Operation::ListBookings => self.bookings_secs,
            Operation::SearchClients => self.clients_secs,
            Operation::ValidateBooking
            | Operation::CreateBooking
            | Operation::CreateClient
            | Operation::Custom => return None,
        };
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}

/// Periodic reporting and alarm thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct MetricsConfig {
    /// Seconds between summaries
    #[serde(default = "default_report_interval_secs")]
    report_interval_secs: u64,

    /// Warn when the success rate drops below this fraction
    #[serde(default = "default_min_success_rate")]
    min_success_rate: f64,

    /// Warn when the average latency exceeds this (milliseconds)
    #[serde(default = "default_max_avg_latency_ms")]
    max_avg_latency_ms: u64,

    /// Recent latencies kept for percentile estimates
    #[serde(default = "default_latency_sample_size")]
    latency_sample_size: usize,
}

fn default_report_interval_secs() -> u64 {
    60
}

fn default_min_success_rate() -> f64 {
    0.95
}

fn default_max_avg_latency_ms() -> u64 {
    2000
}

fn default_latency_sample_size() -> usize {
    1000
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval_secs(),
            min_success_rate: default_min_success_rate(),
            max_avg_latency_ms: default_max_avg_latency_ms(),
            latency_sample_size: default_latency_sample_size(),
        }
    }
}

impl MetricsConfig {
    /// Reporting interval as a duration.
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

/// Top-level client configuration.
///
/// # Example
///
/// ```no_run
/// use concierge_client::ClientConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::load()?;
/// println!("Hourly budget: {}", config.rate_limit().budget());
/// # Ok(())
/// # }
/// ```
#[derive(
    Debug, Clone, PartialEq, Default, Serialize, Deserialize, Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct ClientConfig {
    /// Booking service connection
    #[serde(default)]
    upstream: UpstreamConfig,

    /// Retry policy
    #[serde(default)]
    retry: RetryConfig,

    /// General sliding-window limiter
    #[serde(default)]
    rate_limit: WindowConfig,

    /// Hot-path reservoir limiter
    #[serde(default)]
    reservoir: ReservoirConfig,

    /// Response cache bounds
    #[serde(default)]
    cache: CacheConfig,

    /// Per-operation cache lifetimes
    #[serde(default)]
    ttl: TtlTable,

    /// Metrics reporting
    #[serde(default)]
    metrics: MetricsConfig,
}

impl ClientConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ConciergeResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConciergeError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ConciergeError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, on top of the field defaults.
    pub fn from_toml_str(toml: &str) -> ConciergeResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| {
                ConciergeError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ConciergeError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and will be silently skipped if not found.
    #[instrument]
    pub fn load() -> ConciergeResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../concierge.toml");

        let mut builder = Config::builder()
            // Start with bundled defaults
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        // Add user config from home directory (optional)
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/concierge/concierge.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        // Add user config from current directory (optional)
        builder = builder.add_source(File::with_name("concierge").required(false));

        // Environment overrides, e.g. CONCIERGE__UPSTREAM__PARTNER_TOKEN
        builder = builder.add_source(
            Environment::with_prefix("CONCIERGE")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .map_err(|e| {
                ConciergeError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ConciergeError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the types cannot express.
    pub fn validate(&self) -> ConciergeResult<()> {
        if self.upstream.base_url.trim().is_empty() {
            return Err(ConfigError::new("upstream.base_url must not be empty").into());
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::new("retry.max_delay_ms must be >= retry.base_delay_ms").into());
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_ratio) {
            return Err(ConfigError::new("retry.jitter_ratio must be within 0.0..=1.0").into());
        }
        if !(0.0..=1.0).contains(&self.metrics.min_success_rate) {
            return Err(ConfigError::new("metrics.min_success_rate must be within 0.0..=1.0").into());
        }
        self.rate_limit
            .validate()
            .and_then(|_| self.reservoir.validate())
            .map_err(|e| ConciergeError::from(ConfigError::new(e.to_string())))?;
        Ok(())
    }
}
