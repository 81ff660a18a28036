//! Configuration structures for the two throttles.
//!
//! Both structs deserialize from the `[rate_limit]` and `[reservoir]` tables
//! of `concierge.toml`. Every field has a default, so a partial table only
//! overrides what it names.
//!
//! ```toml
//! [rate_limit]
//! budget = 450          # upstream hard cap is 500/hour
//! window_secs = 3600
//! min_spacing_ms = 100
//!
//! [reservoir]
//! amount = 200
//! refill_interval_secs = 3600
//! max_concurrent = 5
//! min_spacing_ms = 100
//! ```

use crate::{RateLimitError, RateLimitErrorKind};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the general sliding-window limiter.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct WindowConfig {
    /// Dispatches allowed per window
    #[serde(default = "default_budget")]
    budget: u32,

    /// Length of the trailing window (seconds)
    #[serde(default = "default_window_secs")]
    window_secs: u64,

    /// Minimum gap between consecutive dispatches (milliseconds)
    #[serde(default = "default_spacing_ms")]
    min_spacing_ms: u64,
}

fn default_budget() -> u32 {
    450
}

fn default_window_secs() -> u64 {
    3600
}

fn default_spacing_ms() -> u64 {
    100
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            window_secs: default_window_secs(),
            min_spacing_ms: default_spacing_ms(),
        }
    }
}

impl WindowConfig {
    /// Trailing window as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Minimum spacing as a duration.
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    /// Reject settings the limiter cannot honour.
    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.budget == 0 {
            return Err(RateLimitErrorKind::Config("rate_limit.budget must be positive".into()).into());
        }
        if self.window_secs == 0 {
            return Err(
                RateLimitErrorKind::Config("rate_limit.window_secs must be positive".into()).into(),
            );
        }
        Ok(())
    }
}

/// Settings for the hot-path reservoir limiter.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct ReservoirConfig {
    /// Units restored on every refill
    #[serde(default = "default_amount")]
    amount: u32,

    /// Time between refills (seconds)
    #[serde(default = "default_refill_interval_secs")]
    refill_interval_secs: u64,

    /// Maximum simultaneous in-flight operations
    #[serde(default = "default_max_concurrent")]
    max_concurrent: u32,

    /// Minimum gap between consecutive starts (milliseconds)
    #[serde(default = "default_spacing_ms")]
    min_spacing_ms: u64,
}

fn default_amount() -> u32 {
    200
}

fn default_refill_interval_secs() -> u64 {
    3600
}

fn default_max_concurrent() -> u32 {
    5
}

impl Default for ReservoirConfig {
    fn default() -> Self {
        Self {
            amount: default_amount(),
            refill_interval_secs: default_refill_interval_secs(),
            max_concurrent: default_max_concurrent(),
            min_spacing_ms: default_spacing_ms(),
        }
    }
}

impl ReservoirConfig {
    /// Refill interval as a duration.
    pub fn refill_interval(&self) -> Duration {
        Duration::from_secs(self.refill_interval_secs)
    }

    /// Minimum spacing as a duration.
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    /// Reject settings the limiter cannot honour.
    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.amount == 0 {
            return Err(RateLimitErrorKind::Config("reservoir.amount must be positive".into()).into());
        }
        if self.refill_interval_secs == 0 {
            return Err(RateLimitErrorKind::Config(
                "reservoir.refill_interval_secs must be positive".into(),
            )
            .into());
        }
        if self.max_concurrent == 0 {
            return Err(
                RateLimitErrorKind::Config("reservoir.max_concurrent must be positive".into()).into(),
            );
        }
        Ok(())
    }
}
