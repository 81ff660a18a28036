//! Caller priority for limiter admission.

use serde::{Deserialize, Serialize};

/// Priority attached to a request.
///
/// Both limiters currently admit strictly in arrival order; the priority is
/// recorded on the admission span so differentiated ordering can be added
/// without touching callers.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    /// Background refreshes
    Low,
    /// Ordinary reads and writes
    #[default]
    Normal,
    /// Calls an end user is actively waiting on
    High,
}
