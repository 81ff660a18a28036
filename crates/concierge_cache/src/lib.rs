//! Response caching with TTL support.
//!
//! This crate caches read responses from the booking service so repeated
//! lookups within a conversation do not spend the hourly request budget.
//! Entries expire after a per-operation TTL and the cache is bounded, evicting
//! the earliest-inserted entry when full.

#![warn(missing_docs)]

mod cache;
mod key;
mod shared;

pub use cache::{CacheConfig, CacheConfigBuilder, CacheEntry, ResponseCache};
pub use key::CacheKey;
pub use shared::{Lookup, SharedResponseCache};
