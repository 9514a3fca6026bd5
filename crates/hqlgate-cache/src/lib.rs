//! hqlgate Time-Wheel Cache
//!
//! An in-memory TTL cache with O(1) amortized expiry. Instead of keeping a
//! timer per entry, the cache schedules every key into a slot of a circular
//! wheel; a background sweep advances a cursor at a fixed sub-second cadence
//! and drains one slot per tick. The trade-offs are a bounded maximum TTL
//! (the wheel's circumference) and coarse expiry granularity: an entry may
//! outlive its TTL by up to one tick interval.
//!
//! # Example
//!
//! ```
//! use hqlgate_cache::{CacheConfig, TimeWheelCache};
//!
//! let cache: TimeWheelCache<String> =
//!     TimeWheelCache::new(CacheConfig::default()).unwrap();
//! cache.set("key".into(), "value".into(), 60).unwrap();
//! assert_eq!(cache.get("key"), Some("value".into()));
//! ```
//!
//! # Concurrency
//!
//! One mutex guards the key/value map, the slot ring, and the cursor; it is
//! shared by `set`, `get`, and the purge sweep, so the three are linearized.
//! Critical sections are short map/ring mutations and the lock is never held
//! across an await point.

mod wheel;

pub use wheel::{CacheConfig, TimeWheelCache};
