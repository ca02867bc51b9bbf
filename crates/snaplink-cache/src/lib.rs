//! [`UrlCache`] implementations for snaplink.
//!
//! - [`MokaUrlCache`]: bounded in-process cache with per-entry TTL.
//! - [`RedisUrlCache`]: shared cache storing links as JSON under a key prefix.

pub mod moka;
pub mod redis;

pub use self::moka::{MokaCacheConfig, MokaUrlCache};
pub use self::redis::RedisUrlCache;
pub use snaplink_core::cache::{Result, UrlCache};
pub use snaplink_core::CacheError;
