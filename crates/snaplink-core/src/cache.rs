use crate::error::CacheError;
use crate::link::ShortLink;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, CacheError>;

/// A volatile cache of short links keyed by [`ShortCode`].
///
/// The cache never owns canonical data. Entries may vanish at any time and
/// backends may be remote, slow, or down, so callers treat both `Ok(None)`
/// and `Err(_)` from [`get_link`](UrlCache::get_link) as a miss.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get a link from the cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_link(&self, code: &ShortCode) -> Result<Option<ShortLink>>;

    /// Store a link in the cache, expiring after `ttl`.
    async fn set_link(&self, code: &ShortCode, link: &ShortLink, ttl: Duration) -> Result<()>;

    /// Remove a link from the cache.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;
}
