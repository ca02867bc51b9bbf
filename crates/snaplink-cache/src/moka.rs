use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use snaplink_core::cache::Result;
use snaplink_core::{ShortCode, ShortLink, UrlCache};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct CachedLink {
    link: ShortLink,
    ttl: Duration,
}

/// Expires every entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedLink> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedLink,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedLink,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// An in-memory cache implementation using Moka.
///
/// Capacity is bounded; each entry expires after the TTL passed to
/// [`set_link`](UrlCache::set_link), so one cache serves callers with
/// different TTL policies.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    cache: Cache<String, CachedLink>,
}

impl MokaUrlCache {
    /// Creates a new Moka URL cache holding at most 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Creates a new Moka URL cache with a custom maximum capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        MokaCacheConfig::builder()
            .max_capacity(max_capacity)
            .build()
            .into()
    }

    /// Returns a builder for creating a custom cache configuration.
    pub fn builder() -> MokaCacheConfigBuilder {
        MokaCacheConfig::builder()
    }

    /// Number of live entries, after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_link(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        trace!(code = %code, "Fetching link from Moka cache");

        match self.cache.get(code.as_str()).await {
            Some(cached) => {
                debug!(code = %code, "Cache hit in Moka");
                Ok(Some(cached.link))
            }
            None => {
                trace!(code = %code, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set_link(&self, code: &ShortCode, link: &ShortLink, ttl: Duration) -> Result<()> {
        trace!(code = %code, ttl_ms = ttl.as_millis() as u64, "Storing link in Moka cache");

        let cached = CachedLink {
            link: link.clone(),
            ttl,
        };
        self.cache.insert(code.as_str().to_string(), cached).await;
        debug!(code = %code, "Cached link in Moka");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "Removing link from Moka cache");

        self.cache.invalidate(code.as_str()).await;
        debug!(code = %code, "Removed link from Moka cache (if present)");
        Ok(())
    }
}

/// Configuration for creating a [`MokaUrlCache`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct MokaCacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default = DEFAULT_MAX_CAPACITY)]
    pub max_capacity: u64,
    /// Upper bound on how long an entry may sit unread, on top of its TTL.
    #[builder(default, setter(strip_option))]
    pub tti: Option<Duration>,
}

impl Default for MokaCacheConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<MokaCacheConfig> for MokaUrlCache {
    fn from(config: MokaCacheConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl);

        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        MokaUrlCache {
            cache: builder.build(),
        }
    }
}
