use crate::retry::retry_with_policy;
use crate::settings::{ShortenerSettings, DEFAULT_CACHE_TTL};
use async_trait::async_trait;
use snaplink_core::{
    CacheError, Repository, ShortCode, ShortLink, Shortened, Shortener, ShortenerError,
    StorageError, UrlCache,
};
use snaplink_generator::{Generated, Generator};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

type Result<T> = std::result::Result<T, ShortenerError>;

/// Longest long URL accepted, in bytes. Matches the `long_url` column.
pub const MAX_URL_LEN: usize = 2048;

/// A concrete implementation of the [`Shortener`] trait.
///
/// Ties together a [`Repository`] (the source of truth), a [`UrlCache`] in
/// front of it and a [`Generator`] for new identifiers:
/// - create: look up the long URL, otherwise generate, encode and insert
/// - resolve: cache-aside read through to the repository
/// - delete: remove from the repository and invalidate the cache
///
/// Duplicate creates racing each other are settled by the repository's
/// uniqueness constraint; the loser returns the winner's link.
#[derive(Debug)]
pub struct ShortenerService<R, C, G> {
    repository: Arc<R>,
    cache: Arc<C>,
    generator: Arc<G>,
    settings: ShortenerSettings,
}

impl<R, C, G> Clone for ShortenerService<R, C, G> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            generator: Arc::clone(&self.generator),
            settings: self.settings.clone(),
        }
    }
}

impl<R: Repository, C: UrlCache, G: Generator> ShortenerService<R, C, G> {
    /// Creates a service with default settings.
    pub fn new(repository: R, cache: C, generator: G) -> Self {
        Self::with_settings(repository, cache, generator, ShortenerSettings::default())
    }

    pub fn with_settings(
        repository: R,
        cache: C,
        generator: G,
        settings: ShortenerSettings,
    ) -> Self {
        Self::from_shared(
            Arc::new(repository),
            Arc::new(cache),
            Arc::new(generator),
            settings,
        )
    }

    /// Creates a service over components already shared with other owners.
    pub fn from_shared(
        repository: Arc<R>,
        cache: Arc<C>,
        generator: Arc<G>,
        mut settings: ShortenerSettings,
    ) -> Self {
        if settings.cache_ttl.is_zero() {
            warn!(
                default_secs = DEFAULT_CACHE_TTL.as_secs(),
                "cache ttl must be positive, using default"
            );
            settings.cache_ttl = DEFAULT_CACHE_TTL;
        }

        Self {
            repository,
            cache,
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &ShortenerSettings {
        &self.settings
    }

    /// Number of stored links.
    pub async fn count(&self) -> Result<u64> {
        Ok(self.storage_call(self.repository.count()).await?)
    }

    /// Validates that the URL is an absolute http(s) URL with a host, made of
    /// at most [`MAX_URL_LEN`] ASCII bytes.
    fn validate_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }

        if url.len() > MAX_URL_LEN {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL is {} bytes, at most {MAX_URL_LEN} are allowed",
                url.len()
            )));
        }

        if !url.is_ascii() {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must be ASCII, percent-encode or punycode it first: {url}"
            )));
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {url}"
            )));
        };

        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {scheme}"
            )));
        }

        let host = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid host: {url}"
            )));
        }

        Ok(())
    }

    /// Applies the configured deadline to a call.
    async fn deadline<T, E, F>(
        &self,
        call: F,
        on_timeout: fn(String) -> E,
    ) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
    {
        match self.settings.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(on_timeout(format!("no reply within {limit:?}")))),
            None => call.await,
        }
    }

    async fn storage_call<T, F>(&self, call: F) -> std::result::Result<T, StorageError>
    where
        F: Future<Output = std::result::Result<T, StorageError>>,
    {
        self.deadline(call, StorageError::Timeout).await
    }

    async fn cache_call<T, F>(&self, call: F) -> std::result::Result<T, CacheError>
    where
        F: Future<Output = std::result::Result<T, CacheError>>,
    {
        self.deadline(call, CacheError::Timeout).await
    }

    /// Draws a fresh id, backing off while the clock is behind.
    ///
    /// Bounded by the operation deadline like any other call.
    async fn next_id(&self) -> Result<u64> {
        let draw = async {
            retry_with_policy(
                &self.settings.retry,
                || self.draw_id(),
                snaplink_snowflake::Error::is_retryable,
            )
            .await
            .map_err(|e| {
                error!(error = %e, "id generation failed");
                ShortenerError::from(e)
            })
        };
        self.deadline(draw, ShortenerError::Timeout).await
    }

    /// Polls the generator, sleeping on the runtime timer while it has no
    /// sequence numbers left.
    async fn draw_id(&self) -> std::result::Result<u64, snaplink_snowflake::Error> {
        loop {
            match self.generator.try_generate()? {
                Generated::Id(id) => return Ok(id),
                Generated::RetryAfter(wait) if wait.is_zero() => tokio::task::yield_now().await,
                Generated::RetryAfter(wait) => {
                    trace!(wait_us = wait.as_micros() as u64, "sequence exhausted, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// `Ok(None)` when the long URL has not been shortened.
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortLink>> {
        match self
            .storage_call(self.repository.get_by_long_url(long_url))
            .await
        {
            Ok(link) => Ok(Some(link)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => {
                warn!(error = %e, "lookup by long url failed");
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl<R: Repository, C: UrlCache, G: Generator> Shortener for ShortenerService<R, C, G> {
    async fn create(&self, long_url: &str) -> Result<Shortened> {
        Self::validate_url(long_url)?;

        if let Some(link) = self.find_by_long_url(long_url).await? {
            debug!(code = %link.short_code, "long url already shortened");
            return Ok(Shortened {
                link,
                total_links: 0,
            });
        }

        let attempts = self.settings.max_code_attempts.max(1);
        for attempt in 1..=attempts {
            let id = self.next_id().await?;
            let link = ShortLink::new(id, long_url);

            match self.storage_call(self.repository.insert(&link)).await {
                Ok(()) => {
                    let total_links = self.storage_call(self.repository.count()).await?;
                    info!(code = %link.short_code, id, total_links, "short link created");
                    return Ok(Shortened { link, total_links });
                }
                Err(StorageError::Conflict(_)) => {
                    // Either the same URL won a race, or the code is taken.
                    if let Some(existing) = self.find_by_long_url(long_url).await? {
                        debug!(code = %existing.short_code, "lost create race, returning existing link");
                        return Ok(Shortened {
                            link: existing,
                            total_links: 0,
                        });
                    }
                    warn!(code = %link.short_code, attempt, "short code collision, regenerating");
                }
                Err(e) => {
                    warn!(code = %link.short_code, error = %e, "insert failed");
                    return Err(e.into());
                }
            }
        }

        Err(ShortenerError::Conflict(format!(
            "no free short code after {attempts} attempts"
        )))
    }

    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        match self.cache_call(self.cache.get_link(code)).await {
            Ok(Some(link)) => {
                trace!(code = %code, "resolved from cache");
                return Ok(link.long_url);
            }
            Ok(None) => trace!(code = %code, "cache miss"),
            Err(e) => warn!(code = %code, error = %e, "cache lookup failed, reading through"),
        }

        let link = match self
            .storage_call(self.repository.get_by_short_code(code))
            .await
        {
            Ok(link) => link,
            Err(StorageError::NotFound(message)) => {
                debug!(code = %code, "short code not found");
                return Err(ShortenerError::NotFound(message));
            }
            Err(e) => {
                warn!(code = %code, error = %e, "lookup by short code failed");
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .cache_call(self.cache.set_link(code, &link, self.settings.cache_ttl))
            .await
        {
            warn!(code = %code, error = %e, "failed to populate cache");
        }

        Ok(link.long_url)
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        let deleted = self.storage_call(self.repository.delete(code)).await;

        // Invalidate even on NotFound so a stale entry cannot outlive the row.
        if let Err(e) = self.cache_call(self.cache.del(code)).await {
            warn!(code = %code, error = %e, "failed to invalidate cache entry");
        }

        match deleted {
            Ok(()) => {
                info!(code = %code, "short link deleted");
                Ok(())
            }
            Err(StorageError::NotFound(message)) => {
                debug!(code = %code, "delete of unknown short code");
                Err(ShortenerError::NotFound(message))
            }
            Err(e) => {
                warn!(code = %code, error = %e, "delete failed");
                Err(e.into())
            }
        }
    }
}
