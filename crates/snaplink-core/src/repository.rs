use crate::error::StorageError;
use crate::link::ShortLink;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A read-only view of a repository.
///
/// Lookups fail with [`StorageError::NotFound`] when nothing matches.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the link stored under a short code.
    async fn get_by_short_code(&self, code: &ShortCode) -> Result<ShortLink>;

    /// Retrieves the link that shortens `long_url`.
    async fn get_by_long_url(&self, long_url: &str) -> Result<ShortLink>;

    /// Returns the number of stored links.
    async fn count(&self) -> Result<u64>;
}

/// The storage contract the shortener relies on.
///
/// Implementations own the canonical set of links and must keep both the
/// short code and the long URL unique across it.
#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new link.
    ///
    /// Returns `Err(Conflict)` if the short code or the long URL is already
    /// stored.
    async fn insert(&self, link: &ShortLink) -> Result<()>;

    /// Deletes the link stored under a short code.
    ///
    /// Returns `Err(NotFound)` if there is none.
    async fn delete(&self, code: &ShortCode) -> Result<()>;
}
