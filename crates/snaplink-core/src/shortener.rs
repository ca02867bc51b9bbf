use crate::link::ShortLink;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

/// Outcome of [`Shortener::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortened {
    /// The link for the requested URL, new or pre-existing.
    pub link: ShortLink,
    /// Total number of stored links right after a new link was inserted.
    ///
    /// `0` means no new link was created and `link` already existed; it is
    /// not the true total in that case.
    pub total_links: u64,
}

impl Shortened {
    pub fn is_new(&self) -> bool {
        self.total_links > 0
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `long_url`, reusing the existing link if it was shortened
    /// before.
    async fn create(&self, long_url: &str) -> Result<Shortened>;

    /// Resolves a short code to its long URL.
    async fn resolve(&self, code: &ShortCode) -> Result<String>;

    /// Deletes the link stored under a short code.
    async fn delete(&self, code: &ShortCode) -> Result<()>;
}
