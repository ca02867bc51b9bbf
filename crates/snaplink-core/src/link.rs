use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// The canonical record mapping a short code to its long URL.
///
/// `short_code` is always the base62 encoding of `id`; use [`ShortLink::new`]
/// to build records so the two never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    /// Globally unique identifier assigned at creation.
    pub id: u64,
    /// Encoding of `id`, the public key of the link.
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub long_url: String,
}

impl ShortLink {
    pub fn new(id: u64, long_url: impl Into<String>) -> Self {
        Self {
            id,
            short_code: ShortCode::generated(id),
            long_url: long_url.into(),
        }
    }

    /// Whether `short_code` is the encoding of `id`.
    pub fn is_consistent(&self) -> bool {
        self.short_code.decode() == Some(self.id)
    }
}
