//! Cache-aside orchestration of id generation, storage and caching.

pub mod retry;
pub mod service;
pub mod settings;

pub use retry::RetryPolicy;
pub use service::ShortenerService;
pub use settings::ShortenerSettings;
pub use snaplink_core::{Shortened, Shortener, ShortenerError};
