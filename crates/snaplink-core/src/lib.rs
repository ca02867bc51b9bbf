//! Core types and traits for the snaplink URL shortener.
//!
//! This crate holds the domain record, the base62 short-code encoding, the
//! storage and cache contracts, and the error taxonomy shared by every other
//! crate in the workspace.

pub mod base62;
pub mod cache;
pub mod error;
pub mod link;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use cache::UrlCache;
pub use error::{CacheError, CoreError, ShortenerError, StorageError};
pub use link::ShortLink;
pub use repository::{ReadRepository, Repository};
pub use shortcode::ShortCode;
pub use shortener::{Shortened, Shortener};
