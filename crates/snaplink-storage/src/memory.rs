use async_trait::async_trait;
use parking_lot::Mutex;
use snaplink_core::repository::{ReadRepository, Repository, Result};
use snaplink_core::{ShortCode, ShortLink, StorageError};
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Default)]
struct Indices {
    by_code: HashMap<ShortCode, ShortLink>,
    by_long_url: HashMap<String, ShortLink>,
}

/// In-memory implementation of the [`Repository`] trait.
///
/// Both indices sit behind one exclusive lock that every operation takes for
/// its whole duration, so operations are totally ordered and an insert or
/// delete is never observed half-applied. Reads do not get a cheaper path.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    indices: Mutex<Indices>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Mutex::new(Indices {
                by_code: HashMap::with_capacity(capacity),
                by_long_url: HashMap::with_capacity(capacity),
            }),
        }
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn get_by_short_code(&self, code: &ShortCode) -> Result<ShortLink> {
        let indices = self.indices.lock();
        indices
            .by_code
            .get(code)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(code.to_string()))
    }

    async fn get_by_long_url(&self, long_url: &str) -> Result<ShortLink> {
        let indices = self.indices.lock();
        indices
            .by_long_url
            .get(long_url)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(long_url.to_string()))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.indices.lock().by_code.len() as u64)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, link: &ShortLink) -> Result<()> {
        let mut indices = self.indices.lock();

        // Checked under the same lock as the insert, so two racing inserts
        // for one URL cannot both succeed.
        if indices.by_code.contains_key(&link.short_code) {
            return Err(StorageError::Conflict(link.short_code.to_string()));
        }
        if indices.by_long_url.contains_key(&link.long_url) {
            return Err(StorageError::Conflict(link.long_url.clone()));
        }

        indices
            .by_long_url
            .insert(link.long_url.clone(), link.clone());
        indices.by_code.insert(link.short_code.clone(), link.clone());
        trace!(code = %link.short_code, "inserted short link");
        Ok(())
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        let mut indices = self.indices.lock();

        let link = indices
            .by_code
            .remove(code)
            .ok_or_else(|| StorageError::NotFound(code.to_string()))?;
        indices.by_long_url.remove(&link.long_url);
        trace!(code = %code, "deleted short link");
        Ok(())
    }
}
