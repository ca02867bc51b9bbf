use crate::retry::RetryPolicy;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// How long a resolved link stays cached.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Fresh codes tried by one create before giving up on collisions.
pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 3;

/// Runtime settings of a [`ShortenerService`](crate::ShortenerService).
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ShortenerSettings {
    /// TTL used when populating the cache on a resolve miss. Must be positive.
    #[builder(default = DEFAULT_CACHE_TTL)]
    pub cache_ttl: Duration,

    /// Deadline applied to each repository and cache call.
    #[builder(default, setter(strip_option))]
    pub operation_timeout: Option<Duration>,

    /// Backoff for id generation when the clock moved backwards.
    #[builder(default)]
    pub retry: RetryPolicy,

    #[builder(default = DEFAULT_MAX_CODE_ATTEMPTS)]
    pub max_code_attempts: u32,
}

impl Default for ShortenerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = ShortenerSettings::default();
        assert_eq!(settings.cache_ttl, Duration::from_secs(3600));
        assert_eq!(settings.operation_timeout, None);
        assert_eq!(settings.retry, RetryPolicy::clock_skew());
        assert_eq!(settings.max_code_attempts, 3);
    }

    #[test]
    fn builder_overrides() {
        let settings = ShortenerSettings::builder()
            .cache_ttl(Duration::from_secs(30))
            .operation_timeout(Duration::from_millis(250))
            .retry(RetryPolicy::no_retry())
            .max_code_attempts(1)
            .build();

        assert_eq!(settings.cache_ttl, Duration::from_secs(30));
        assert_eq!(settings.operation_timeout, Some(Duration::from_millis(250)));
        assert_eq!(settings.max_code_attempts, 1);
    }
}
