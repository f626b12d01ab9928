//! Resolver configuration

use std::path::PathBuf;
use std::time::Duration;

/// How a decipher fault inside a batch is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any fault discards the whole batch
    #[default]
    AllOrNothing,
    /// A failing format is logged and skipped, siblings still resolve
    PerFormat,
}

/// Options for [`crate::Cipher`]
#[derive(Debug, Clone)]
pub struct CipherOptions {
    /// Batch failure policy
    pub failure_policy: FailurePolicy,
    /// Expire cached fragment lists after this long (process lifetime if unset)
    pub cache_ttl: Option<Duration>,
    /// Maximum number of cached player versions
    pub cache_capacity: Option<u64>,
    /// Directory receiving `player-script.js` when extraction fails
    pub dump_dir: Option<PathBuf>,
}

impl Default for CipherOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::AllOrNothing,
            cache_ttl: None,
            cache_capacity: None,
            dump_dir: None,
        }
    }
}

impl CipherOptions {
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CipherOptions::default();
        assert_eq!(options.failure_policy, FailurePolicy::AllOrNothing);
        assert!(options.cache_ttl.is_none());
        assert!(options.cache_capacity.is_none());
        assert!(options.dump_dir.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let options = CipherOptions::default()
            .with_failure_policy(FailurePolicy::PerFormat)
            .with_cache_ttl(Duration::from_secs(600))
            .with_cache_capacity(16)
            .with_dump_dir("/tmp/dumps");

        assert_eq!(options.failure_policy, FailurePolicy::PerFormat);
        assert_eq!(options.cache_ttl, Some(Duration::from_secs(600)));
        assert_eq!(options.cache_capacity, Some(16));
        assert_eq!(options.dump_dir, Some(PathBuf::from("/tmp/dumps")));
    }
}
