//! Signature resolution entry point

use crate::core::{BatchResult, CipherOptions, FailurePolicy, FormatDescriptor};
use crate::diag;
use crate::error::SigError;
use crate::platform::extractor::FragmentList;
use crate::platform::fetch::{FetchOptions, HttpPlayerFetcher, PlayerFetcher};
use crate::platform::resolver::{resolve_formats, BatchPrograms};
use crate::utils::cache::ExtractionCache;
use std::sync::Arc;
use tracing::{debug, error};

/// Resolves ciphered format descriptors into playable URLs.
///
/// One instance owns one fragment cache; share it (behind an `Arc`) to reuse extraction work
/// across batches.
pub struct Cipher {
    cache: ExtractionCache,
    options: CipherOptions,
}

impl Cipher {
    /// Create a cipher backed by the default HTTP fetcher
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(HttpPlayerFetcher::default()))
    }

    /// Create a cipher with a custom player fetcher
    pub fn with_fetcher(fetcher: Arc<dyn PlayerFetcher>) -> Self {
        Self::with_options(fetcher, CipherOptions::default())
    }

    /// Create a cipher with a custom fetcher and options
    pub fn with_options(fetcher: Arc<dyn PlayerFetcher>, options: CipherOptions) -> Self {
        Self {
            cache: ExtractionCache::with_options(fetcher, &options),
            options,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.options.failure_policy = policy;
        self
    }

    pub fn options(&self) -> &CipherOptions {
        &self.options
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    /// Fragment list for `player`, from cache or freshly extracted
    pub async fn get_fragments(
        &self,
        player: &str,
        options: &FetchOptions,
    ) -> Result<Arc<FragmentList>, SigError> {
        self.cache.get_fragments(player, options).await
    }

    /// Resolve a batch, surfacing the failure instead of collapsing it
    pub async fn try_resolve_batch(
        &self,
        formats: Vec<FormatDescriptor>,
        player: &str,
        options: &FetchOptions,
    ) -> Result<BatchResult, SigError> {
        debug!("Resolving {} format(s) with player {}", formats.len(), player);
        let fragments = self.get_fragments(player, options).await?;
        let programs = BatchPrograms::from_fragments(&fragments)?;
        let policy = self.options.failure_policy;

        let resolved =
            tokio::task::spawn_blocking(move || resolve_formats(formats, &programs, policy))
                .await??;

        diag!("Batch resolved: {} url(s)", resolved.len());
        Ok(resolved)
    }

    /// Resolve a batch of formats keyed by final URL.
    ///
    /// Any failure (fetch, extraction, or a decipher fault under
    /// [`FailurePolicy::AllOrNothing`]) is logged and yields an empty map.
    pub async fn resolve_batch(
        &self,
        formats: Vec<FormatDescriptor>,
        player: &str,
        options: &FetchOptions,
    ) -> BatchResult {
        match self.try_resolve_batch(formats, player, options).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("Failed to resolve formats for {}: {}", player, e);
                BatchResult::new()
            }
        }
    }
}

impl Default for Cipher {
    fn default() -> Self {
        Self::new()
    }
}
