//! Per-player memoization of extracted fragments

use crate::core::CipherOptions;
use crate::diag;
use crate::error::SigError;
use crate::platform::extractor::{extract_functions, FragmentList};
use crate::platform::fetch::{FetchOptions, PlayerFetcher};
use crate::utils::dump::PlayerDumps;
use moka::future::Cache;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fragment lists keyed by player identifier.
///
/// Concurrent requests for the same uncached player share one fetch+extract; every waiter gets
/// the same list or the same failure. Only successes are stored.
pub struct ExtractionCache {
    entries: Cache<String, Arc<FragmentList>>,
    fetcher: Arc<dyn PlayerFetcher>,
    dumps: Arc<PlayerDumps>,
    dump_dir: Option<PathBuf>,
}

impl ExtractionCache {
    /// Create a cache that keeps entries for the process lifetime
    pub fn new(fetcher: Arc<dyn PlayerFetcher>) -> Self {
        Self::with_options(fetcher, &CipherOptions::default())
    }

    /// Create a cache honouring TTL, capacity and dump settings
    pub fn with_options(fetcher: Arc<dyn PlayerFetcher>, options: &CipherOptions) -> Self {
        let mut builder = Cache::<String, Arc<FragmentList>>::builder();
        if let Some(ttl) = options.cache_ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(capacity) = options.cache_capacity {
            builder = builder.max_capacity(capacity);
        }

        Self {
            entries: builder.build(),
            fetcher,
            dumps: Arc::new(PlayerDumps::new()),
            dump_dir: options.dump_dir.clone(),
        }
    }

    /// Get the fragment list for `player`, fetching and extracting on a miss
    pub async fn get_fragments(
        &self,
        player: &str,
        options: &FetchOptions,
    ) -> Result<Arc<FragmentList>, SigError> {
        self.entries
            .try_get_with(player.to_string(), self.fetch_and_extract(player, options))
            .await
            .map_err(|source| SigError::Extraction {
                player: player.to_string(),
                source,
            })
    }

    async fn fetch_and_extract(
        &self,
        player: &str,
        options: &FetchOptions,
    ) -> Result<Arc<FragmentList>, SigError> {
        diag!("Fetching player: {}", player);
        let body = self.fetcher.fetch(player, options).await?;
        self.dumps.record(player, &body);
        diag!("Player fetched, length={}", body.len());

        let extracted = tokio::task::spawn_blocking(move || extract_functions(&body)).await?;
        if !extracted.has_decipher() {
            warn!("Could not extract decipher function from player: {}", player);
            if let Some(dir) = &self.dump_dir {
                if let Err(e) = self.dumps.dump_latest(dir) {
                    warn!("Failed to dump player script to {}: {}", dir.display(), e);
                }
            }
            return Err(SigError::NoDecipherFunction);
        }

        let fragments = extracted.into_fragment_list();
        debug!("Cached {} fragment(s) for {}", fragments.len(), player);
        Ok(Arc::new(fragments))
    }

    /// Cached fragments without fetching
    pub async fn get_cached(&self, player: &str) -> Option<Arc<FragmentList>> {
        self.entries.get(player).await
    }

    /// Drop one player version
    pub async fn invalidate(&self, player: &str) {
        self.entries.invalidate(player).await;
    }

    /// Drop every cached player version
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Recently fetched player bodies
    pub fn dumps(&self) -> &Arc<PlayerDumps> {
        &self.dumps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fetch::mock::MockFetcher;
    use futures::future::join_all;

    const PLAYER: &str = r#"
function dc(a){a=a.split("");Xy.rv(a);return a.join("")}
var nt=function(b){return b.toUpperCase()};
var Xy={rv:function(a){a.reverse()}};
"#;

    #[tokio::test]
    async fn test_concurrent_requests_fetch_once() {
        let fetcher = Arc::new(MockFetcher::new(PLAYER));
        let cache = ExtractionCache::new(fetcher.clone());
        let options = FetchOptions::default();

        let results = join_all((0..8).map(|_| cache.get_fragments("/player/a.js", &options))).await;

        assert_eq!(fetcher.calls(), 1);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.len(), 3);
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
        }
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_shared() {
        let fetcher = Arc::new(MockFetcher::new(PLAYER).failing_first(1));
        let cache = ExtractionCache::new(fetcher.clone());
        let options = FetchOptions::default();

        let results = join_all((0..5).map(|_| cache.get_fragments("/player/a.js", &options))).await;

        assert_eq!(fetcher.calls(), 1);
        let sources: Vec<Arc<SigError>> = results
            .into_iter()
            .map(|result| match result {
                Err(SigError::Extraction { source, .. }) => source,
                other => panic!("expected extraction error, got {:?}", other),
            })
            .collect();
        assert!(matches!(
            sources[0].as_ref(),
            SigError::HttpStatus { status: 500, .. }
        ));
        assert!(sources.iter().all(|s| Arc::ptr_eq(s, &sources[0])));
    }

    #[tokio::test]
    async fn test_failures_are_not_memoized() {
        let fetcher = Arc::new(MockFetcher::new(PLAYER).failing_first(1));
        let cache = ExtractionCache::new(fetcher.clone());
        let options = FetchOptions::default();

        assert!(cache.get_fragments("/player/a.js", &options).await.is_err());
        assert!(cache.get_cached("/player/a.js").await.is_none());

        let fragments = cache.get_fragments("/player/a.js", &options).await.unwrap();
        assert_eq!(fragments.len(), 3);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_successes_are_memoized_per_player() {
        let fetcher = Arc::new(MockFetcher::new(PLAYER));
        let cache = ExtractionCache::new(fetcher.clone());
        let options = FetchOptions::default();

        cache.get_fragments("/player/a.js", &options).await.unwrap();
        cache.get_fragments("/player/a.js", &options).await.unwrap();
        cache.get_fragments("/player/b.js", &options).await.unwrap();
        assert_eq!(fetcher.calls(), 2);

        cache.invalidate("/player/a.js").await;
        cache.get_fragments("/player/a.js", &options).await.unwrap();
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(cache.dumps().names()[0], "/player/a.js");
    }

    #[tokio::test]
    async fn test_missing_decipher_fails_and_dumps() {
        let dir = tempfile::tempdir().unwrap();
        let body = "var Xy={rv:function(a){a.reverse()}};";
        let fetcher = Arc::new(MockFetcher::new(body));
        let options = CipherOptions {
            dump_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let cache = ExtractionCache::with_options(fetcher, &options);

        let error = cache
            .get_fragments("/player/broken.js", &FetchOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(error.root_cause(), SigError::NoDecipherFunction));
        let dumped = std::fs::read_to_string(dir.path().join("player-script.js")).unwrap();
        assert_eq!(dumped, body);
    }
}
