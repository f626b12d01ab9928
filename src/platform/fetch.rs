//! Player script retrieval

use crate::error::SigError;
use crate::utils::retry::{RetryConfig, RetryExecutor};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default origin for relative player paths
pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Per-request options handed through to the fetcher untouched
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra request headers
    pub headers: Vec<(String, String)>,
    /// User agent override
    pub user_agent: Option<String>,
    /// Proxy URL (http/https/socks)
    pub proxy: Option<String>,
    /// Request timeout override
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Retrieves raw player script text
#[async_trait]
pub trait PlayerFetcher: Send + Sync {
    /// Fetch the player identified by `player`
    async fn fetch(&self, player: &str, options: &FetchOptions) -> Result<String, SigError>;
}

/// HTTP fetcher configuration
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Origin used for relative player paths
    pub base_url: String,
    /// Default user agent
    pub user_agent: Option<String>,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            retry: RetryConfig::default(),
        }
    }
}

/// `reqwest`-backed [`PlayerFetcher`]
pub struct HttpPlayerFetcher {
    client: Client,
    config: HttpFetcherConfig,
    retry: RetryExecutor,
}

impl HttpPlayerFetcher {
    /// Create a fetcher with custom configuration
    pub fn with_config(config: HttpFetcherConfig) -> Result<Self, SigError> {
        let client = Self::client_builder(&config).build()?;
        Ok(Self {
            client,
            retry: RetryExecutor::with_config(config.retry.clone()),
            config,
        })
    }

    fn client_builder(config: &HttpFetcherConfig) -> ClientBuilder {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        builder
    }

    pub fn config(&self) -> &HttpFetcherConfig {
        &self.config
    }

    /// Resolve a player identifier against the configured origin
    pub fn resolve_url(&self, player: &str) -> Result<Url, SigError> {
        match Url::parse(player) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(Url::parse(&self.config.base_url)?.join(player)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Client for these options; proxies need a dedicated client
    fn client_for(&self, options: &FetchOptions) -> Result<Client, SigError> {
        match &options.proxy {
            Some(proxy) => Ok(Self::client_builder(&self.config)
                .proxy(reqwest::Proxy::all(proxy)?)
                .build()?),
            None => Ok(self.client.clone()),
        }
    }

    fn build_request(
        client: &Client,
        url: &Url,
        options: &FetchOptions,
    ) -> reqwest::RequestBuilder {
        let mut request = client.get(url.clone());
        if let Some(user_agent) = &options.user_agent {
            request = request.header(reqwest::header::USER_AGENT, user_agent.as_str());
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        request
    }
}

impl Default for HttpPlayerFetcher {
    fn default() -> Self {
        let config = HttpFetcherConfig::default();
        let client = Self::client_builder(&config)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            retry: RetryExecutor::with_config(config.retry.clone()),
            config,
        }
    }
}

#[async_trait]
impl PlayerFetcher for HttpPlayerFetcher {
    async fn fetch(&self, player: &str, options: &FetchOptions) -> Result<String, SigError> {
        let url = self.resolve_url(player)?;
        let client = self.client_for(options)?;
        debug!("Fetching player script from {}", url);

        let body = self
            .retry
            .execute(|| {
                let request = Self::build_request(&client, &url, options);
                let url = url.to_string();
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if !status.is_success() {
                        return Err(SigError::HttpStatus {
                            url,
                            status: status.as_u16(),
                        });
                    }
                    Ok(response.text().await?)
                }
            })
            .await?;

        debug!("Player fetched, length={}", body.len());
        Ok(body)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn fast_fetcher(base_url: &str, max_retries: u32) -> HttpPlayerFetcher {
        HttpPlayerFetcher::with_config(HttpFetcherConfig {
            base_url: base_url.to_string(),
            retry: RetryConfig::default()
                .with_max_retries(max_retries)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter_factor(0.0),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_url() {
        let fetcher = HttpPlayerFetcher::default();
        assert_eq!(
            fetcher
                .resolve_url("/s/player/abc/player_ias.vflset/en_US/base.js")
                .unwrap()
                .as_str(),
            "https://www.youtube.com/s/player/abc/player_ias.vflset/en_US/base.js"
        );
        assert_eq!(
            fetcher.resolve_url("https://x.test/p.js").unwrap().as_str(),
            "https://x.test/p.js"
        );
    }

    #[test]
    fn test_fetch_options_builder() {
        let options = FetchOptions::default()
            .with_header("x-test", "1")
            .with_user_agent("agent")
            .with_proxy("http://proxy:8080")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(options.headers, vec![("x-test".to_string(), "1".to_string())]);
        assert_eq!(options.user_agent.as_deref(), Some("agent"));
        assert_eq!(options.proxy.as_deref(), Some("http://proxy:8080"));
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_fetch_relative_player_with_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/s/player/abc/base.js")
            .match_header("x-test", "1")
            .match_header("user-agent", "rytsig-test")
            .with_status(200)
            .with_body("var player=1;")
            .expect(1)
            .create_async()
            .await;

        let fetcher = fast_fetcher(&server.url(), 0);
        let options = FetchOptions::default()
            .with_header("x-test", "1")
            .with_user_agent("rytsig-test");
        let body = fetcher.fetch("/s/player/abc/base.js", &options).await.unwrap();

        assert_eq!(body, "var player=1;");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/base.js")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let fetcher = fast_fetcher(&server.url(), 2);
        let result = fetcher.fetch("/base.js", &FetchOptions::default()).await;

        assert!(matches!(
            result,
            Err(SigError::HttpStatus { status: 503, .. })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_does_not_retry_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.js")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let fetcher = fast_fetcher(&server.url(), 3);
        let result = fetcher.fetch("/missing.js", &FetchOptions::default()).await;

        assert!(matches!(
            result,
            Err(SigError::HttpStatus { status: 404, .. })
        ));
        mock.assert_async().await;
    }
}
