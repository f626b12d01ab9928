//! Error types for rytsig

use std::sync::Arc;
use thiserror::Error;

/// Main error type for rytsig operations
#[derive(Debug, Error)]
pub enum SigError {
    #[error("Could not extract decipher function from player script")]
    NoDecipherFunction,

    #[error("Extraction failed for player {player}: {source}")]
    Extraction {
        player: String,
        #[source]
        source: Arc<SigError>,
    },

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Cipher error: {0}")]
    CipherError(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Worker task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

impl SigError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            SigError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SigError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if error came out of player acquisition (fetch or extraction)
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            SigError::Extraction { .. } | SigError::NoDecipherFunction
        )
    }

    /// Root cause behind shared extraction failures
    pub fn root_cause(&self) -> &SigError {
        match self {
            SigError::Extraction { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        let err = SigError::HttpStatus {
            url: "https://x.test/p.js".to_string(),
            status: 503,
        };
        assert!(err.is_retryable());

        let err = SigError::HttpStatus {
            url: "https://x.test/p.js".to_string(),
            status: 429,
        };
        assert!(err.is_retryable());

        let err = SigError::HttpStatus {
            url: "https://x.test/p.js".to_string(),
            status: 404,
        };
        assert!(!err.is_retryable());

        assert!(!SigError::NoDecipherFunction.is_retryable());
        assert!(!SigError::Evaluation("boom".to_string()).is_retryable());
    }

    #[test]
    fn test_root_cause_unwraps_extraction() {
        let err = SigError::Extraction {
            player: "/s/player/abc/base.js".to_string(),
            source: Arc::new(SigError::NoDecipherFunction),
        };
        assert!(err.is_extraction_error());
        assert!(matches!(err.root_cause(), SigError::NoDecipherFunction));
        assert!(err.to_string().contains("/s/player/abc/base.js"));
    }
}
