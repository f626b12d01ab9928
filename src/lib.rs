//! # rytsig - RYT signature resolver
//!
//! Resolves playable media URLs from a video platform's ciphered format descriptors.
//!
//! ## Features
//!
//! - Structural extraction of decipher, helper and n-transform code from player scripts
//! - Per-player memoization with request coalescing
//! - Isolated V8 execution of the extracted code
//! - Batch resolution with all-or-nothing or per-format failure policy
//!
//! ## Example
//!
//! ```rust,no_run
//! use rytsig::{Cipher, FetchOptions, FormatDescriptor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cipher = Cipher::new();
//!     let formats: Vec<FormatDescriptor> = serde_json::from_str("[]")?;
//!
//!     let player = "https://www.youtube.com/s/player/abc/base.js";
//!     let resolved = cipher
//!         .resolve_batch(formats, player, &FetchOptions::default())
//!         .await;
//!     for url in resolved.keys() {
//!         println!("{}", url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use core::{BatchResult, CipherOptions, FailurePolicy, FormatDescriptor, ResolvedFormat};
pub use error::SigError;
pub use platform::{Cipher, FetchOptions, HttpPlayerFetcher, PlayerFetcher};

/// Result type alias for rytsig operations
pub type Result<T> = std::result::Result<T, SigError>;
