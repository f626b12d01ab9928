//! Utility functions for rytsig

pub mod cache;
pub mod diagnostics;
pub mod dump;
pub mod retry;
pub mod url;

pub use cache::*;
pub use diagnostics::*;
pub use dump::*;
pub use retry::*;
pub use self::url::*;
