//! Core data types for rytsig

pub mod config;
pub mod format;

pub use config::*;
pub use format::*;
