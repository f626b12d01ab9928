//! Verbose tracing of extraction and decipher decisions
//!
//! Off by default. Turning it on only adds `debug!` events; results never change.

use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable decision tracing
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

/// Check whether decision tracing is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Emit a `tracing::debug!` event when decision tracing is enabled
#[macro_export]
macro_rules! diag {
    ($($arg:tt)*) => {
        if $crate::utils::diagnostics::is_verbose() {
            ::tracing::debug!($($arg)*);
        }
    };
}
