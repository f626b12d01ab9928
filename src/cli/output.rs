//! Output formatting
//!
//! Machine-readable results go to stdout as JSON; status lines go to stderr so the two can be
//! piped separately.

use crate::cli::args::VerbosityLevel;
use crate::core::BatchResult;
use colored::Colorize;
use serde::Serialize;
use std::time::Duration;

/// Output formatter for rytsig
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    /// Whether status lines (info, success, warning) are shown
    pub fn shows_status(&self) -> bool {
        self.verbosity != VerbosityLevel::Quiet
    }

    /// Whether debug lines are shown
    pub fn shows_debug(&self) -> bool {
        self.verbosity == VerbosityLevel::Verbose
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.shows_status() {
            eprintln!("{} {}", "info:".cyan().bold(), message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.shows_status() {
            eprintln!("{} {}", "ok:".green().bold(), message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.shows_status() {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.shows_debug() {
            eprintln!("{} {}", "debug:".dimmed(), message);
        }
    }

    /// Print a value as pretty JSON on stdout
    pub fn print_json<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Summarize a resolved batch
    pub fn print_batch_summary(
        &self,
        requested: usize,
        resolved: &BatchResult,
        elapsed: Duration,
    ) {
        match batch_summary(requested, resolved, elapsed) {
            Ok(message) => self.success(&message),
            Err(message) => self.warning(&message),
        }
        for line in format_lines(resolved) {
            self.debug(&line);
        }
    }
}

/// Summary line for a batch; `Err` when nothing resolved
pub fn batch_summary(
    requested: usize,
    resolved: &BatchResult,
    elapsed: Duration,
) -> Result<String, String> {
    if resolved.is_empty() && requested > 0 {
        return Err(format!("No URLs resolved from {} format(s)", requested));
    }
    Ok(format!(
        "Resolved {} of {} format(s) in {}",
        resolved.len(),
        requested,
        format_duration(elapsed)
    ))
}

/// One `itag=<n> <mime>` line per resolved format, ordered by itag
pub fn format_lines(resolved: &BatchResult) -> Vec<String> {
    let mut entries: Vec<_> = resolved.values().collect();
    entries.sort_by_key(|format| format.itag);
    entries
        .into_iter()
        .map(|format| {
            format!(
                "itag={} {}",
                format.itag,
                format.mime_type.as_deref().unwrap_or("unknown")
            )
        })
        .collect()
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let total_seconds = duration.as_secs();
    if total_seconds < 60 {
        format!("{}.{}s", total_seconds, duration.subsec_millis() / 100)
    } else {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    }
}
