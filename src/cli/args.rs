//! Command line argument parsing

use crate::core::{CipherOptions, FailurePolicy};
use crate::platform::fetch::{FetchOptions, HttpFetcherConfig};
use crate::utils::retry::RetryConfig;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// RYT signature resolver - extract player decipher code and resolve media URLs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the fragment list extracted from a player script as JSON
    Extract {
        /// Player path or URL (or local file with --file)
        player: String,

        /// Read the player script from a local file instead of fetching it
        #[arg(long)]
        file: bool,
    },
    /// Resolve a JSON array of format descriptors into final URLs
    Resolve {
        /// Player path or URL
        player: String,

        /// JSON file containing format descriptors
        #[arg(long, value_name = "FILE")]
        formats: PathBuf,
    },
}

/// Options shared by every subcommand
#[derive(ClapArgs, Debug, Clone)]
pub struct CommonArgs {
    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s", global = true)]
    pub timeout: humantime::Duration,

    /// HTTP retries for transient errors
    #[arg(long, default_value = "3", global = true)]
    pub retries: u32,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT", global = true)]
    pub user_agent: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL", global = true)]
    pub proxy: Option<String>,

    /// Extra request header (repeatable)
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header, global = true)]
    pub headers: Vec<(String, String)>,

    /// Skip failing formats instead of discarding the whole batch
    #[arg(long, global = true)]
    pub per_format: bool,

    /// Directory to dump the player script into when extraction fails
    #[arg(long, value_name = "DIR", global = true)]
    pub dump_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Default for CommonArgs {
    fn default() -> Self {
        Self {
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            retries: 3,
            user_agent: None,
            proxy: None,
            headers: Vec::new(),
            per_format: false,
            dump_dir: None,
            verbose: false,
            quiet: false,
        }
    }
}

impl CommonArgs {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.per_format {
            FailurePolicy::PerFormat
        } else {
            FailurePolicy::AllOrNothing
        }
    }

    pub fn cipher_options(&self) -> CipherOptions {
        let options = CipherOptions::default().with_failure_policy(self.failure_policy());
        match &self.dump_dir {
            Some(dir) => options.with_dump_dir(dir.clone()),
            None => options,
        }
    }

    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig {
            timeout: self.timeout_duration(),
            user_agent: self.user_agent.clone(),
            retry: RetryConfig::default().with_max_retries(self.retries),
            ..Default::default()
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            headers: self.headers.clone(),
            user_agent: self.user_agent.clone(),
            proxy: self.proxy.clone(),
            timeout: Some(self.timeout_duration()),
        }
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

/// Parse a `Name: value` header argument
pub fn parse_header(header: &str) -> Result<(String, String), String> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", header))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{}'", header));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
