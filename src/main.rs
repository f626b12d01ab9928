//! Main entry point for rytsig CLI

use anyhow::{Context, Result};
use clap::Parser;
use rytsig::cli::{Args, Command, CommonArgs, OutputFormatter, VerbosityLevel};
use rytsig::platform::extractor::extract;
use rytsig::utils::diagnostics::set_verbose;
use rytsig::{Cipher, FormatDescriptor, HttpPlayerFetcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.common.verbosity_level();

    init_logging(verbosity);
    set_verbose(verbosity == VerbosityLevel::Verbose);
    debug!("Starting rytsig with args: {:?}", args);

    let formatter = OutputFormatter::new(verbosity);
    let result = match &args.command {
        Command::Extract { player, file } => {
            handle_extract(&args.common, &formatter, player, *file).await
        }
        Command::Resolve { player, formats } => {
            handle_resolve(&args.common, &formatter, player, formats).await
        }
    };

    if let Err(e) = result {
        formatter.error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

fn build_cipher(common: &CommonArgs) -> Result<Cipher> {
    let fetcher = HttpPlayerFetcher::with_config(common.fetcher_config())
        .context("failed to build HTTP client")?;
    Ok(Cipher::with_options(Arc::new(fetcher), common.cipher_options()))
}

/// Print the fragment list for a player
async fn handle_extract(
    common: &CommonArgs,
    formatter: &OutputFormatter,
    player: &str,
    from_file: bool,
) -> Result<()> {
    let fragments = if from_file {
        let body = tokio::fs::read_to_string(player)
            .await
            .with_context(|| format!("failed to read player script {}", player))?;
        extract(&body)
    } else {
        let cipher = build_cipher(common)?;
        let fragments = cipher
            .get_fragments(player, &common.fetch_options())
            .await
            .with_context(|| format!("failed to extract functions from {}", player))?;
        fragments.as_ref().clone()
    };

    if fragments.decipher().is_none() {
        formatter.warning("No decipher function found; the player layout may have changed");
    }
    info!("Extracted {} fragment(s)", fragments.len());
    formatter.print_json(&fragments)?;
    Ok(())
}

/// Resolve a file of format descriptors against a player
async fn handle_resolve(
    common: &CommonArgs,
    formatter: &OutputFormatter,
    player: &str,
    formats_path: &Path,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(formats_path)
        .await
        .with_context(|| format!("failed to read formats file {}", formats_path.display()))?;
    let formats: Vec<FormatDescriptor> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid format descriptors in {}", formats_path.display()))?;

    let cipher = build_cipher(common)?;
    let requested = formats.len();
    formatter.info(&format!("Resolving {} format(s) with {}", requested, player));

    let start_time = Instant::now();
    let resolved = cipher
        .resolve_batch(formats, player, &common.fetch_options())
        .await;

    formatter.print_batch_summary(requested, &resolved, start_time.elapsed());
    formatter.print_json(&resolved)?;
    Ok(())
}

/// Initialize logging system
fn init_logging(verbosity: VerbosityLevel) {
    let default_level = match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "info",
        VerbosityLevel::Verbose => "debug",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}
