//! rehost-ctl: operator diagnostics for a rehost archive.
//!
//! `check` verifies that the archive the server would use is present and
//! readable. `resolve` runs a URL through the replay engine without serving
//! it. Both read the same configuration as the server.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rehost_core::{AppConfig, ArchiveDb, ArchiveRoot, WwwPolicy};
use rehost_engine::{ReplayRequest, Replayer, Resolution};
use tracing_subscriber::EnvFilter;

/// Diagnostics for rehost archives.
#[derive(Parser, Debug)]
#[command(name = "rehost-ctl")]
#[command(about = "Inspect and test a rehost archive", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the archive root and store are usable.
    Check,
    /// Resolve a URL and print the response the server would send.
    Resolve {
        /// Absolute URL as a client would request it.
        url: String,

        /// Value to send as `If-None-Match`.
        #[arg(long)]
        if_none_match: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = Arc::new(AppConfig::load()?);

    let report = match args.command {
        Command::Check => check(&config).await?,
        Command::Resolve { url, if_none_match } => {
            let mut request = ReplayRequest::from_url(&url).with_context(|| format!("invalid url {url:?}"))?;
            if let Some(validator) = if_none_match {
                request = request.with_if_none_match(validator);
            }
            resolve(config, &request).await?
        }
    };

    print!("{report}");
    Ok(())
}

/// Open the archive the way a request would and summarize it.
async fn check(config: &AppConfig) -> Result<String> {
    let root = ArchiveRoot::locate(config).await?;
    let db = ArchiveDb::open(&root).await?;
    let version = db.sqlite_version().await?;
    let settings = db.load_settings().await?;
    let domain = settings.require_domain()?;
    let (records, enabled) = db.record_counts().await?;

    let www = match settings.www_policy {
        WwwPolicy::Preserve => "preserve",
        WwwPolicy::Www => "www",
        WwwPolicy::NonWww => "non-www",
    };

    Ok(format!(
        "archive root: {}\nstore: {}\nsqlite: {version}\ndomain: {domain}\nhttps: {}\nwww policy: {www}\nrecords: {records} ({enabled} enabled)\nOK\n",
        root.path().display(),
        root.store_path().display(),
        settings.force_https,
    ))
}

/// Resolve one request and describe the outcome.
async fn resolve(config: Arc<AppConfig>, request: &ReplayRequest) -> Result<String> {
    let replayer = Replayer::new(config)?;
    let mut report = String::new();

    match replayer.resolve(request).await? {
        Resolution::Delegate => {
            writeln!(report, "{}: delegated to cms", request.url())?;
        }
        Resolution::Respond(response) => {
            writeln!(report, "{}: {}", request.url(), response.status)?;
            for (name, value) in &response.headers {
                writeln!(report, "{name}: {}", String::from_utf8_lossy(value.as_bytes()))?;
            }
            let body = response.body.into_bytes().await?;
            writeln!(report, "body: {} bytes", body.len())?;
        }
    }

    Ok(report)
}
