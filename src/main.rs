// repo-health command line entry point.
// Loads configuration, runs one audit and writes the HTML report.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use repo_health::cache::CacheStore;
use repo_health::config::Config;
use repo_health::directory::PipelineDirectory;
use repo_health::github::GitHubClient;
use repo_health::health::{Action, Request, Scope, run_audit};
use repo_health::report;

#[derive(Parser, Debug)]
#[command(name = "repo-health")]
#[command(about = "Audit and fix GitHub settings for all organization repositories")]
struct Args {
    /// What to do besides reading cached data
    #[arg(short, long, value_enum, default_value_t = Action::None)]
    action: Action,

    /// Repository the action applies to, or "all"
    #[arg(short, long, default_value = "all")]
    repos: Scope,

    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the HTML report
    #[arg(short, long, default_value = "repo_health.html")]
    output: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    let directory = PipelineDirectory::load(&config.pipelines_file).with_context(|| {
        format!(
            "failed to read pipeline directory {}",
            config.pipelines_file.display()
        )
    })?;
    info!(
        pipelines = directory.pipelines.len(),
        cache = %config.cache_dir.display(),
        "configuration loaded"
    );

    let cache = CacheStore::new(&config.cache_dir);
    let mut client = GitHubClient::new(&config).context("failed to build GitHub client")?;
    let request = Request {
        action: args.action,
        scope: args.repos,
    };

    let audit = run_audit(&mut client, &cache, &directory, &request).await;

    let html = report::render_html(&audit, &config.web_base);
    fs::write(&args.output, html)
        .with_context(|| format!("failed to write report {}", args.output.display()))?;
    info!(path = %args.output.display(), "report written");

    print!("{}", report::summary(&audit));
    Ok(())
}
