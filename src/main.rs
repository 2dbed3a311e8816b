//! addon-catalog - builds the static add-on repository
//!
//! Reads every ZIP archive in SOURCE, publishes them under OUTPUT/addons and
//! OUTPUT/extensions with an `index.json` each, and writes OUTPUT/index.html.

use addon_catalog::{CatalogPipeline, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "addon-catalog", version, about)]
struct Cli {
    /// Directory containing the source ZIP archives
    #[arg(default_value = "src")]
    source: PathBuf,

    /// Directory the static repository is written to
    #[arg(default_value = "repo")]
    output: PathBuf,

    /// Public URL OUTPUT is served from; archive URLs are relative when unset
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Number of archives processed in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.source, &self.output)
            .with_base_url(self.base_url.clone());
        if let Some(jobs) = self.jobs {
            config = config.with_concurrency(jobs);
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match CatalogPipeline::new(cli.pipeline_config()).run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Catalog build failed");
            ExitCode::FAILURE
        }
    }
}
