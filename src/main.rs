use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use conda_prune::{AnacondaRemover, PruneArgs, PruneConfig, RepodataSearch, prune};

#[derive(Parser)]
#[command(name = "conda-prune", version)]
#[command(about = "Remove old nightly builds from an anaconda.org channel", long_about = None)]
struct Cli {
    #[command(flatten)]
    args: PruneArgs,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PruneConfig::try_from(cli.args)?;

    let search = RepodataSearch::new(&config)?;
    let remover = AnacondaRemover::new(&config)?;

    prune::run(&config, &search, &remover, Local::now().date_naive())?;

    Ok(())
}
