//! Game builder command line entry point.

mod app;
mod config;
mod engine;
mod scenes;
mod version;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::app::App;

#[derive(Parser)]
#[command(name = "gamebuilder", about = "Batch builds for game projects")]
struct Cli {
    /// Project directory
    #[arg(long, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List presets and the current selection
    List,
    /// Build the selected presets
    Build {
        /// Select this preset before building
        #[arg(long)]
        preset: Option<usize>,
        /// Signed selection range relative to the selected preset
        #[arg(long, allow_hyphen_values = true)]
        range: Option<i64>,
    },
    /// Print the resolved version and output paths of a preset
    Paths {
        /// Preset index (defaults to the selected preset)
        #[arg(long)]
        preset: Option<usize>,
    },
    /// Increment the last number of the project version
    BumpVersion {
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        by: i64,
    },
    /// Build the selection after every new commit
    Watch,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        project = %cli.project.display(),
        "starting gamebuilder"
    );

    let config = config::Config::load(&cli.project)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, config))
}

async fn run(cli: Cli, config: config::Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            cancel_on_signal.cancel();
        }
    });

    let mut app = App::open(&cli.project, config, cancel).await?;

    match cli.command {
        Command::List => {
            for line in app.list() {
                println!("{line}");
            }
        }
        Command::Build { preset, range } => {
            let reports = app.build(preset, range).await?;
            for line in app::summarize(&reports) {
                println!("{line}");
            }
        }
        Command::Paths { preset } => {
            let paths = app.paths(preset)?;
            println!("preset:     {}", paths.label);
            println!("version:    {}", paths.version);
            println!("build:      {}", paths.build_number);
            println!("output:     {}", paths.build_path);
            if let Some(archive) = paths.compressed_path {
                println!("archive:    {archive}");
            }
        }
        Command::BumpVersion { by } => {
            let (before, after) = app.bump_version(by)?;
            println!("{before} -> {after}");
        }
        Command::Watch => app.watch().await?,
    }

    Ok(())
}
