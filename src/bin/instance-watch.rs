use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use instance_watch::{
    Monitor,
    config::{ProviderConfig, read_config_file},
};
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short, long, default_value = "configurations/config.json")]
    file: PathBuf,

    /// Run against the in-memory provider when no backend is configured
    #[arg(long)]
    dry_run: bool,
}

fn init(log_file: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;

    let filter = filter::Targets::new().with_targets(vec![
        ("instance_watch", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = match read_config_file(&args.file)
        .and_then(|config| config.check_provider(args.dry_run).map(|()| config))
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    init(&config.log_file)?;
    trace!("started with args: {args:?}");

    if let ProviderConfig::None = config.provider {
        warn!("dry run: using the in-memory provider, nothing is monitored or sent");
    }

    let monitor = Monitor::from_config(config);

    let scheduler = match monitor.setup_at(Utc::now()).await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("setup failed: {e}");
            eprintln!("Setup failed: {e}");
            std::process::exit(1);
        }
    };

    info!("entering main loop");
    println!("Setup complete, entering main loop.");
    scheduler.run().await;

    Ok(())
}
