use botpdater::updater::git_ops::Git2Vcs;
use botpdater::updater::notify::Notifier;
use botpdater::updater::reload::ReloadClient;
use botpdater::updater::{Config, Updater};
use clap::Parser;
use log::{debug, info};
use std::error::Error;

/// Pulls bot repositories, copies their files and reloads the bots.
#[derive(Parser)]
struct Cli {
    /// Path to config file (.toml, otherwise JSON with `//` comment lines)
    #[arg(short, long, default_value = "autoupdate.json")]
    config: String,
    /// Process repositories concurrently
    #[arg(long)]
    parallel: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    debug!("Starting update run...");

    let args = Cli::parse();
    let config = Config::load_config(&args.config)?;

    let notifier = Notifier::from_config(config.telegram.as_ref(), reqwest::Client::new());
    let updater = Updater::new(Git2Vcs, notifier, ReloadClient::new(config.api.clone()));

    let summary = if args.parallel {
        updater.run_concurrent(&config.repositories).await
    } else {
        updater.run(&config.repositories).await
    };

    info!(
        "Run finished: {} of {} repositories changed, {} files copied, {} bots reloaded, {} bot failures",
        summary.changed(),
        summary.repositories.len(),
        summary.files_copied(),
        summary.reloads(),
        summary.failures()
    );
    Ok(())
}
