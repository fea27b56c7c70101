//! Minimal host stub intended for downstream bindings (Swift/Kotlin shells).
//! Guarded by the `host` feature: loads configuration, installs logging,
//! boots the headless [`PilotApp`] with production handlers and reports the
//! resulting state.
use anyhow::{Context, Result};
use clap::Parser;
use pilot_app::PilotApp;
use pilot_core::PilotConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "app-host", about = "Boot the Earn Pilot client core")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run due ad reloads once before exiting
    #[arg(long)]
    process_retries: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = PilotConfig::load(args.config.as_deref()).context("loading configuration")?;
    pilot_effects::logging::init(&config.log_filter);

    let app = PilotApp::builder()
        .with_config(config)
        .with_production_defaults()
        .await
        .context("creating effect handlers")?
        .build()
        .context("building client core")?;

    let authenticated = app.start().await;
    if args.process_retries {
        app.ads().process_due_retries().await;
    }

    println!(
        "App host ready: authenticated={authenticated} simulated_ads={} banner={}",
        app.ads().is_simulated(),
        app.ads().banner_ad_id()
    );
    Ok(())
}
