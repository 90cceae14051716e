use anyhow::Result;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod decision;
mod lifecycle;
mod locator;
mod platform;
mod poll;
mod reaper;
mod review;
mod workflow;

use cli::RunArgs;
use config::{PassConfig, PlatformConfig};
use platform::HttpPlatform;
use poll::SystemClock;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    let args = RunArgs::parse();
    init_logging(args.verbose);

    let platform_config = PlatformConfig::from_env()?;
    tracing::debug!(?platform_config, "platform configuration");
    let pass_config = PassConfig::from_args(&args);
    let platform = HttpPlatform::new(platform_config);

    workflow::run_pass(&platform, &SystemClock, &pass_config)?;
    Ok(())
}
