mod cli;
mod config;
mod demo;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use ownerless_scheduler::{Scheduler, UpdateList};

use crate::cli::CliArgs;
use crate::config::CliConfig;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let mut config = CliConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    config.apply_args(&args);
    config.validate().context("invalid configuration")?;

    let mut updates = UpdateList::new();
    updates
        .register(demo::on_static_update)
        .context("failed to register static update")?;

    let mut scheduler = Scheduler::new(config.scheduler.clone());
    let frame = Duration::from_millis(config.host.frame_ms);

    info!("Pre start");
    scheduler.start(demo::static_routine());
    scheduler.start(demo::Loader::new(3));
    scheduler.start(demo::flaky(5));
    let heartbeat = scheduler.start(demo::heartbeat(frame * 4));
    info!("Post start");

    let cancel_at = config.host.frames / 2;
    for i in 0..config.host.frames {
        updates.tick();
        let report = scheduler.tick(frame);
        debug!(
            frame = i,
            steps = report.steps,
            active = scheduler.active_count(),
            "Frame complete"
        );

        if i == cancel_at && scheduler.cancel(heartbeat) {
            info!(frame = i, "Heartbeat canceled");
        }
        if config.host.realtime {
            std::thread::sleep(frame);
        }
    }

    info!(
        frames = config.host.frames,
        static_updates = demo::static_update_count(),
        still_active = scheduler.active_count(),
        "Host loop finished"
    );
    println!("{}", serde_json::to_string_pretty(&scheduler.metrics())?);
    Ok(())
}
