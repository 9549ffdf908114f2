#![forbid(unsafe_code)]
#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod cli;
mod config;
mod gateway;
mod message;
mod mirror;
mod provenance;
mod utils;

use cli::{Cli, Command};
use config::Config;
use gateway::{HttpGateway, RemoteGateway};
use mirror::{ChannelMirror, GuildMirror};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Arc::new(Config::load(cli.config.as_deref())?);
    utils::logging::init_tracing(&config.logging);
    info!("discord channel mirror starting up");

    let gateway: Arc<dyn RemoteGateway> = Arc::new(HttpGateway::new(&config)?);

    if cli.watch {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.mirror.poll_interval));
        loop {
            ticker.tick().await;
            if let Err(err) = run_once(&cli.command, &gateway, &config).await {
                error!("mirror pass failed: {err}");
            }
        }
    }

    run_once(&cli.command, &gateway, &config).await?;
    info!("discord channel mirror shutting down");
    Ok(())
}

async fn run_once(
    command: &Command,
    gateway: &Arc<dyn RemoteGateway>,
    config: &Arc<Config>,
) -> Result<()> {
    let report = match command {
        Command::Channels { local, remote } => {
            ChannelMirror::new(gateway.clone(), config.clone())
                .reconcile(local, remote)
                .await?
        }
        Command::Guilds { local, remote } => {
            GuildMirror::new(gateway.clone(), config.clone())
                .reconcile(local, remote)
                .await
        }
    };
    info!(
        "mirror pass finished created={} edited={} deleted={} failed={}",
        report.created, report.edited, report.deleted, report.failed
    );
    Ok(())
}
