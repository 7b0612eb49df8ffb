//! Long-running bridge mode.

use latchkey_api::{DirectoryClient, TransportConfig};
use latchkey_core::{Bridge, BridgeConfig};
use tracing::info;

use crate::cli::{GlobalOpts, RunArgs};
use crate::config;
use crate::error::CliError;
use crate::registry::LogRegistry;

/// Build the HTTP directory client from a resolved bridge config.
pub fn build_directory(cfg: &BridgeConfig) -> Result<DirectoryClient, CliError> {
    let transport = TransportConfig {
        timeout: cfg.timeout,
    };
    Ok(DirectoryClient::new(
        cfg.url.clone(),
        &cfg.api_key,
        &transport,
    )?)
}

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::resolve(global, Some(args))?;
    let directory = build_directory(&cfg)?;

    let bridge = Bridge::new(cfg, directory, LogRegistry).map_err(CliError::from)?;
    bridge.start().await?;
    info!("bridge running, press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    bridge.stop().await;
    Ok(())
}
