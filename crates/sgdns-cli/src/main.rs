mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, port, token, config, zone } => {
            commands::serve(bind, port, token, config, zone).await
        }
        Command::Reconcile { remote, token, scaling_group } => {
            commands::reconcile(remote, token, scaling_group).await
        }
        Command::ValidateConfig { file } => commands::validate_config(file),
        Command::Simulate {
            config,
            instances,
            zone,
            transition,
            scaling_group,
            instance_id,
        } => {
            commands::simulate(config, instances, zone, transition, scaling_group, instance_id)
                .await
        }
    }
}
