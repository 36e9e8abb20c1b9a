use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "sgdns",
    about = "Reconciles DNS record sets against scaling-group membership",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP event endpoint.
    Serve {
        /// Bind address.
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Listen port.
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Bearer token required on every request. Generated when absent.
        #[arg(long, env = "SGDNS_TOKEN")]
        token: Option<String>,

        /// Seed the in-memory repository with this configuration item list
        /// (JSON or base64). Required when db_provider=memory.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Zone name mapping for the mock provider, `<zone_id>=<zone_name>`;
        /// repeatable.
        #[arg(long)]
        zone: Vec<String>,
    },

    /// Trigger a reconciliation sweep on a running sgdns server.
    Reconcile {
        /// Server base URL.
        #[arg(long, env = "SGDNS_URL", default_value = "http://127.0.0.1:8080")]
        remote: String,

        /// Bearer token for the server.
        #[arg(long, env = "SGDNS_TOKEN")]
        token: Option<String>,

        /// Restrict the sweep to one scaling group.
        #[arg(long)]
        scaling_group: Option<String>,
    },

    /// Decode and validate a configuration payload without touching anything.
    ValidateConfig {
        /// Path to a base64-encoded (or plain JSON) configuration item list.
        file: PathBuf,
    },

    /// Run one lifecycle event against in-memory adapters and print the plan.
    Simulate {
        /// Configuration item list (JSON or base64).
        #[arg(long)]
        config: PathBuf,

        /// Instance fixtures (JSON list).
        #[arg(long)]
        instances: PathBuf,

        /// Zone name mapping, `<zone_id>=<zone_name>`; repeatable.
        #[arg(long)]
        zone: Vec<String>,

        #[arg(long, value_enum)]
        transition: TransitionArg,

        #[arg(long)]
        scaling_group: String,

        /// Required for launching and draining transitions.
        #[arg(long, default_value = "")]
        instance_id: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TransitionArg {
    Launching,
    Draining,
    Reconciling,
}
