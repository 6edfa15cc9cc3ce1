//! brokerctl - Operate a message broker running in Kubernetes
//!
//! A command-line tool for bridging broker and dashboard ports to the local
//! machine, inspecting broker pods and managing configuration.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::Level;

use commands::Context;

#[derive(Parser)]
#[command(name = "brokerctl")]
#[command(author, version, about = "Operate a message broker running in Kubernetes")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Path to the kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubernetes context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Namespace of the broker
    #[arg(short = 'n', long, global = true)]
    namespace: Option<String>,

    /// Broker stateful set name
    #[arg(short = 'w', long, global = true)]
    workload: Option<String>,

    /// Use the configured ports as-is instead of bridging through the cluster
    #[arg(long, global = true)]
    direct: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Bridge the broker ports and hold the tunnel until interrupted
    Connect,

    /// Bridge the metrics dashboard and hold the tunnel until interrupted
    Dashboard {
        /// Dashboard stateful set name
        #[arg(long, default_value = "broker-dashboard")]
        name: String,
    },

    /// List broker pods and whether they can carry a tunnel
    #[command(alias = "ps")]
    Pods,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key, e.g. namespace, grpcPort or transport.startupTimeoutSecs
        key: String,
        value: String,
    },
    /// Print the configuration file path
    Path,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            interrupt.cancel();
        }
    });

    let ctx = Context::load(
        cli.json,
        commands::Overrides {
            kubeconfig: cli.kubeconfig,
            context: cli.context,
            namespace: cli.namespace,
            workload: cli.workload,
            direct: cli.direct,
        },
    )
    .await?;

    match cli.command {
        Commands::Connect => commands::connect::run(&ctx, &cancel).await?,
        Commands::Dashboard { name } => commands::dashboard::run(&ctx, &name, &cancel).await?,
        Commands::Pods => commands::pods::run(&ctx).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&ctx)?,
            ConfigAction::Set { key, value } => commands::config::set(&ctx, &key, &value).await?,
            ConfigAction::Path => commands::config::path(&ctx),
        },
    }

    Ok(())
}
