use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use qpep_dash::cli;
use qpep_dash::dashboard::View;

#[derive(Debug, Parser)]
#[command(name = "qpep-dash")]
#[command(about = "Status dashboard for the QPep high-latency network accelerator")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Watch live throughput, statistics tables and notifications
    Watch {
        /// Daemon mode: client or server
        #[arg(long)]
        mode: Option<String>,
        /// Daemon API port
        #[arg(long)]
        port: Option<String>,
        /// Initial view: graph or stats
        #[arg(long)]
        view: Option<String>,
        /// Host to select on start (server mode)
        #[arg(long)]
        host: Option<String>,
    },
    /// Show client and server versions
    Versions {
        /// Daemon mode: client or server
        #[arg(long, default_value = "client")]
        mode: String,
        /// Daemon API port (default: 444)
        #[arg(long)]
        port: Option<String>,
    },
    /// List hosts connected to a server-mode daemon
    Hosts {
        /// Daemon API port (default: 444)
        #[arg(long)]
        port: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file to ~/.qpep-dash/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a value, e.g. `telemetry.window 120`
    Set { key: String, value: String },
    /// Reset the global config file to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Watch {
            mode,
            port,
            view,
            host,
        } => {
            let view = match view.as_deref() {
                None => None,
                Some(raw) => match View::parse(raw) {
                    Some(view) => Some(view),
                    None => bail!("unknown view '{raw}', expected 'graph' or 'stats'"),
                },
            };
            cli::run_watch(cli::WatchOptions {
                mode,
                port,
                view,
                host,
            })
        }
        Commands::Versions { mode, port } => {
            let port = cli::parse_port(port.as_deref())?;
            cli::run_versions(&mode, port)
        }
        Commands::Hosts { port } => {
            let port = cli::parse_port(port.as_deref())?;
            cli::run_hosts(port)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
