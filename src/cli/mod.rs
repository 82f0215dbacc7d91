//! CLI command implementations for qpep-dash.
//!
//! Provides subcommand handlers for:
//! - `qpep-dash watch`: live dashboard in the terminal
//! - `qpep-dash versions`: client/server versions reported by the daemon
//! - `qpep-dash hosts`: hosts connected to a server-mode daemon
//! - `qpep-dash config show|init|set|reset`: configuration management

use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::api::{self, UreqFetcher, client};
use crate::config::{self, DashConfig};
use crate::dashboard::{Collaborators, Dashboard, View};
use crate::logging::EventLog;
use crate::runtime::Scheduler;
use crate::state::{DEFAULT_API_PORT, Mode};
use crate::ui::{self, TerminalChart, TerminalLayout, TerminalTables, TerminalToast};

// ---------------------------------------------------------------------------
// qpep-dash watch
// ---------------------------------------------------------------------------

/// Options of `qpep-dash watch`.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub mode: Option<String>,
    pub port: Option<String>,
    pub view: Option<View>,
    /// Host to select right after launch (server mode).
    pub host: Option<String>,
}

impl WatchOptions {
    /// The navigation query the dashboard is launched with. Absent values
    /// are left out so startup validation reports them.
    pub fn query(&self) -> String {
        let mut parts = Vec::new();
        if let Some(mode) = &self.mode {
            parts.push(format!("mode={mode}"));
        }
        if let Some(port) = &self.port {
            parts.push(format!("port={port}"));
        }
        parts.join("&")
    }
}

/// Run the dashboard until interrupted. A forced reload rebuilds it from
/// scratch with the same query.
pub fn run_watch(options: WatchOptions) -> Result<()> {
    let cfg = config::load();
    let log = EventLog::from_config(&cfg.logging);
    let query = options.query();

    println!("{}", "QPep Status".bold().cyan());
    println!("{}", "=".repeat(40));

    loop {
        run_dashboard_once(&cfg, &options, &query, &log);
        println!();
        println!("{}", "Reloading dashboard...".yellow());
        log.info("cli", "dashboard reload");
    }
}

fn run_dashboard_once(cfg: &DashConfig, options: &WatchOptions, query: &str, log: &EventLog) {
    let scheduler = Scheduler::new();
    let toast = Rc::new(TerminalToast::new());
    let dashboard = Dashboard::new(
        cfg,
        Collaborators {
            scheduler: scheduler.clone(),
            fetcher: Rc::new(UreqFetcher::new(scheduler.clone(), cfg.api.timeout_ms)),
            chart: Rc::new(TerminalChart::new(cfg.telemetry.window)),
            toast_view: toast.clone(),
            tables: Rc::new(TerminalTables::new()),
            layout: Rc::new(TerminalLayout::new()),
            log: log.clone(),
        },
    );

    if dashboard.launch(query).is_ok() {
        if let Some(host) = &options.host {
            dashboard.actions().set_selected_host(host);
        }
        if let Some(view) = options.view {
            dashboard.select_view(view);
        }
    }

    scheduler.run_realtime(|| toast.reload_requested());
    dashboard.teardown();
}

// ---------------------------------------------------------------------------
// qpep-dash versions
// ---------------------------------------------------------------------------

/// Print the versions of both tunnel ends.
pub fn run_versions(mode: &str, port: u16) -> Result<()> {
    let Some(mode) = Mode::parse(mode) else {
        bail!("the only admitted values for mode are 'client' or 'server', got '{mode}'");
    };
    let cfg = config::load();
    let url = api::versions_url(&cfg.api.host, mode, port);
    let versions = client::fetch_versions(&url, Duration::from_millis(cfg.api.timeout_ms))
        .with_context(|| format!("failed to fetch {url}"))?;

    println!("{}", "QPep Versions".bold().cyan());
    println!("{}", "=".repeat(40));
    print_version_item("Client", versions.client_label());
    print_version_item("Server", versions.server_label());
    Ok(())
}

fn print_version_item(name: &str, version: &str) {
    let shown = if version == "N/A" {
        version.dimmed()
    } else {
        version.green()
    };
    println!("  {:<10} {}", name.bold(), shown);
}

// ---------------------------------------------------------------------------
// qpep-dash hosts
// ---------------------------------------------------------------------------

/// Print the host table of a server-mode daemon once.
pub fn run_hosts(port: u16) -> Result<()> {
    let cfg = config::load();
    let url = api::statistics_hosts_url(&cfg.api.host, port);
    let value = client::get_json(&url, Duration::from_millis(cfg.api.timeout_ms))
        .with_context(|| format!("failed to fetch {url}"))?;
    let rows = api::decode_rows(&value).context("unexpected host list payload")?;

    print!("{}", ui::format_table("hosts", &rows, None));
    Ok(())
}

// ---------------------------------------------------------------------------
// qpep-dash config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective qpep-dash Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.qpep-dash/config.toml", global_exists);
    print_source(".qpep-dash.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "QPEP_DASH_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.qpep-dash/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Edit the file to point the dashboard at your daemon.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Parse a `--port` value for the one-shot commands.
pub fn parse_port(raw: Option<&str>) -> Result<u16> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_API_PORT);
    };
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => bail!("the port parameter must be a positive integer below 65536, got '{raw}'"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
