/// Configuration schema and defaults for the dashboard.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[api]`, `[telemetry]`, `[table]`, `[toast]`, `[loader]` and `[logging]`.
///
/// Every field has a built-in default matching the stock daemon setup.
/// Users only need to set the values they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level dashboard configuration.
///
/// Maps directly to `~/.qpep-dash/config.toml` and `.qpep-dash.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub api: ApiConfig,
    pub telemetry: TelemetryConfig,
    pub table: TableConfig,
    pub toast: ToastConfig,
    pub loader: LoaderConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Where the daemon API lives and how long a request may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Host the daemon's API server listens on.
    pub host: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            timeout_ms: 3000,
        }
    }
}

// ---------------------------------------------------------------------------
// [telemetry]
// ---------------------------------------------------------------------------

/// Live throughput chart settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Period of the statistics poll (milliseconds).
    pub poll_interval_ms: u64,
    /// Number of samples kept in the sliding window and shown on the chart.
    pub window: usize,
    /// Timeout of the toast raised when polling starts failing.
    pub error_toast_timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1100,
            window: 60,
            error_toast_timeout_ms: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// [table]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Period of the table refresh (milliseconds).
    pub poll_interval_ms: u64,
    /// Timeout of the toast raised when a table refresh starts failing.
    pub error_toast_timeout_ms: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
            error_toast_timeout_ms: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// [toast]
// ---------------------------------------------------------------------------

/// Toast lifecycle durations (milliseconds).
///
/// `dwell_ms` and `reload_after_ms` only apply to persistent toasts
/// (timeout `0`) and are measured from the settle point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    pub settle_ms: u64,
    pub grace_ms: u64,
    pub dwell_ms: u64,
    pub reload_after_ms: u64,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            grace_ms: 1000,
            dwell_ms: 8000,
            reload_after_ms: 9000,
        }
    }
}

// ---------------------------------------------------------------------------
// [loader]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Delay between `hide_loader` and the loader actually disappearing.
    pub hide_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { hide_delay_ms: 2000 }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether the event log is written at all.
    pub enabled: bool,
    /// Path to the event log file. `~` is expanded to the home directory.
    pub path: String,
    /// Log level: `"debug"`, `"info"`, `"warn"`, `"error"`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.qpep-dash/dashboard-log.jsonl".to_string(),
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML
// ---------------------------------------------------------------------------

impl DashConfig {
    /// Annotated default config written by `qpep-dash config init`.
    pub fn default_toml() -> String {
        r#"# qpep-dash configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (QPEP_DASH_*)
#   2. Project config (.qpep-dash.toml in current directory)
#   3. User global config (~/.qpep-dash/config.toml)
#   4. Built-in defaults

[api]
host = "127.0.0.1"
timeout_ms = 3000

[telemetry]
poll_interval_ms = 1100
window = 60                  # samples shown on the chart
error_toast_timeout_ms = 1000

[table]
poll_interval_ms = 3000
error_toast_timeout_ms = 1000

[toast]
settle_ms = 1000
grace_ms = 1000
dwell_ms = 8000              # persistent toasts only
reload_after_ms = 9000       # persistent toasts only

[loader]
hide_delay_ms = 2000

[logging]
enabled = true
path = "~/.qpep-dash/dashboard-log.jsonl"
level = "info"               # debug | info | warn | error
"#
        .to_string()
    }
}
