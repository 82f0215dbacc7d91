/// Configuration system for qpep-dash.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::DashConfig::default()`]
/// 2. **User global config**: `~/.qpep-dash/config.toml`
/// 3. **Project local config**: `.qpep-dash.toml` in the current directory
/// 4. **Environment variables**: `QPEP_DASH_*` overrides (highest precedence)
///
/// Later layers override earlier ones. Missing sections in a TOML file fall
/// back to the built-in defaults.
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::DashConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars, then clamps values that would break the dashboard (zero-length
/// window, zero poll period).
pub fn load() -> DashConfig {
    let mut config = DashConfig::default();

    if let Some(global) = load_toml_file(global_config_path()) {
        merge_config(&mut config, &global);
    }

    if let Some(project) = load_toml_file(project_config_path()) {
        merge_config(&mut config, &project);
    }

    apply_env_overrides(&mut config);
    sanitize(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Malformed files are ignored so a bad edit never keeps the dashboard from
/// starting.
fn load_toml_file(path: Option<PathBuf>) -> Option<DashConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge a loaded config layer into the base config.
///
/// Each file is deserialized with `serde(default)`, so unset keys already
/// hold the defaults and the overlay can replace the base wholesale.
fn merge_config(base: &mut DashConfig, overlay: &DashConfig) {
    *base = overlay.clone();
}

fn sanitize(config: &mut DashConfig) {
    config.telemetry.window = config.telemetry.window.max(1);
    config.telemetry.poll_interval_ms = config.telemetry.poll_interval_ms.max(1);
    config.table.poll_interval_ms = config.table.poll_interval_ms.max(1);
    if config.toast.reload_after_ms < config.toast.dwell_ms {
        config.toast.reload_after_ms = config.toast.dwell_ms;
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.qpep-dash/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".qpep-dash").join("config.toml"))
}

/// Path to the project local config: `.qpep-dash.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".qpep-dash.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `QPEP_DASH_API_HOST`: daemon API host
/// - `QPEP_DASH_API_TIMEOUT_MS`: per-request timeout
/// - `QPEP_DASH_WINDOW`: chart sliding window size
/// - `QPEP_DASH_POLL_INTERVAL_MS`: telemetry poll period
/// - `QPEP_DASH_LOGGING`: event log on/off (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut DashConfig) {
    if let Ok(val) = std::env::var("QPEP_DASH_API_HOST")
        && !val.is_empty()
    {
        config.api.host = val;
    }
    if let Ok(val) = std::env::var("QPEP_DASH_API_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("QPEP_DASH_WINDOW")
        && let Ok(window) = val.parse::<usize>()
    {
        config.telemetry.window = window;
    }
    if let Ok(val) = std::env::var("QPEP_DASH_POLL_INTERVAL_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.telemetry.poll_interval_ms = ms;
    }
    if let Ok(val) = std::env::var("QPEP_DASH_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.qpep-dash/config.toml`.
///
/// Returns an error if the file already exists and `force` is not set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.qpep-dash/ directory")?;
    }

    fs::write(&path, DashConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single dotted key (e.g. `telemetry.window`) in the global config file.
///
/// Starts from the existing file, or from the serialized defaults when no
/// file exists yet.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&DashConfig::default())
            .context("failed to serialize default config")?
    };

    let mut value_table: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut value_table, key, value)?;

    // Reject edits that no longer deserialize into the schema.
    let output =
        toml::to_string_pretty(&value_table).context("failed to serialize updated config")?;
    toml::from_str::<DashConfig>(&output)
        .with_context(|| format!("'{key} = {value}' does not fit the config schema"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// The new value takes the type of the value it replaces.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("invalid config key: '{key}'");
    }

    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];
    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::String(_)) => toml::Value::String(raw_value.to_string()),
        Some(_) => anyhow::bail!("'{key}' cannot be set from the command line"),
        None => anyhow::bail!("config key not found: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
