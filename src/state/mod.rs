//! Shared application state: the immutable [`Snapshot`], the [`Store`]
//! that replaces it, the pure reducers, and the validating action layer.

pub mod actions;
pub mod reducers;
pub mod store;

use serde::{Deserialize, Serialize};

pub use actions::Actions;
pub use store::{Dispatch, Payload, Reducer, Store, Subscription};

/// Default API port of the daemon, used until startup reports the real one.
pub const DEFAULT_API_PORT: u16 = 444;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Which side of the tunnel the daemon runs as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Client,
    Server,
}

impl Mode {
    /// Case-insensitive parse of `client` / `server`.
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "client" => Some(Self::Client),
            "server" => Some(Self::Server),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a toast notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    #[default]
    Info,
    Error,
}

impl ToastKind {
    /// Case-insensitive parse of `info` / `error`.
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ToastKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The whole application state. Never edited in place: reducers build a new
/// value and the store swaps it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub port: u16,
    /// Host picked in the server-mode hosts table.
    pub selected_host: Option<String>,
    pub show_loader: bool,
    pub toast_message: Option<String>,
    pub toast_type: ToastKind,
    /// `0` marks a persistent toast that ends in a reload.
    pub toast_timeout_ms: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            port: DEFAULT_API_PORT,
            selected_host: None,
            show_loader: true,
            toast_message: None,
            toast_type: ToastKind::Info,
            toast_timeout_ms: 0,
        }
    }
}

impl Snapshot {
    /// Selected host, only meaningful in server mode.
    pub fn effective_host(&self) -> Option<&str> {
        match self.mode {
            Mode::Server => self.selected_host.as_deref().filter(|h| !h.is_empty()),
            Mode::Client => None,
        }
    }

    /// Whether the fields the toast notifier watches differ between two
    /// snapshots and `self` carries a message.
    pub fn has_new_toast(&self, previous: &Snapshot) -> bool {
        self.toast_message.is_some()
            && (self.toast_message != previous.toast_message
                || self.toast_type != previous.toast_type
                || self.toast_timeout_ms != previous.toast_timeout_ms)
    }

    /// One-line summary for the state-change log.
    pub fn summary(&self) -> String {
        format!(
            "mode={} port={} host={} loader={} toast={}",
            self.mode,
            self.port,
            self.selected_host.as_deref().unwrap_or("-"),
            self.show_loader,
            self.toast_message
                .as_deref()
                .map(|m| format!("{}:{}({}ms)", self.toast_type, m, self.toast_timeout_ms))
                .unwrap_or_else(|| "-".to_string()),
        )
    }
}
