//! Startup: turn the navigation query into the initial mode and port.
//!
//! `mode=server&port=1443` (optionally prefixed by a URL and `?`) is
//! form-decoded and parsed leniently: a missing mode stays empty and a port
//! that is not an integer reads as `0`. Validation is left to the action layer, so a bad query
//! fails there and ends in a persistent error toast.

use crate::error::DashError;
use crate::logging::EventLog;
use crate::state::Actions;

const COMPONENT: &str = "startup";

/// Raw `mode` and `port` pulled from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchQuery {
    pub mode: String,
    pub port: i64,
}

impl LaunchQuery {
    pub fn new(mode: impl Into<String>, port: i64) -> Self {
        Self {
            mode: mode.into(),
            port,
        }
    }

    /// Rebuild the query string, e.g. for logging.
    pub fn to_query_string(&self) -> String {
        format!("mode={}&port={}", self.mode, self.port)
    }
}

/// Parse `mode` and `port` out of a full URL or a bare query string.
pub fn parse_query(input: &str) -> LaunchQuery {
    let query = match input.split_once('?') {
        Some((_, query)) => query,
        None => input,
    };
    let query = query.split('#').next().unwrap_or_default();

    let mut parsed = LaunchQuery::default();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let (key, value) = (decode_component(key), decode_component(value));
        match key.as_str() {
            "mode" => parsed.mode = value.trim().to_string(),
            "port" => parsed.port = value.trim().parse().unwrap_or(0),
            _ => {}
        }
    }
    parsed
}

/// Form-decode one query component: `+` is a space and `%XX` a byte.
/// Malformed escapes are kept verbatim.
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let escaped = bytes
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = escaped {
                    out.push(byte);
                    i += 2;
                } else {
                    out.push(b'%');
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Run the startup sequence against the store.
///
/// Shows the loader, applies mode and port, hides the loader. On failure
/// the error is logged and raised as a persistent error toast, which ends in
/// a dashboard reload.
pub fn launch(actions: &Actions, query: &str, log: &EventLog) -> Result<LaunchQuery, DashError> {
    actions.show_loader();

    let parsed = parse_query(query);
    log.info(COMPONENT, format!("launching with {}", parsed.to_query_string()));

    match actions.set_host_mode_and_port(&parsed.mode, parsed.port) {
        Ok(_) => {
            actions.hide_loader();
            Ok(parsed)
        }
        Err(err) => {
            let message = err.to_string();
            log.error(COMPONENT, format!("startup failed: {message}"));
            actions.report_error(message.clone(), 0);
            Err(DashError::UnrecoverableStartup(message))
        }
    }
}
