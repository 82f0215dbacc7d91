//! Daemon API: endpoint URLs and JSON payload shapes.
//!
//! All endpoints live under `http://<host>:<port>/api/v1/<mode>/`:
//!
//! | Path | Payload |
//! |------|---------|
//! | `statistics/data[/<addr>]` | `{ data: [{id, attribute, value}] }` |
//! | `statistics/info[/<addr>]` | same shape |
//! | `statistics/hosts` (server) | row array or `{ data: [...] }` |
//! | `versions` | `{ client, server }` |

pub mod client;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FetchError;
use crate::state::Mode;

pub use client::{FetchCallback, FetchResult, Fetcher, UreqFetcher};

const API_PREFIX: &str = "/api/v1";

// ---------------------------------------------------------------------------
// Endpoint URLs
// ---------------------------------------------------------------------------

/// `http://<host>:<port>/api/v1/<mode>`
fn base_url(host: &str, mode: Mode, port: u16) -> String {
    format!("http://{host}:{port}{API_PREFIX}/{mode}")
}

fn with_address(mut url: String, address: Option<&str>) -> String {
    if let Some(addr) = address.map(str::trim).filter(|a| !a.is_empty()) {
        url.push('/');
        url.push_str(addr);
    }
    url
}

/// Live statistics used by the throughput chart and the data table.
pub fn statistics_data_url(host: &str, mode: Mode, port: u16, address: Option<&str>) -> String {
    with_address(
        format!("{}/statistics/data", base_url(host, mode, port)),
        address,
    )
}

/// Static per-host information (addresses, counters).
pub fn statistics_info_url(host: &str, mode: Mode, port: u16, address: Option<&str>) -> String {
    with_address(
        format!("{}/statistics/info", base_url(host, mode, port)),
        address,
    )
}

/// Hosts connected to a server-mode daemon.
pub fn statistics_hosts_url(host: &str, port: u16) -> String {
    format!("{}/statistics/hosts", base_url(host, Mode::Server, port))
}

pub fn versions_url(host: &str, mode: Mode, port: u16) -> String {
    format!("{}/versions", base_url(host, mode, port))
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// One `{id, attribute, value}` row as served by the statistics endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRow {
    #[serde(default)]
    pub id: i64,
    pub attribute: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: String,
}

impl StatsRow {
    pub fn new(id: i64, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id,
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// `{ data: [...] }` wrapper of the statistics endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub data: Vec<StatsRow>,
}

/// Versions of both tunnel ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub server: String,
}

impl Versions {
    /// Server version for display; an empty value means "not connected".
    pub fn server_label(&self) -> &str {
        if self.server.trim().is_empty() {
            "N/A"
        } else {
            &self.server
        }
    }

    pub fn client_label(&self) -> &str {
        if self.client.trim().is_empty() {
            "N/A"
        } else {
            &self.client
        }
    }
}

/// Accept a JSON string or number (or null) as text.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode the rows of a statistics payload.
///
/// Accepts both the `{ data: [...] }` wrapper and a bare row array.
pub fn decode_rows(value: &serde_json::Value) -> Result<Vec<StatsRow>, FetchError> {
    match value {
        serde_json::Value::Array(_) => Ok(Vec::<StatsRow>::deserialize(value)?),
        serde_json::Value::Object(_) => Ok(StatsResponse::deserialize(value)?.data),
        other => Err(FetchError::Decode(format!(
            "expected an object or array, got {}",
            json_kind(other)
        ))),
    }
}

pub fn decode_versions(value: &serde_json::Value) -> Result<Versions, FetchError> {
    Ok(Versions::deserialize(value)?)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_url_appends_address_only_when_present() {
        assert_eq!(
            statistics_data_url("127.0.0.1", Mode::Server, 1443, None),
            "http://127.0.0.1:1443/api/v1/server/statistics/data"
        );
        assert_eq!(
            statistics_data_url("127.0.0.1", Mode::Server, 1443, Some("10.0.0.7")),
            "http://127.0.0.1:1443/api/v1/server/statistics/data/10.0.0.7"
        );
        assert_eq!(
            statistics_data_url("127.0.0.1", Mode::Client, 444, Some("")),
            "http://127.0.0.1:444/api/v1/client/statistics/data"
        );
    }

    #[test]
    fn other_endpoint_urls() {
        assert_eq!(
            statistics_hosts_url("127.0.0.1", 444),
            "http://127.0.0.1:444/api/v1/server/statistics/hosts"
        );
        assert_eq!(
            versions_url("localhost", Mode::Client, 444),
            "http://localhost:444/api/v1/client/versions"
        );
        assert_eq!(
            statistics_info_url("127.0.0.1", Mode::Server, 444, Some("1.2.3.4")),
            "http://127.0.0.1:444/api/v1/server/statistics/info/1.2.3.4"
        );
    }

    #[test]
    fn rows_accept_string_and_number_values() {
        let payload = json!({
            "data": [
                {"id": 1, "attribute": "Current Upload Speed", "value": "120"},
                {"id": 2, "attribute": "Current Download Speed", "value": 80},
                {"attribute": "Address", "value": null}
            ]
        });
        let rows = decode_rows(&payload).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].value, "120");
        assert_eq!(rows[1].value, "80");
        assert_eq!(rows[2].id, 0);
        assert_eq!(rows[2].value, "");
    }

    #[test]
    fn rows_accept_bare_array() {
        let payload = json!([{"id": 3, "attribute": "Address", "value": "192.168.1.4"}]);
        let rows = decode_rows(&payload).unwrap();
        assert_eq!(rows, vec![StatsRow::new(3, "Address", "192.168.1.4")]);
    }

    #[test]
    fn rows_reject_scalars_and_bad_shapes() {
        assert!(decode_rows(&json!("nope")).is_err());
        assert!(decode_rows(&json!({"data": [{"value": 1}]})).is_err());
    }

    #[test]
    fn missing_data_field_is_empty() {
        assert!(decode_rows(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn empty_server_version_renders_na() {
        let versions = decode_versions(&json!({"client": "0.1.2", "server": ""})).unwrap();
        assert_eq!(versions.server_label(), "N/A");
        assert_eq!(versions.client_label(), "0.1.2");
    }
}
