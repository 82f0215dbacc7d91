//! Error taxonomy for the dashboard core.
//!
//! - [`DashError::InvalidArgument`]: a malformed intent rejected by the
//!   action layer before anything is dispatched.
//! - [`DashError::FetchFailure`]: a polling request that failed; absorbed
//!   by the poller or table source and turned into a single toast.
//! - [`DashError::UnrecoverableStartup`]: missing or invalid launch
//!   parameters; surfaces as a persistent toast that forces a reload.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    FetchFailure(#[from] FetchError),
    #[error("{0}")]
    UnrecoverableStartup(String),
}

impl DashError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// Failure of a single HTTP fetch against the daemon API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP Error Status: {0}")]
    Status(u16),
    #[error("invalid payload: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
