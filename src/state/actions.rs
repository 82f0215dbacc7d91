//! Action layer: validates external intents and turns them into dispatches.
//!
//! Every method either dispatches exactly once or returns
//! [`DashError::InvalidArgument`] without touching the store.

use super::reducers;
use super::store::{Dispatch, Payload, Store};
use super::{Mode, Snapshot, ToastKind};
use crate::error::DashError;

/// Validating front door to the [`Store`].
#[derive(Debug, Clone)]
pub struct Actions {
    store: Store,
}

impl Actions {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> std::rc::Rc<Snapshot> {
        self.store.state()
    }

    /// Record which mode and API port the daemon is bound to.
    pub fn set_host_mode_and_port(&self, mode: &str, port: i64) -> Result<Dispatch, DashError> {
        let mode = Mode::parse(mode).ok_or_else(|| {
            DashError::invalid(format!(
                "the only admitted values for mode are 'client' or 'server', got '{mode}'"
            ))
        })?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| {
                DashError::invalid(format!(
                    "the port parameter must be a positive integer below 65536, got {port}"
                ))
            })?;

        Ok(self.store.dispatch(
            reducers::SET_HOST_MODE_AND_PORT,
            Payload::HostModeAndPort { mode, port },
        ))
    }

    /// Select a host in server mode. An empty address is ignored.
    pub fn set_selected_host(&self, address: &str) -> Dispatch {
        let address = address.trim();
        if address.is_empty() {
            return Dispatch::Unchanged;
        }
        self.store.dispatch(
            reducers::SET_SELECTED_HOST,
            Payload::SelectedHost(address.to_string()),
        )
    }

    /// Request a toast. Negative timeouts are clamped to `0` (persistent).
    pub fn show_message(
        &self,
        text: impl Into<String>,
        kind: &str,
        timeout_ms: i64,
    ) -> Result<Dispatch, DashError> {
        let kind = ToastKind::parse(kind).ok_or_else(|| {
            DashError::invalid(format!(
                "the only admitted values for type are 'info' or 'error', got '{kind}'"
            ))
        })?;

        Ok(self.store.dispatch(
            reducers::SHOW_MESSAGE,
            Payload::Message {
                text: text.into(),
                kind,
                timeout_ms: timeout_ms.max(0) as u64,
            },
        ))
    }

    /// Report an error toast. Used by components that absorb failures; the
    /// kind is fixed, so this cannot fail validation.
    pub fn report_error(&self, text: impl Into<String>, timeout_ms: u64) -> Dispatch {
        self.store.dispatch(
            reducers::SHOW_MESSAGE,
            Payload::Message {
                text: text.into(),
                kind: ToastKind::Error,
                timeout_ms,
            },
        )
    }

    pub fn clear_message(&self) -> Dispatch {
        self.store.dispatch(reducers::CLEAR_MESSAGE, Payload::None)
    }

    pub fn show_loader(&self) -> Dispatch {
        self.store.dispatch(reducers::SHOW_LOADER, Payload::None)
    }

    pub fn hide_loader(&self) -> Dispatch {
        self.store.dispatch(reducers::HIDE_LOADER, Payload::None)
    }
}
