//! Pure reducers: `(current snapshot, payload) -> next snapshot`.
//!
//! A reducer handed a payload it does not understand returns the current
//! snapshot unchanged, which the store treats as "nothing happened".

use super::store::{Payload, Store};
use super::Snapshot;

pub const SET_HOST_MODE_AND_PORT: &str = "setHostModeAndPort";
pub const SET_SELECTED_HOST: &str = "setSelectedHost";
pub const SHOW_MESSAGE: &str = "showMessage";
pub const CLEAR_MESSAGE: &str = "clearMessage";
pub const SHOW_LOADER: &str = "showLoader";
pub const HIDE_LOADER: &str = "hideLoader";

/// Register every reducer under its well-known name.
pub fn register_all(store: &Store) {
    store.register(SET_HOST_MODE_AND_PORT, set_host_mode_and_port);
    store.register(SET_SELECTED_HOST, set_selected_host);
    store.register(SHOW_MESSAGE, show_message);
    store.register(CLEAR_MESSAGE, clear_message);
    store.register(SHOW_LOADER, show_loader);
    store.register(HIDE_LOADER, hide_loader);
}

pub fn set_host_mode_and_port(state: &Snapshot, payload: &Payload) -> Snapshot {
    match payload {
        Payload::HostModeAndPort { mode, port } => Snapshot {
            mode: *mode,
            port: *port,
            ..state.clone()
        },
        _ => state.clone(),
    }
}

pub fn set_selected_host(state: &Snapshot, payload: &Payload) -> Snapshot {
    match payload {
        Payload::SelectedHost(address) => Snapshot {
            selected_host: Some(address.clone()),
            ..state.clone()
        },
        _ => state.clone(),
    }
}

pub fn show_message(state: &Snapshot, payload: &Payload) -> Snapshot {
    match payload {
        Payload::Message {
            text,
            kind,
            timeout_ms,
        } => Snapshot {
            toast_message: Some(text.clone()),
            toast_type: *kind,
            toast_timeout_ms: *timeout_ms,
            ..state.clone()
        },
        _ => state.clone(),
    }
}

pub fn clear_message(state: &Snapshot, _payload: &Payload) -> Snapshot {
    Snapshot {
        toast_message: None,
        toast_type: Default::default(),
        toast_timeout_ms: 0,
        ..state.clone()
    }
}

pub fn show_loader(state: &Snapshot, _payload: &Payload) -> Snapshot {
    Snapshot {
        show_loader: true,
        ..state.clone()
    }
}

pub fn hide_loader(state: &Snapshot, _payload: &Payload) -> Snapshot {
    Snapshot {
        show_loader: false,
        ..state.clone()
    }
}
