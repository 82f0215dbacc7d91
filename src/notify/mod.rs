//! User-facing notifications.

pub mod toast;

pub use toast::{ToastDisplay, ToastNotifier, ToastPhase, ToastView};
