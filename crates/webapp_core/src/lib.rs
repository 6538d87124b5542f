use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod bridge;
pub mod button;
pub mod color;
pub mod events;
pub mod haptic;
pub mod init_data;
pub mod links;
pub mod pending;
pub mod popup;
pub mod qr_popup;
pub mod theme;
pub mod version;
pub mod viewport;
mod webapp;

pub use bridge::{EventBridge, RecordingTransport, Transport};
pub use button::{ButtonController, ButtonEvent, ButtonEventKind, ButtonKind, ButtonParams, ButtonState};
pub use events::{Event, HandlerId, Publisher};
pub use init_data::{InitData, LaunchParams, WebAppChat, WebAppUser};
pub use popup::{PopupButtonSpec, PopupSpec};
pub use qr_popup::QrPopupSpec;
pub use version::{SemanticVersion, VersionGate};
pub use viewport::{ViewportState, WindowMetrics};
pub use webapp::{
    AlertCallback, AppEvent, AppEventKind, ClipboardCallback, ConfirmCallback, InvoiceCallback,
    WebApp, MAX_INLINE_QUERY_LEN, MAX_SEND_DATA_BYTES,
};

/// Locks `mutex`, recovering the data if a handler panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
