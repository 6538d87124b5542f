use std::sync::Mutex;

use serde::Deserialize;
use shared::error::BridgeError;
use tracing::debug;

use crate::lock;

pub const MAX_QR_TEXT_LEN: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QrPopupSpec {
    #[serde(default)]
    pub text: Option<String>,
}

impl QrPopupSpec {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Returns true to consume the scan and close the popup.
pub type QrScanCallback = Box<dyn FnMut(Option<&str>) -> bool + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No popup was open.
    Ignored,
    StillOpen,
    /// The callback consumed the scan; the host should dismiss the popup.
    Closed,
}

#[derive(Default)]
enum QrState {
    #[default]
    Closed,
    Open {
        session: u64,
        text: Option<String>,
        callback: Option<QrScanCallback>,
    },
}

#[derive(Default)]
pub struct QrPopup {
    state: Mutex<QrState>,
    sessions: Mutex<u64>,
}

impl QrPopup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        matches!(*lock(&self.state), QrState::Open { .. })
    }

    pub fn text(&self) -> Option<String> {
        match &*lock(&self.state) {
            QrState::Open { text, .. } => text.clone(),
            QrState::Closed => None,
        }
    }

    /// Returns `Ok(false)` when already open. The trimmed hint text is
    /// dropped when empty.
    pub fn open(
        &self,
        spec: &QrPopupSpec,
        callback: Option<QrScanCallback>,
    ) -> Result<bool, BridgeError> {
        let mut state = lock(&self.state);
        if matches!(*state, QrState::Open { .. }) {
            debug!("scan QR popup already open; ignoring open request");
            return Ok(false);
        }

        let text = spec
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());
        if let Some(text) = text {
            if text.chars().count() > MAX_QR_TEXT_LEN {
                return Err(BridgeError::param_invalid(format!(
                    "scan QR popup text is longer than {MAX_QR_TEXT_LEN} characters"
                )));
            }
        }

        let session = {
            let mut sessions = lock(&self.sessions);
            *sessions += 1;
            *sessions
        };
        *state = QrState::Open {
            session,
            text: text.map(str::to_string),
            callback,
        };
        Ok(true)
    }

    /// Unconditional close, used for host dismissal and application close.
    pub fn close(&self) -> bool {
        let was_open = self.is_open();
        *lock(&self.state) = QrState::Closed;
        was_open
    }

    pub fn receive(&self, data: Option<&str>) -> ScanOutcome {
        let (session, callback) = match &mut *lock(&self.state) {
            QrState::Closed => return ScanOutcome::Ignored,
            QrState::Open {
                session, callback, ..
            } => (*session, callback.take()),
        };

        let Some(mut callback) = callback else {
            return ScanOutcome::StillOpen;
        };
        let consume = callback(data);

        let mut state = lock(&self.state);
        match &mut *state {
            QrState::Open {
                session: current,
                callback: slot,
                ..
            } if *current == session => {
                if consume {
                    *state = QrState::Closed;
                    ScanOutcome::Closed
                } else {
                    *slot = Some(callback);
                    ScanOutcome::StillOpen
                }
            }
            // Closed or reopened by the callback itself.
            _ => ScanOutcome::Ignored,
        }
    }
}

#[cfg(test)]
#[path = "tests/qr_popup_tests.rs"]
mod tests;
