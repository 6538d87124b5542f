//! Modal popup: button validation and the open/closed state machine.

use std::sync::Mutex;

use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;
use shared::{
    domain::PopupButtonKind,
    error::BridgeError,
    protocol::{PopupButton, PopupParams},
};
use tracing::debug;
use uuid::Uuid;

use crate::lock;

pub const MAX_BUTTON_ID_LEN: usize = 64;
pub const MAX_BUTTON_TEXT_LEN: usize = 64;
pub const MAX_TITLE_LEN: usize = 64;
pub const MAX_MESSAGE_LEN: usize = 256;
pub const MAX_BUTTONS: usize = 3;

/// Unvalidated button as supplied by the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PopupButtonSpec {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl PopupButtonSpec {
    pub fn new(kind: PopupButtonKind) -> Self {
        Self {
            id: None,
            kind: Some(kind.as_str().to_string()),
            text: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PopupSpec {
    #[serde(default)]
    pub title: Option<String>,
    pub message: String,
    #[serde(default)]
    pub buttons: Option<Vec<PopupButtonSpec>>,
}

impl PopupSpec {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            buttons: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<PopupButtonSpec>) -> Self {
        self.buttons = Some(buttons);
        self
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(Value::Bool(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(D::Error::custom(format!("invalid popup button id: {other}"))),
    }
}

/// Checks id, then type, then text; the text rule depends on the type.
pub fn validate_button(spec: &PopupButtonSpec) -> Result<PopupButton, BridgeError> {
    let id = spec.id.clone().unwrap_or_default();
    if id.chars().count() > MAX_BUTTON_ID_LEN {
        return Err(BridgeError::param_invalid(format!(
            "popup button id is longer than {MAX_BUTTON_ID_LEN} characters"
        )));
    }

    let kind = match spec.kind.as_deref() {
        None => PopupButtonKind::Default,
        Some(raw) => raw.parse::<PopupButtonKind>()?,
    };

    let text = if kind.requires_text() {
        let text = spec.text.as_deref().unwrap_or_default().trim();
        let len = text.chars().count();
        if len == 0 || len > MAX_BUTTON_TEXT_LEN {
            return Err(BridgeError::param_invalid(format!(
                "popup button text must be 1..={MAX_BUTTON_TEXT_LEN} characters for type {kind}"
            )));
        }
        Some(text.to_string())
    } else {
        None
    };

    Ok(PopupButton { id, kind, text })
}

pub fn validate_popup(spec: &PopupSpec) -> Result<PopupParams, BridgeError> {
    let title = spec
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty());
    if let Some(title) = title {
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(BridgeError::param_invalid(format!(
                "popup title is longer than {MAX_TITLE_LEN} characters"
            )));
        }
    }

    let message = spec.message.trim();
    let message_len = message.chars().count();
    if message_len == 0 || message_len > MAX_MESSAGE_LEN {
        return Err(BridgeError::param_invalid(format!(
            "popup message must be 1..={MAX_MESSAGE_LEN} characters"
        )));
    }

    let buttons = match &spec.buttons {
        None => vec![PopupButton {
            id: Uuid::new_v4().simple().to_string(),
            kind: PopupButtonKind::Close,
            text: None,
        }],
        Some(buttons) => {
            if buttons.is_empty() || buttons.len() > MAX_BUTTONS {
                return Err(BridgeError::param_invalid(format!(
                    "popup must have 1..={MAX_BUTTONS} buttons, got {}",
                    buttons.len()
                )));
            }
            buttons
                .iter()
                .map(validate_button)
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(PopupParams {
        title: title.map(str::to_string),
        message: message.to_string(),
        buttons,
    })
}

pub type PopupCallback = Box<dyn FnOnce(String) + Send>;

#[derive(Default)]
enum PopupState {
    #[default]
    Closed,
    Open {
        params: PopupParams,
        callback: Option<PopupCallback>,
    },
}

#[derive(Default)]
pub struct Popup {
    state: Mutex<PopupState>,
}

impl Popup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        matches!(*lock(&self.state), PopupState::Open { .. })
    }

    /// Returns `Ok(false)` without validating when a popup is already open.
    pub fn open(
        &self,
        spec: &PopupSpec,
        callback: Option<PopupCallback>,
    ) -> Result<bool, BridgeError> {
        let mut state = lock(&self.state);
        if matches!(*state, PopupState::Open { .. }) {
            debug!("popup already open; ignoring open request");
            return Ok(false);
        }

        let params = validate_popup(spec)?;
        *state = PopupState::Open { params, callback };
        Ok(true)
    }

    pub fn close(&self) {
        *lock(&self.state) = PopupState::Closed;
    }

    /// Closes the popup and, for a non-empty button id, runs the stored
    /// callback with it. Returns whether a popup was open.
    pub fn resolve(&self, button_id: Option<&str>) -> bool {
        let callback = match std::mem::take(&mut *lock(&self.state)) {
            PopupState::Closed => return false,
            PopupState::Open { callback, .. } => callback,
        };

        match (button_id.filter(|id| !id.is_empty()), callback) {
            (Some(id), Some(callback)) => callback(id.to_string()),
            (None, Some(_)) => debug!("popup closed without a button; skipping callback"),
            _ => {}
        }
        true
    }

    pub fn params(&self) -> Option<PopupParams> {
        match &*lock(&self.state) {
            PopupState::Open { params, .. } => Some(params.clone()),
            PopupState::Closed => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/popup_tests.rs"]
mod tests;
