use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{
    HapticImpactStyle, HapticNotificationType, HeaderColorKey, InlineChatType, PopupButtonKind,
};

/// Wire envelope shared by both directions of the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "eventData", default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupButton {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PopupButtonKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    pub buttons: Vec<PopupButton>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MainButtonSetup {
    pub is_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_progress_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_shine_effect: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderColorSetup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_key: Option<HeaderColorKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HapticFeedbackPayload {
    Impact {
        impact_style: HapticImpactStyle,
    },
    Notification {
        notification_type: HapticNotificationType,
    },
    SelectionChange,
}

/// Host-bound methods. Serializes to the `{eventType, eventData}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "eventType", content = "eventData", rename_all = "snake_case")]
pub enum HostMethod {
    WebAppDataSend {
        data: String,
    },
    WebAppOpenLink {
        url: String,
        try_instant_view: bool,
    },
    WebAppOpenTgLink {
        path_full: String,
    },
    WebAppOpenInvoice {
        slug: String,
    },
    WebAppReadTextFromClipboard {
        req_id: String,
    },
    WebAppSetupMainButton(MainButtonSetup),
    WebAppSetupBackButton {
        is_visible: bool,
    },
    WebAppSetupSettingsButton {
        is_visible: bool,
    },
    WebAppSetBackgroundColor {
        color: String,
    },
    WebAppSetHeaderColor(HeaderColorSetup),
    WebAppSetupClosingBehavior {
        need_confirmation: bool,
    },
    WebAppOpenPopup(PopupParams),
    WebAppSwitchInlineQuery {
        query: String,
        chat_types: Vec<InlineChatType>,
    },
    WebAppOpenScanQrPopup {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    WebAppCloseScanQrPopup,
    WebAppTriggerHapticFeedback(HapticFeedbackPayload),
    WebAppReady,
    WebAppExpand,
    WebAppClose,
    WebAppRequestTheme,
    WebAppRequestViewport,
}

impl HostMethod {
    pub fn to_envelope(&self) -> serde_json::Result<Envelope> {
        serde_json::from_value(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown host event '{0}'")]
    UnknownEvent(String),
    #[error("malformed payload for {event}: {source}")]
    MalformedPayload {
        event: HostEventName,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventName {
    ThemeChanged,
    ViewportChanged,
    InvoiceClosed,
    PopupClosed,
    QrTextReceived,
    ScanQrPopupClosed,
    ClipboardTextReceived,
    MainButtonPressed,
    BackButtonPressed,
    SettingsButtonPressed,
}

impl HostEventName {
    pub fn as_str(self) -> &'static str {
        match self {
            HostEventName::ThemeChanged => "theme_changed",
            HostEventName::ViewportChanged => "viewport_changed",
            HostEventName::InvoiceClosed => "invoice_closed",
            HostEventName::PopupClosed => "popup_closed",
            HostEventName::QrTextReceived => "qr_text_received",
            HostEventName::ScanQrPopupClosed => "scan_qr_popup_closed",
            HostEventName::ClipboardTextReceived => "clipboard_text_received",
            HostEventName::MainButtonPressed => "main_button_pressed",
            HostEventName::BackButtonPressed => "back_button_pressed",
            HostEventName::SettingsButtonPressed => "settings_button_pressed",
        }
    }
}

impl FromStr for HostEventName {
    type Err = DecodeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = match raw {
            "theme_changed" => HostEventName::ThemeChanged,
            "viewport_changed" => HostEventName::ViewportChanged,
            "invoice_closed" => HostEventName::InvoiceClosed,
            "popup_closed" => HostEventName::PopupClosed,
            "qr_text_received" => HostEventName::QrTextReceived,
            "scan_qr_popup_closed" => HostEventName::ScanQrPopupClosed,
            "clipboard_text_received" => HostEventName::ClipboardTextReceived,
            "main_button_pressed" => HostEventName::MainButtonPressed,
            "back_button_pressed" => HostEventName::BackButtonPressed,
            "settings_button_pressed" => HostEventName::SettingsButtonPressed,
            other => return Err(DecodeError::UnknownEvent(other.to_string())),
        };
        Ok(name)
    }
}

impl fmt::Display for HostEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ThemeChanged {
    #[serde(default, deserialize_with = "string_entries")]
    pub theme_params: BTreeMap<String, String>,
}

/// Keeps the string-valued entries of a JSON object; other values are
/// skipped so one bad entry does not reject the whole map.
fn string_entries<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key, text)),
            _ => None,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ViewportChanged {
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub is_state_stable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvoiceClosed {
    pub slug: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PopupClosed {
    #[serde(default)]
    pub button_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct QrTextReceived {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClipboardTextReceived {
    pub req_id: String,
    #[serde(default)]
    pub data: Option<String>,
}

/// Host-origin events, decoded from `(name, payload)` at the dispatch boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    ThemeChanged(ThemeChanged),
    ViewportChanged(ViewportChanged),
    InvoiceClosed(InvoiceClosed),
    PopupClosed(PopupClosed),
    QrTextReceived(QrTextReceived),
    ScanQrPopupClosed,
    ClipboardTextReceived(ClipboardTextReceived),
    MainButtonPressed,
    BackButtonPressed,
    SettingsButtonPressed,
}

impl HostEvent {
    pub fn name(&self) -> HostEventName {
        match self {
            HostEvent::ThemeChanged(_) => HostEventName::ThemeChanged,
            HostEvent::ViewportChanged(_) => HostEventName::ViewportChanged,
            HostEvent::InvoiceClosed(_) => HostEventName::InvoiceClosed,
            HostEvent::PopupClosed(_) => HostEventName::PopupClosed,
            HostEvent::QrTextReceived(_) => HostEventName::QrTextReceived,
            HostEvent::ScanQrPopupClosed => HostEventName::ScanQrPopupClosed,
            HostEvent::ClipboardTextReceived(_) => HostEventName::ClipboardTextReceived,
            HostEvent::MainButtonPressed => HostEventName::MainButtonPressed,
            HostEvent::BackButtonPressed => HostEventName::BackButtonPressed,
            HostEvent::SettingsButtonPressed => HostEventName::SettingsButtonPressed,
        }
    }

    pub fn decode(name: &str, payload: Value) -> Result<Self, DecodeError> {
        let name = name.parse::<HostEventName>()?;
        let event = match name {
            HostEventName::ThemeChanged => HostEvent::ThemeChanged(decode_payload(name, payload)?),
            HostEventName::ViewportChanged => {
                HostEvent::ViewportChanged(decode_payload(name, payload)?)
            }
            HostEventName::InvoiceClosed => {
                HostEvent::InvoiceClosed(decode_payload(name, payload)?)
            }
            HostEventName::PopupClosed => HostEvent::PopupClosed(decode_payload(name, payload)?),
            HostEventName::QrTextReceived => {
                HostEvent::QrTextReceived(decode_payload(name, payload)?)
            }
            HostEventName::ScanQrPopupClosed => HostEvent::ScanQrPopupClosed,
            HostEventName::ClipboardTextReceived => {
                HostEvent::ClipboardTextReceived(decode_payload(name, payload)?)
            }
            HostEventName::MainButtonPressed => HostEvent::MainButtonPressed,
            HostEventName::BackButtonPressed => HostEvent::BackButtonPressed,
            HostEventName::SettingsButtonPressed => HostEvent::SettingsButtonPressed,
        };
        Ok(event)
    }

    pub fn from_envelope(raw: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope =
            serde_json::from_str(raw).map_err(DecodeError::MalformedEnvelope)?;
        Self::decode(
            &envelope.event_type,
            envelope.event_data.unwrap_or(Value::Null),
        )
    }
}

fn decode_payload<T: DeserializeOwned>(event: HostEventName, payload: Value) -> Result<T, DecodeError> {
    let payload = match payload {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(payload).map_err(|source| DecodeError::MalformedPayload { event, source })
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
