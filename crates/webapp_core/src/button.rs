//! Observable button state shared by the main, back and settings buttons.
//!
//! Updates are merged into the current state and compared with the last
//! state announced to the host; `Updated` fires only when they differ.

use std::sync::Mutex;

use serde::Deserialize;
use shared::{
    error::BridgeError,
    protocol::{HostMethod, MainButtonSetup},
};
use tracing::debug;

use crate::{
    color::normalize_hex_color,
    events::{Event, HandlerId, Publisher},
    lock,
};

pub const MAX_BUTTON_TEXT_LEN: usize = 64;
pub const DEFAULT_MAIN_BUTTON_TEXT: &str = "Continue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Main,
    Back,
    Settings,
}

impl ButtonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ButtonKind::Main => "main_button",
            ButtonKind::Back => "back_button",
            ButtonKind::Settings => "settings_button",
        }
    }

    fn announces_creation(self) -> bool {
        self == ButtonKind::Back
    }

    fn clicks_require_active(self) -> bool {
        self == ButtonKind::Main
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub text: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub is_visible: bool,
    pub is_active: bool,
    pub is_progress_visible: bool,
    pub has_shine_effect: Option<bool>,
}

impl ButtonState {
    pub fn main_default() -> Self {
        Self {
            text: Some(DEFAULT_MAIN_BUTTON_TEXT.to_string()),
            color: None,
            text_color: None,
            is_visible: false,
            is_active: true,
            is_progress_visible: false,
            has_shine_effect: Some(false),
        }
    }

    pub fn hidden() -> Self {
        Self {
            text: None,
            color: None,
            text_color: None,
            is_visible: false,
            is_active: true,
            is_progress_visible: false,
            has_shine_effect: None,
        }
    }

    pub fn setup_method(&self, kind: ButtonKind) -> HostMethod {
        match kind {
            ButtonKind::Main if !self.is_visible => {
                HostMethod::WebAppSetupMainButton(MainButtonSetup::default())
            }
            ButtonKind::Main => HostMethod::WebAppSetupMainButton(MainButtonSetup {
                is_visible: true,
                is_active: Some(self.is_active),
                is_progress_visible: Some(self.is_progress_visible),
                text: self.text.clone(),
                color: self.color.clone(),
                text_color: self.text_color.clone(),
                has_shine_effect: self.has_shine_effect,
            }),
            ButtonKind::Back => HostMethod::WebAppSetupBackButton {
                is_visible: self.is_visible,
            },
            ButtonKind::Settings => HostMethod::WebAppSetupSettingsButton {
                is_visible: self.is_visible,
            },
        }
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ButtonParams {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub is_visible: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_progress_visible: Option<bool>,
    #[serde(default)]
    pub has_shine_effect: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonEvent {
    Created,
    Updated(ButtonState),
    Clicked,
    OffClicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEventKind {
    Created,
    Updated,
    Clicked,
    OffClicked,
}

impl Event for ButtonEvent {
    type Kind = ButtonEventKind;

    fn kind(&self) -> ButtonEventKind {
        match self {
            ButtonEvent::Created => ButtonEventKind::Created,
            ButtonEvent::Updated(_) => ButtonEventKind::Updated,
            ButtonEvent::Clicked => ButtonEventKind::Clicked,
            ButtonEvent::OffClicked => ButtonEventKind::OffClicked,
        }
    }
}

struct ButtonSlots {
    current: ButtonState,
    last_emitted: Option<ButtonState>,
}

pub struct ButtonController {
    kind: ButtonKind,
    slots: Mutex<ButtonSlots>,
    events: Publisher<ButtonEvent>,
}

impl ButtonController {
    pub fn new(kind: ButtonKind, initial: ButtonState) -> Self {
        Self {
            kind,
            slots: Mutex::new(ButtonSlots {
                current: initial,
                last_emitted: None,
            }),
            events: Publisher::new(),
        }
    }

    pub fn main() -> Self {
        Self::new(ButtonKind::Main, ButtonState::main_default())
    }

    pub fn back() -> Self {
        Self::new(ButtonKind::Back, ButtonState::hidden())
    }

    pub fn settings() -> Self {
        Self::new(ButtonKind::Settings, ButtonState::hidden())
    }

    pub fn kind(&self) -> ButtonKind {
        self.kind
    }

    pub fn state(&self) -> ButtonState {
        lock(&self.slots).current.clone()
    }

    pub fn is_visible(&self) -> bool {
        lock(&self.slots).current.is_visible
    }

    pub fn is_active(&self) -> bool {
        lock(&self.slots).current.is_active
    }

    pub fn set_params(&self, params: &ButtonParams) -> Result<(), BridgeError> {
        let params = self.normalize(params)?;

        let (created, updated) = {
            let mut slots = lock(&self.slots);
            let merged = merge(&slots.current, &params);

            if self.kind == ButtonKind::Main
                && merged.is_visible
                && merged.text.as_deref().map_or(true, str::is_empty)
            {
                return Err(BridgeError::param_invalid(
                    "main button cannot be shown without text",
                ));
            }

            slots.current = merged.clone();
            if slots.last_emitted.as_ref() == Some(&merged) {
                debug!(button = self.kind.as_str(), "button state unchanged; update suppressed");
                return Ok(());
            }

            let created = slots.last_emitted.is_none() && self.kind.announces_creation();
            slots.last_emitted = Some(merged.clone());
            (created, merged)
        };

        if created {
            self.events.emit(&ButtonEvent::Created);
        }
        self.events.emit(&ButtonEvent::Updated(updated));
        Ok(())
    }

    pub fn show(&self) -> Result<(), BridgeError> {
        self.set_params(&ButtonParams {
            is_visible: Some(true),
            ..ButtonParams::default()
        })
    }

    pub fn hide(&self) -> Result<(), BridgeError> {
        self.set_params(&ButtonParams {
            is_visible: Some(false),
            ..ButtonParams::default()
        })
    }

    pub fn enable(&self) -> Result<(), BridgeError> {
        self.set_params(&ButtonParams {
            is_active: Some(true),
            ..ButtonParams::default()
        })
    }

    pub fn disable(&self) -> Result<(), BridgeError> {
        self.set_params(&ButtonParams {
            is_active: Some(false),
            ..ButtonParams::default()
        })
    }

    pub fn show_progress(&self, leave_active: bool) -> Result<(), BridgeError> {
        self.set_params(&ButtonParams {
            is_progress_visible: Some(true),
            is_active: Some(leave_active),
            ..ButtonParams::default()
        })
    }

    pub fn hide_progress(&self) -> Result<(), BridgeError> {
        self.set_params(&ButtonParams {
            is_progress_visible: Some(false),
            ..ButtonParams::default()
        })
    }

    pub fn set_text(&self, text: impl Into<String>) -> Result<(), BridgeError> {
        self.set_params(&ButtonParams {
            text: Some(text.into()),
            ..ButtonParams::default()
        })
    }

    pub fn on<F>(&self, kind: ButtonEventKind, handler: F) -> HandlerId
    where
        F: Fn(&ButtonEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    pub fn off(&self, kind: ButtonEventKind, id: HandlerId) -> bool {
        self.events.off(kind, id)
    }

    pub fn on_click<F>(&self, handler: F) -> HandlerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events.on(ButtonEventKind::Clicked, move |_event| handler())
    }

    pub fn off_click(&self, id: HandlerId) -> bool {
        let removed = self.events.off(ButtonEventKind::Clicked, id);
        if removed {
            self.events.emit(&ButtonEvent::OffClicked);
        }
        removed
    }

    /// Host press. Returns whether `Clicked` was delivered.
    pub fn handle_pressed(&self) -> bool {
        if self.kind.clicks_require_active() && !self.is_active() {
            debug!(button = self.kind.as_str(), "press ignored while inactive");
            return false;
        }
        self.events.emit(&ButtonEvent::Clicked);
        true
    }

    fn normalize(&self, params: &ButtonParams) -> Result<ButtonParams, BridgeError> {
        if self.kind != ButtonKind::Main {
            return Ok(ButtonParams {
                is_visible: params.is_visible,
                ..ButtonParams::default()
            });
        }

        let text = params
            .text
            .as_deref()
            .map(|text| {
                let text = text.trim();
                let len = text.chars().count();
                if len == 0 || len > MAX_BUTTON_TEXT_LEN {
                    Err(BridgeError::param_invalid(format!(
                        "button text must be 1..={MAX_BUTTON_TEXT_LEN} characters"
                    )))
                } else {
                    Ok(text.to_string())
                }
            })
            .transpose()?;

        Ok(ButtonParams {
            text,
            color: normalize_color_field("color", params.color.as_deref())?,
            text_color: normalize_color_field("text_color", params.text_color.as_deref())?,
            ..params.clone()
        })
    }
}

fn normalize_color_field(field: &str, value: Option<&str>) -> Result<Option<String>, BridgeError> {
    value
        .map(|raw| {
            normalize_hex_color(raw).ok_or_else(|| {
                BridgeError::param_invalid(format!("button {field} '{raw}' is not a hex color"))
            })
        })
        .transpose()
}

fn merge(current: &ButtonState, params: &ButtonParams) -> ButtonState {
    ButtonState {
        text: params.text.clone().or_else(|| current.text.clone()),
        color: params.color.clone().or_else(|| current.color.clone()),
        text_color: params.text_color.clone().or_else(|| current.text_color.clone()),
        is_visible: params.is_visible.unwrap_or(current.is_visible),
        is_active: params.is_active.unwrap_or(current.is_active),
        is_progress_visible: params
            .is_progress_visible
            .unwrap_or(current.is_progress_visible),
        has_shine_effect: params.has_shine_effect.or(current.has_shine_effect),
    }
}

#[cfg(test)]
#[path = "tests/button_tests.rs"]
mod tests;
