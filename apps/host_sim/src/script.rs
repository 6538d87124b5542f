//! JSON-lines scenario playback.
//!
//! Each non-blank, non-`#` line is either a host event envelope
//! (`{"eventType": ..., "eventData": ...}`) fed to the bridge, or an app
//! action (`{"action": ...}`) invoking the matching `WebApp` operation.

use serde::Deserialize;
use serde_json::Value;
use shared::error::BridgeError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};
use webapp_core::{ButtonParams, PopupSpec, QrPopupSpec, WebApp};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Ready,
    Expand,
    Close,
    SendData {
        data: String,
    },
    OpenLink {
        url: String,
        #[serde(default)]
        try_instant_view: bool,
    },
    OpenTelegramLink {
        url: String,
    },
    Invoice {
        url: String,
    },
    Alert {
        message: String,
    },
    Confirm {
        message: String,
    },
    Popup(PopupSpec),
    ScanQr {
        #[serde(default)]
        text: Option<String>,
        /// Close the scanner on the first scan whose text equals this value;
        /// any scan closes it when absent.
        #[serde(default)]
        close_on: Option<String>,
    },
    CloseScanQr,
    Clipboard,
    MainButton(ButtonParams),
    BackButton {
        is_visible: bool,
    },
    SettingsButton {
        is_visible: bool,
    },
    HeaderColor {
        color: String,
    },
    BackgroundColor {
        color: String,
    },
    ClosingConfirmation {
        enabled: bool,
    },
    Haptic(HapticAction),
    InlineQuery {
        query: String,
        #[serde(default)]
        chat_types: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HapticAction {
    Impact { impact_style: String },
    Notification { notification_type: String },
    Selection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptStats {
    pub host_events: usize,
    pub actions: usize,
    pub failed_actions: usize,
    pub skipped: usize,
}

pub async fn run_script<R>(app: &WebApp, reader: R) -> anyhow::Result<ScriptStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ScriptStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0_usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!(line = line_no, "skipping unparseable script line: {err}");
                stats.skipped += 1;
                continue;
            }
        };

        if value.get("eventType").is_some() {
            debug!(line = line_no, "host event");
            app.receive_message(line);
            stats.host_events += 1;
            continue;
        }

        match serde_json::from_value::<Action>(value) {
            Ok(action) => {
                stats.actions += 1;
                if let Err(err) = perform(app, action) {
                    warn!(line = line_no, code = ?err.code, "action failed: {}", err.message);
                    stats.failed_actions += 1;
                }
            }
            Err(err) => {
                warn!(line = line_no, "skipping unknown script line: {err}");
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

pub fn perform(app: &WebApp, action: Action) -> Result<(), BridgeError> {
    debug!(?action, "performing action");
    match action {
        Action::Ready => app.ready(),
        Action::Expand => app.expand(),
        Action::Close => app.close(),
        Action::SendData { data } => app.send_data(&data)?,
        Action::OpenLink {
            url,
            try_instant_view,
        } => app.open_link(&url, try_instant_view)?,
        Action::OpenTelegramLink { url } => app.open_telegram_link(&url)?,
        Action::Invoice { url } => {
            let label = url.clone();
            app.open_invoice(
                &url,
                Some(Box::new(move |status| {
                    info!(url = %label, status = %status, "invoice closed")
                })),
            )?
        }
        Action::Alert { message } => {
            app.show_alert(&message, Some(Box::new(|| info!("alert dismissed"))))?
        }
        Action::Confirm { message } => app.show_confirm(
            &message,
            Some(Box::new(|confirmed| info!(confirmed, "confirm answered"))),
        )?,
        Action::Popup(spec) => app.show_popup(
            &spec,
            Some(Box::new(|button_id| info!(button_id = %button_id, "popup answered"))),
        )?,
        Action::ScanQr { text, close_on } => app.show_scan_qr_popup(
            &QrPopupSpec { text },
            Some(Box::new(move |data: Option<&str>| {
                info!(data = ?data, "qr scanned");
                match &close_on {
                    Some(expected) => data == Some(expected.as_str()),
                    None => true,
                }
            })),
        )?,
        Action::CloseScanQr => app.close_scan_qr_popup()?,
        Action::Clipboard => app.read_text_from_clipboard(Some(Box::new(|text| {
            info!(text = ?text, "clipboard text received")
        })))?,
        Action::MainButton(params) => app.main_button().set_params(&params)?,
        Action::BackButton { is_visible } => {
            let button = app.back_button()?;
            if is_visible {
                button.show()?
            } else {
                button.hide()?
            }
        }
        Action::SettingsButton { is_visible } => {
            let button = app.settings_button()?;
            if is_visible {
                button.show()?
            } else {
                button.hide()?
            }
        }
        Action::HeaderColor { color } => app.set_header_color(&color)?,
        Action::BackgroundColor { color } => app.set_background_color(&color)?,
        Action::ClosingConfirmation { enabled: true } => app.enable_closing_confirmation()?,
        Action::ClosingConfirmation { enabled: false } => app.disable_closing_confirmation()?,
        Action::Haptic(haptic) => {
            let feedback = app.haptic_feedback()?;
            match haptic {
                HapticAction::Impact { impact_style } => {
                    feedback.impact_occurred(&impact_style)?
                }
                HapticAction::Notification { notification_type } => {
                    feedback.notification_occurred(&notification_type)?
                }
                HapticAction::Selection => feedback.selection_changed(),
            }
        }
        Action::InlineQuery { query, chat_types } => {
            let chat_types: Vec<&str> = chat_types.iter().map(String::as_str).collect();
            app.switch_inline_query(&query, &chat_types)?
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/script_tests.rs"]
mod tests;
