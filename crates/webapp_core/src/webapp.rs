//! Application surface of the mini-app.
//!
//! `WebApp` owns every component, checks version gates and parameters before
//! anything reaches the host, and turns host events into state changes,
//! one-shot callbacks and [`AppEvent`]s.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, Weak},
};

use serde_json::Value;
use shared::{
    domain::{ColorScheme, HeaderColorKey, InlineChatType, PopupButtonKind},
    error::BridgeError,
    protocol::{HeaderColorSetup, HostEvent, HostEventName, HostMethod},
};
use tracing::{debug, info};

use crate::{
    bridge::{EventBridge, Transport},
    button::{ButtonController, ButtonEvent, ButtonEventKind, ButtonKind},
    color::normalize_hex_color,
    events::{Event, HandlerId, Publisher},
    haptic::HapticFeedback,
    init_data::{InitData, LaunchParams},
    links::{invoice_slug, telegram_link_path, validate_link},
    lock,
    pending::PendingRequestRegistry,
    popup::{Popup, PopupButtonSpec, PopupCallback, PopupSpec},
    qr_popup::{QrPopup, QrPopupSpec, QrScanCallback, ScanOutcome},
    theme::Theme,
    version::VersionGate,
    viewport::{Viewport, ViewportEvent, ViewportEventKind, ViewportState, ViewportUpdate, WindowMetrics},
};

pub const MAX_SEND_DATA_BYTES: usize = 4096;
pub const MAX_INLINE_QUERY_LEN: usize = 256;

const CONFIRM_OK_ID: &str = "ok";

pub type InvoiceCallback = Box<dyn FnOnce(String) + Send>;
pub type ClipboardCallback = Box<dyn FnOnce(Option<String>) + Send>;
pub type AlertCallback = Box<dyn FnOnce() + Send>;
pub type ConfirmCallback = Box<dyn FnOnce(bool) + Send>;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    ThemeChanged,
    ViewportChanged { is_state_stable: bool },
    MainButtonClicked,
    BackButtonClicked,
    SettingsButtonClicked,
    InvoiceClosed { url: String, status: String },
    PopupClosed { button_id: Option<String> },
    QrTextReceived { data: Option<String> },
    ScanQrPopupClosed,
    ClipboardTextReceived { data: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEventKind {
    ThemeChanged,
    ViewportChanged,
    MainButtonClicked,
    BackButtonClicked,
    SettingsButtonClicked,
    InvoiceClosed,
    PopupClosed,
    QrTextReceived,
    ScanQrPopupClosed,
    ClipboardTextReceived,
}

impl Event for AppEvent {
    type Kind = AppEventKind;

    fn kind(&self) -> AppEventKind {
        match self {
            AppEvent::ThemeChanged => AppEventKind::ThemeChanged,
            AppEvent::ViewportChanged { .. } => AppEventKind::ViewportChanged,
            AppEvent::MainButtonClicked => AppEventKind::MainButtonClicked,
            AppEvent::BackButtonClicked => AppEventKind::BackButtonClicked,
            AppEvent::SettingsButtonClicked => AppEventKind::SettingsButtonClicked,
            AppEvent::InvoiceClosed { .. } => AppEventKind::InvoiceClosed,
            AppEvent::PopupClosed { .. } => AppEventKind::PopupClosed,
            AppEvent::QrTextReceived { .. } => AppEventKind::QrTextReceived,
            AppEvent::ScanQrPopupClosed => AppEventKind::ScanQrPopupClosed,
            AppEvent::ClipboardTextReceived { .. } => AppEventKind::ClipboardTextReceived,
        }
    }
}

enum PendingRequest {
    Invoice {
        url: String,
        callback: Option<InvoiceCallback>,
    },
    Clipboard(Option<ClipboardCallback>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct HeaderColor {
    color_key: Option<HeaderColorKey>,
    color: Option<String>,
}

struct Inner {
    bridge: Arc<EventBridge>,
    gate: VersionGate,
    launch: LaunchParams,
    theme: Theme,
    viewport: Viewport,
    main_button: ButtonController,
    back_button: ButtonController,
    settings_button: ButtonController,
    popup: Popup,
    qr_popup: QrPopup,
    pending: Mutex<PendingRequestRegistry<PendingRequest>>,
    header_color: Mutex<HeaderColor>,
    background_color: Mutex<Option<String>>,
    closing_confirmation: Mutex<bool>,
    events: Publisher<AppEvent>,
}

#[derive(Clone)]
pub struct WebApp {
    inner: Arc<Inner>,
}

impl WebApp {
    /// Builds the app and performs the launch handshake: theme params from
    /// the launch query, the window fallback viewport, host subscriptions,
    /// then `web_app_request_theme` and `web_app_request_viewport`.
    pub fn new(
        launch: LaunchParams,
        transport: Arc<dyn Transport>,
        window: Option<Arc<dyn WindowMetrics>>,
    ) -> Self {
        let bridge = Arc::new(EventBridge::new(transport));
        let inner = Arc::new(Inner {
            gate: VersionGate::new(launch.version.clone()),
            bridge: Arc::clone(&bridge),
            launch,
            theme: Theme::new(),
            viewport: Viewport::new(window),
            main_button: ButtonController::main(),
            back_button: ButtonController::back(),
            settings_button: ButtonController::settings(),
            popup: Popup::new(),
            qr_popup: QrPopup::new(),
            pending: Mutex::new(PendingRequestRegistry::new()),
            header_color: Mutex::new(HeaderColor::default()),
            background_color: Mutex::new(None),
            closing_confirmation: Mutex::new(false),
            events: Publisher::new(),
        });

        info!(
            version = %inner.launch.version,
            platform = %inner.launch.platform,
            "initializing web app"
        );

        inner.theme.set_params(inner.launch.theme_params());
        inner.viewport.set_height(None);

        let app = Self { inner };
        app.wire_components();
        app.subscribe_host_events();

        bridge.post(&HostMethod::WebAppRequestTheme);
        bridge.post(&HostMethod::WebAppRequestViewport);
        app
    }

    fn wire_components(&self) {
        let inner = &self.inner;

        for button in [&inner.main_button, &inner.back_button, &inner.settings_button] {
            let bridge = Arc::clone(&inner.bridge);
            let kind = button.kind();
            button.on(ButtonEventKind::Updated, move |event| {
                if let ButtonEvent::Updated(state) = event {
                    bridge.post(&state.setup_method(kind));
                }
            });

            let weak = Arc::downgrade(inner);
            button.on(ButtonEventKind::Clicked, move |_event| {
                let app_event = match kind {
                    ButtonKind::Main => AppEvent::MainButtonClicked,
                    ButtonKind::Back => AppEvent::BackButtonClicked,
                    ButtonKind::Settings => AppEvent::SettingsButtonClicked,
                };
                with_inner(&weak, |inner| inner.events.emit(&app_event));
            });
        }

        let weak = Arc::downgrade(inner);
        inner
            .viewport
            .on(ViewportEventKind::ViewportChanged, move |event| {
                if let ViewportEvent::ViewportChanged { is_state_stable } = *event {
                    with_inner(&weak, |inner| {
                        inner
                            .events
                            .emit(&AppEvent::ViewportChanged { is_state_stable })
                    });
                }
            });
    }

    fn subscribe_host_events(&self) {
        const HOST_EVENTS: [HostEventName; 10] = [
            HostEventName::ThemeChanged,
            HostEventName::ViewportChanged,
            HostEventName::InvoiceClosed,
            HostEventName::PopupClosed,
            HostEventName::QrTextReceived,
            HostEventName::ScanQrPopupClosed,
            HostEventName::ClipboardTextReceived,
            HostEventName::MainButtonPressed,
            HostEventName::BackButtonPressed,
            HostEventName::SettingsButtonPressed,
        ];

        for name in HOST_EVENTS {
            let weak = Arc::downgrade(&self.inner);
            self.inner.bridge.on(name, move |event| {
                with_inner(&weak, |inner| inner.handle_host_event(event));
            });
        }
    }

    pub fn bridge(&self) -> &EventBridge {
        &self.inner.bridge
    }

    /// Host-side entry point: `(eventType, eventData)` as pushed by the host.
    pub fn dispatch(&self, name: &str, payload: Value) {
        self.inner.bridge.dispatch(name, payload);
    }

    pub fn receive_message(&self, raw: &str) {
        self.inner.bridge.receive_message(raw);
    }

    pub fn version(&self) -> &str {
        self.inner.gate.current()
    }

    pub fn platform(&self) -> &str {
        &self.inner.launch.platform
    }

    pub fn is_version_at_least(&self, version: &str) -> bool {
        self.inner.gate.is_suitable_to(version)
    }

    pub fn init_data(&self) -> &InitData {
        &self.inner.launch.init_data
    }

    pub fn init_data_raw(&self) -> &str {
        self.inner.launch.init_data_raw()
    }

    pub fn theme(&self) -> &Theme {
        &self.inner.theme
    }

    pub fn theme_params(&self) -> BTreeMap<String, String> {
        self.inner.theme.params()
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.inner.theme.color_scheme()
    }

    pub fn viewport(&self) -> ViewportState {
        self.inner.viewport.state()
    }

    pub fn is_expanded(&self) -> bool {
        self.inner.viewport.is_expanded()
    }

    /// Host round-trips still waiting for an answer. Abandoned requests are
    /// never evicted.
    pub fn pending_request_count(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    pub fn is_closing_confirmation_enabled(&self) -> bool {
        *lock(&self.inner.closing_confirmation)
    }

    /// Current header color as a hex string, resolving theme keys.
    pub fn header_color(&self) -> Option<String> {
        let header = lock(&self.inner.header_color).clone();
        match header.color_key {
            Some(key) => self.inner.theme.get_param(key.as_str()),
            None => header.color,
        }
    }

    pub fn background_color(&self) -> Option<String> {
        lock(&self.inner.background_color)
            .clone()
            .or_else(|| self.inner.theme.get_param(HeaderColorKey::BgColor.as_str()))
    }

    pub fn ready(&self) {
        self.inner.bridge.post(&HostMethod::WebAppReady);
    }

    pub fn expand(&self) {
        self.inner.bridge.post(&HostMethod::WebAppExpand);
    }

    pub fn close(&self) {
        self.inner.bridge.post(&HostMethod::WebAppClose);
    }

    pub fn send_data(&self, data: &str) -> Result<(), BridgeError> {
        if data.is_empty() || data.len() > MAX_SEND_DATA_BYTES {
            return Err(BridgeError::param_invalid(format!(
                "data must be 1..={MAX_SEND_DATA_BYTES} bytes, got {}",
                data.len()
            )));
        }
        self.inner.bridge.post(&HostMethod::WebAppDataSend {
            data: data.to_string(),
        });
        Ok(())
    }

    /// Instant view is requested only when the host supports it (6.4+).
    pub fn open_link(&self, url: &str, try_instant_view: bool) -> Result<(), BridgeError> {
        let url = validate_link(url)?;
        let try_instant_view = try_instant_view && self.inner.gate.is_suitable_to("6.4");
        self.inner.bridge.post(&HostMethod::WebAppOpenLink {
            url: url.to_string(),
            try_instant_view,
        });
        Ok(())
    }

    pub fn open_telegram_link(&self, url: &str) -> Result<(), BridgeError> {
        let path_full = telegram_link_path(url)?;
        self.inner
            .bridge
            .post(&HostMethod::WebAppOpenTgLink { path_full });
        Ok(())
    }

    pub fn open_invoice(
        &self,
        url: &str,
        callback: Option<InvoiceCallback>,
    ) -> Result<(), BridgeError> {
        self.inner.gate.require("6.1", "openInvoice")?;
        let slug = invoice_slug(url)?;

        {
            let mut pending = lock(&self.inner.pending);
            if pending.has(&slug) {
                return Err(BridgeError::already_open(format!(
                    "invoice '{slug}' is already open"
                )));
            }
            pending.set(
                slug.clone(),
                PendingRequest::Invoice {
                    url: url.to_string(),
                    callback,
                },
            );
        }

        self.inner
            .bridge
            .post(&HostMethod::WebAppOpenInvoice { slug });
        Ok(())
    }

    pub fn show_popup(
        &self,
        spec: &PopupSpec,
        callback: Option<PopupCallback>,
    ) -> Result<(), BridgeError> {
        self.inner.gate.require("6.2", "showPopup")?;
        if !self.inner.popup.open(spec, callback)? {
            return Err(BridgeError::already_open("a popup is already open"));
        }
        if let Some(params) = self.inner.popup.params() {
            self.inner.bridge.post(&HostMethod::WebAppOpenPopup(params));
        }
        Ok(())
    }

    pub fn show_alert(
        &self,
        message: &str,
        callback: Option<AlertCallback>,
    ) -> Result<(), BridgeError> {
        let callback = callback.map(|callback| -> PopupCallback { Box::new(move |_id| callback()) });
        self.show_popup(&PopupSpec::new(message), callback)
    }

    /// The cancel button has an empty id, so cancelling never reaches
    /// `callback`; only `PopupClosed` observes it.
    pub fn show_confirm(
        &self,
        message: &str,
        callback: Option<ConfirmCallback>,
    ) -> Result<(), BridgeError> {
        let spec = PopupSpec::new(message).with_buttons(vec![
            PopupButtonSpec::new(PopupButtonKind::Ok).with_id(CONFIRM_OK_ID),
            PopupButtonSpec::new(PopupButtonKind::Cancel).with_id(""),
        ]);
        let callback = callback
            .map(|callback| -> PopupCallback { Box::new(move |id| callback(id == CONFIRM_OK_ID)) });
        self.show_popup(&spec, callback)
    }

    pub fn show_scan_qr_popup(
        &self,
        spec: &QrPopupSpec,
        callback: Option<QrScanCallback>,
    ) -> Result<(), BridgeError> {
        self.inner.gate.require("6.4", "showScanQrPopup")?;
        if !self.inner.qr_popup.open(spec, callback)? {
            return Err(BridgeError::already_open("scan QR popup is already open"));
        }
        self.inner.bridge.post(&HostMethod::WebAppOpenScanQrPopup {
            text: self.inner.qr_popup.text(),
        });
        Ok(())
    }

    pub fn close_scan_qr_popup(&self) -> Result<(), BridgeError> {
        self.inner.gate.require("6.4", "closeScanQrPopup")?;
        self.inner.qr_popup.close();
        self.inner.bridge.post(&HostMethod::WebAppCloseScanQrPopup);
        Ok(())
    }

    pub fn read_text_from_clipboard(
        &self,
        callback: Option<ClipboardCallback>,
    ) -> Result<(), BridgeError> {
        self.inner.gate.require("6.4", "readTextFromClipboard")?;
        let req_id = {
            let mut pending = lock(&self.inner.pending);
            let req_id = pending.create();
            pending.set(req_id.clone(), PendingRequest::Clipboard(callback));
            req_id
        };
        self.inner
            .bridge
            .post(&HostMethod::WebAppReadTextFromClipboard { req_id });
        Ok(())
    }

    /// Duplicate chat types are collapsed, keeping first-seen order.
    pub fn switch_inline_query(&self, query: &str, chat_types: &[&str]) -> Result<(), BridgeError> {
        self.inner.gate.require("6.7", "switchInlineQuery")?;
        if !self.inner.launch.bot_inline {
            return Err(BridgeError::operation_disabled(
                "inline mode is disabled for this bot",
            ));
        }
        if query.chars().count() > MAX_INLINE_QUERY_LEN {
            return Err(BridgeError::param_invalid(format!(
                "inline query is longer than {MAX_INLINE_QUERY_LEN} characters"
            )));
        }

        let mut parsed: Vec<InlineChatType> = Vec::with_capacity(chat_types.len());
        for raw in chat_types {
            let chat_type = raw.parse::<InlineChatType>()?;
            if !parsed.contains(&chat_type) {
                parsed.push(chat_type);
            }
        }

        self.inner.bridge.post(&HostMethod::WebAppSwitchInlineQuery {
            query: query.to_string(),
            chat_types: parsed,
        });
        Ok(())
    }

    /// Accepts `bg_color`, `secondary_bg_color`, or a hex color (6.9+). Below
    /// 6.9 a hex equal to one of those theme colors is sent as its key.
    pub fn set_header_color(&self, key_or_hex: &str) -> Result<(), BridgeError> {
        self.inner.gate.require("6.1", "setHeaderColor")?;

        let header = match key_or_hex.parse::<HeaderColorKey>() {
            Ok(key) => HeaderColor {
                color_key: Some(key),
                color: None,
            },
            Err(_) => {
                let hex = normalize_hex_color(key_or_hex).ok_or_else(|| {
                    BridgeError::param_invalid(format!(
                        "header color '{key_or_hex}' is neither a theme key nor a hex color"
                    ))
                })?;
                if self.inner.gate.is_suitable_to("6.9") {
                    HeaderColor {
                        color_key: None,
                        color: Some(hex),
                    }
                } else {
                    let key = self.theme_key_for(&hex).ok_or_else(|| {
                        BridgeError::method_unsupported(
                            "setHeaderColor with a hex color",
                            self.inner.gate.current(),
                        )
                    })?;
                    HeaderColor {
                        color_key: Some(key),
                        color: None,
                    }
                }
            }
        };

        {
            let mut current = lock(&self.inner.header_color);
            if *current == header {
                debug!("header color unchanged");
                return Ok(());
            }
            *current = header.clone();
        }

        self.inner
            .bridge
            .post(&HostMethod::WebAppSetHeaderColor(HeaderColorSetup {
                color_key: header.color_key,
                color: header.color,
            }));
        Ok(())
    }

    /// Accepts a theme key, resolved against the current theme, or a hex color.
    pub fn set_background_color(&self, key_or_hex: &str) -> Result<(), BridgeError> {
        self.inner.gate.require("6.1", "setBackgroundColor")?;

        let color = match key_or_hex.parse::<HeaderColorKey>() {
            Ok(key) => self.inner.theme.get_param(key.as_str()).ok_or_else(|| {
                BridgeError::param_invalid(format!("theme has no value for '{key}'"))
            })?,
            Err(_) => normalize_hex_color(key_or_hex).ok_or_else(|| {
                BridgeError::param_invalid(format!(
                    "background color '{key_or_hex}' is neither a theme key nor a hex color"
                ))
            })?,
        };

        {
            let mut current = lock(&self.inner.background_color);
            if current.as_deref() == Some(color.as_str()) {
                debug!("background color unchanged");
                return Ok(());
            }
            *current = Some(color.clone());
        }

        self.inner
            .bridge
            .post(&HostMethod::WebAppSetBackgroundColor { color });
        Ok(())
    }

    pub fn enable_closing_confirmation(&self) -> Result<(), BridgeError> {
        self.set_closing_confirmation(true)
    }

    pub fn disable_closing_confirmation(&self) -> Result<(), BridgeError> {
        self.set_closing_confirmation(false)
    }

    fn set_closing_confirmation(&self, need_confirmation: bool) -> Result<(), BridgeError> {
        self.inner.gate.require("6.2", "setupClosingBehavior")?;
        *lock(&self.inner.closing_confirmation) = need_confirmation;
        self.inner
            .bridge
            .post(&HostMethod::WebAppSetupClosingBehavior { need_confirmation });
        Ok(())
    }

    pub fn haptic_feedback(&self) -> Result<HapticFeedback<'_>, BridgeError> {
        self.inner.gate.require("6.1", "hapticFeedback")?;
        Ok(HapticFeedback::new(&self.inner.bridge))
    }

    pub fn main_button(&self) -> &ButtonController {
        &self.inner.main_button
    }

    pub fn back_button(&self) -> Result<&ButtonController, BridgeError> {
        self.inner.gate.require("6.1", "BackButton")?;
        Ok(&self.inner.back_button)
    }

    pub fn settings_button(&self) -> Result<&ButtonController, BridgeError> {
        self.inner.gate.require("6.10", "SettingsButton")?;
        Ok(&self.inner.settings_button)
    }

    pub fn on_event<F>(&self, kind: AppEventKind, handler: F) -> HandlerId
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, handler)
    }

    pub fn off_event(&self, kind: AppEventKind, id: HandlerId) -> bool {
        self.inner.events.off(kind, id)
    }

    fn theme_key_for(&self, hex: &str) -> Option<HeaderColorKey> {
        HeaderColorKey::ALL.iter().copied().find(|key| {
            self.inner.theme.get_param(key.as_str()).as_deref() == Some(hex)
        })
    }
}

impl Inner {
    fn handle_host_event(&self, event: &HostEvent) {
        match event {
            HostEvent::ThemeChanged(payload) => {
                self.theme.set_params(payload.theme_params.clone());
                self.events.emit(&AppEvent::ThemeChanged);
            }
            HostEvent::ViewportChanged(payload) => {
                let stable_height = if payload.is_state_stable {
                    payload.height
                } else {
                    None
                };
                self.viewport.set_height(Some(ViewportUpdate {
                    height: payload.height,
                    stable_height,
                    is_state_stable: Some(payload.is_state_stable),
                }));
            }
            HostEvent::InvoiceClosed(payload) => {
                self.on_invoice_closed(&payload.slug, &payload.status)
            }
            HostEvent::PopupClosed(payload) => {
                let button_id = payload.button_id.clone();
                if self.popup.resolve(button_id.as_deref()) {
                    self.events.emit(&AppEvent::PopupClosed { button_id });
                } else {
                    debug!("popup_closed without an open popup; ignoring");
                }
            }
            HostEvent::QrTextReceived(payload) => self.on_qr_text(payload.data.clone()),
            HostEvent::ScanQrPopupClosed => {
                self.qr_popup.close();
                self.events.emit(&AppEvent::ScanQrPopupClosed);
            }
            HostEvent::ClipboardTextReceived(payload) => {
                self.on_clipboard_text(&payload.req_id, payload.data.clone())
            }
            HostEvent::MainButtonPressed => {
                self.main_button.handle_pressed();
            }
            HostEvent::BackButtonPressed => {
                self.back_button.handle_pressed();
            }
            HostEvent::SettingsButtonPressed => {
                self.settings_button.handle_pressed();
            }
        }
    }

    fn on_invoice_closed(&self, slug: &str, status: &str) {
        let entry = lock(&self.pending).remove(slug);
        match entry {
            Some(PendingRequest::Invoice { url, callback }) => {
                if let Some(callback) = callback {
                    callback(status.to_string());
                }
                self.events.emit(&AppEvent::InvoiceClosed {
                    url,
                    status: status.to_string(),
                });
            }
            Some(other) => {
                lock(&self.pending).set(slug, other);
                debug!(slug, "invoice_closed matched a non-invoice request; ignoring");
            }
            None => debug!(slug, "invoice_closed for unknown slug; ignoring"),
        }
    }

    fn on_clipboard_text(&self, req_id: &str, data: Option<String>) {
        let entry = lock(&self.pending).remove(req_id);
        match entry {
            Some(PendingRequest::Clipboard(callback)) => {
                if let Some(callback) = callback {
                    callback(data.clone());
                }
                self.events
                    .emit(&AppEvent::ClipboardTextReceived { data });
            }
            Some(other) => {
                lock(&self.pending).set(req_id, other);
                debug!(req_id, "clipboard response matched a non-clipboard request; ignoring");
            }
            None => debug!(req_id, "clipboard response for unknown request; ignoring"),
        }
    }

    fn on_qr_text(&self, data: Option<String>) {
        if !self.qr_popup.is_open() {
            debug!("qr_text_received without an open scan popup; ignoring");
            return;
        }
        if self.qr_popup.receive(data.as_deref()) == ScanOutcome::Closed {
            self.bridge.post(&HostMethod::WebAppCloseScanQrPopup);
        }
        self.events.emit(&AppEvent::QrTextReceived { data });
    }
}

fn with_inner(weak: &Weak<Inner>, f: impl FnOnce(&Inner)) {
    if let Some(inner) = weak.upgrade() {
        f(&inner);
    }
}

#[cfg(test)]
#[path = "tests/webapp_tests.rs"]
mod tests;
