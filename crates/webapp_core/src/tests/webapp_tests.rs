use super::*;
use crate::bridge::RecordingTransport;
use serde_json::json;
use shared::{error::ErrorCode, protocol::Envelope};

const THEME: &str = r##"{"bg_color":"#ffffff","secondary_bg_color":"#f0f0f0"}"##;

fn launch(version: &str) -> LaunchParams {
    LaunchParams {
        version: version.to_string(),
        platform: "tdesktop".to_string(),
        theme_params: Some(THEME.to_string()),
        bot_inline: true,
        ..LaunchParams::default()
    }
}

fn boot_with(params: LaunchParams) -> (Arc<RecordingTransport>, WebApp) {
    let transport = RecordingTransport::new();
    let app = WebApp::new(params, transport.clone(), None);
    transport.take();
    (transport, app)
}

fn boot(version: &str) -> (Arc<RecordingTransport>, WebApp) {
    boot_with(launch(version))
}

fn record(app: &WebApp, kinds: &[AppEventKind]) -> Arc<Mutex<Vec<AppEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in kinds {
        let seen = seen.clone();
        app.on_event(*kind, move |event| seen.lock().expect("seen").push(event.clone()));
    }
    seen
}

fn payload(envelope: &Envelope) -> Value {
    envelope.event_data.clone().unwrap_or(Value::Null)
}

#[test]
fn init_applies_theme_then_requests_theme_and_viewport() {
    let transport = RecordingTransport::new();
    let app = WebApp::new(launch("6.10"), transport.clone(), None);

    assert_eq!(
        transport.sent_names(),
        ["web_app_request_theme", "web_app_request_viewport"]
    );
    assert_eq!(app.theme().get_param("bg_color").as_deref(), Some("#ffffff"));
    assert_eq!(app.color_scheme(), ColorScheme::Light);
    assert_eq!(app.version(), "6.10");
    assert_eq!(app.platform(), "tdesktop");
}

#[test]
fn malformed_launch_theme_is_ignored() {
    let (_transport, app) = boot_with(LaunchParams {
        theme_params: Some("{oops".to_string()),
        ..LaunchParams::default()
    });
    assert!(app.theme_params().is_empty());
}

#[test]
fn gated_operations_fail_on_old_hosts() {
    let (transport, app) = boot("6.0");

    let gated = [
        app.show_alert("hi", None).expect_err("popup"),
        app.open_invoice("https://t.me/$slug", None).expect_err("invoice"),
        app.read_text_from_clipboard(None).expect_err("clipboard"),
        app.set_header_color("bg_color").expect_err("header"),
        app.enable_closing_confirmation().expect_err("closing"),
        app.back_button().err().expect("back button"),
        app.haptic_feedback().err().expect("haptics"),
    ];
    for err in gated {
        assert_eq!(err.code, ErrorCode::MethodUnsupported, "{err}");
    }
    assert!(transport.sent().is_empty());

    let (_transport, app) = boot("6.9");
    assert!(app.back_button().is_ok());
    let err = app.settings_button().err().expect("settings button");
    assert_eq!(err.code, ErrorCode::MethodUnsupported);
}

#[test]
fn confirm_ok_reports_true() {
    let (transport, app) = boot("6.2");
    let answer = Arc::new(Mutex::new(None));
    let answer_slot = answer.clone();

    app.show_confirm(
        "Proceed?",
        Some(Box::new(move |ok| {
            *answer_slot.lock().expect("answer") = Some(ok);
        })),
    )
    .expect("confirm");

    let posted = transport.take();
    assert_eq!(posted.len(), 1);
    assert_eq!(
        payload(&posted[0]),
        json!({
            "message": "Proceed?",
            "buttons": [{"id": "ok", "type": "ok"}, {"id": "", "type": "cancel"}]
        })
    );

    app.dispatch("popup_closed", json!({"button_id": "ok"}));
    assert_eq!(*answer.lock().expect("answer"), Some(true));
}

#[test]
fn confirm_cancel_skips_callback_but_emits_popup_closed() {
    let (_transport, app) = boot("6.2");
    let seen = record(&app, &[AppEventKind::PopupClosed]);
    let called = Arc::new(Mutex::new(false));
    let called_slot = called.clone();

    app.show_confirm(
        "Proceed?",
        Some(Box::new(move |_ok| *called_slot.lock().expect("called") = true)),
    )
    .expect("confirm");
    app.dispatch("popup_closed", json!({"button_id": ""}));

    assert!(!*called.lock().expect("called"));
    assert_eq!(
        *seen.lock().expect("seen"),
        vec![AppEvent::PopupClosed {
            button_id: Some(String::new())
        }]
    );

    app.show_alert("again", None).expect("popup closed after cancel");
}

#[test]
fn second_popup_while_open_is_already_open() {
    let (transport, app) = boot("6.2");
    app.show_alert("first", None).expect("first popup");
    let err = app.show_alert("second", None).expect_err("second popup");
    assert_eq!(err.code, ErrorCode::AlreadyOpen);
    assert_eq!(transport.sent().len(), 1);
}

#[test]
fn alert_callback_runs_on_close() {
    let (transport, app) = boot("6.2");
    let closed = Arc::new(Mutex::new(0_u32));
    let closed_slot = closed.clone();

    app.show_alert(
        "Saved",
        Some(Box::new(move || *closed_slot.lock().expect("closed") += 1)),
    )
    .expect("alert");

    let posted = transport.take();
    let button_id = payload(&posted[0])["buttons"][0]["id"]
        .as_str()
        .expect("synthesized id")
        .to_string();
    assert_eq!(payload(&posted[0])["buttons"][0]["type"], "close");

    app.dispatch("popup_closed", json!({ "button_id": button_id }));
    app.dispatch("popup_closed", json!({ "button_id": button_id }));
    assert_eq!(*closed.lock().expect("closed"), 1);
}

#[test]
fn stray_popup_closed_emits_nothing() {
    let (_transport, app) = boot("6.2");
    let seen = record(&app, &[AppEventKind::PopupClosed]);
    app.dispatch("popup_closed", json!({"button_id": "ok"}));
    assert!(seen.lock().expect("seen").is_empty());
}

#[test]
fn callback_may_reenter_the_app() {
    let (transport, app) = boot("6.2");
    let reentrant = app.clone();

    app.show_confirm(
        "Delete?",
        Some(Box::new(move |ok| {
            if ok {
                reentrant.show_alert("Deleted", None).expect("nested popup");
            }
        })),
    )
    .expect("confirm");
    app.dispatch("popup_closed", json!({"button_id": "ok"}));

    assert_eq!(
        transport.sent_names(),
        ["web_app_open_popup", "web_app_open_popup"]
    );
}

#[test]
fn invoice_round_trip_is_keyed_by_slug() {
    let (transport, app) = boot("6.1");
    let seen = record(&app, &[AppEventKind::InvoiceClosed]);
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let statuses_slot = statuses.clone();

    app.open_invoice(
        "https://t.me/$abc",
        Some(Box::new(move |status| {
            statuses_slot.lock().expect("statuses").push(status)
        })),
    )
    .expect("open invoice");
    assert_eq!(payload(&transport.take()[0]), json!({"slug": "abc"}));

    let err = app
        .open_invoice("https://t.me/invoice/abc", None)
        .expect_err("same slug pending");
    assert_eq!(err.code, ErrorCode::AlreadyOpen);

    app.dispatch("invoice_closed", json!({"slug": "abc", "status": "paid"}));
    app.dispatch("invoice_closed", json!({"slug": "abc", "status": "paid"}));

    assert_eq!(*statuses.lock().expect("statuses"), ["paid"]);
    assert_eq!(
        *seen.lock().expect("seen"),
        vec![AppEvent::InvoiceClosed {
            url: "https://t.me/$abc".to_string(),
            status: "paid".to_string()
        }]
    );
    assert_eq!(app.pending_request_count(), 0);
}

#[test]
fn clipboard_response_is_delivered_once() {
    let (transport, app) = boot("6.4");
    let seen = record(&app, &[AppEventKind::ClipboardTextReceived]);
    let texts = Arc::new(Mutex::new(Vec::new()));
    let texts_slot = texts.clone();

    app.read_text_from_clipboard(Some(Box::new(move |text| {
        texts_slot.lock().expect("texts").push(text)
    })))
    .expect("clipboard");
    let req_id = payload(&transport.take()[0])["req_id"]
        .as_str()
        .expect("req_id")
        .to_string();
    assert_eq!(req_id.len(), 32);

    app.dispatch("clipboard_text_received", json!({"req_id": "unknown", "data": "x"}));
    app.dispatch("clipboard_text_received", json!({"req_id": req_id, "data": "copied"}));
    app.dispatch("clipboard_text_received", json!({"req_id": req_id, "data": "again"}));

    assert_eq!(*texts.lock().expect("texts"), [Some("copied".to_string())]);
    assert_eq!(seen.lock().expect("seen").len(), 1);
}

#[test]
fn unanswered_requests_stay_pending() {
    let (_transport, app) = boot("6.4");
    app.read_text_from_clipboard(None).expect("first");
    app.read_text_from_clipboard(None).expect("second");
    assert_eq!(app.pending_request_count(), 2);
}

#[test]
fn qr_scan_consumed_by_callback_dismisses_popup() {
    let (transport, app) = boot("6.4");
    let seen = record(&app, &[AppEventKind::QrTextReceived]);

    app.show_scan_qr_popup(
        &QrPopupSpec::with_text("  Scan the code  "),
        Some(Box::new(|data: Option<&str>| data == Some("wanted"))),
    )
    .expect("open scanner");
    assert_eq!(
        payload(&transport.take()[0]),
        json!({"text": "Scan the code"})
    );

    app.dispatch("qr_text_received", json!({"data": "other"}));
    assert!(transport.sent().is_empty());

    app.dispatch("qr_text_received", json!({"data": "wanted"}));
    assert_eq!(transport.sent_names(), ["web_app_close_scan_qr_popup"]);
    assert_eq!(seen.lock().expect("seen").len(), 2);

    app.dispatch("qr_text_received", json!({"data": "late"}));
    assert_eq!(seen.lock().expect("seen").len(), 2);
}

#[test]
fn host_dismissal_closes_scanner() {
    let (_transport, app) = boot("6.4");
    let seen = record(&app, &[AppEventKind::ScanQrPopupClosed]);

    app.show_scan_qr_popup(&QrPopupSpec::default(), None)
        .expect("open scanner");
    let err = app
        .show_scan_qr_popup(&QrPopupSpec::default(), None)
        .expect_err("already open");
    assert_eq!(err.code, ErrorCode::AlreadyOpen);

    app.dispatch("scan_qr_popup_closed", Value::Null);
    assert_eq!(seen.lock().expect("seen").len(), 1);
    app.show_scan_qr_popup(&QrPopupSpec::default(), None)
        .expect("reopen after dismissal");
}

#[test]
fn main_button_posts_setup_and_forwards_active_clicks() {
    let (transport, app) = boot("6.0");
    let seen = record(&app, &[AppEventKind::MainButtonClicked]);

    app.main_button().set_text("Buy").expect("text");
    app.main_button().show().expect("show");
    let posted = transport.take();
    assert_eq!(
        payload(posted.last().expect("setup")),
        json!({
            "is_visible": true,
            "is_active": true,
            "is_progress_visible": false,
            "text": "Buy",
            "has_shine_effect": false
        })
    );

    app.dispatch("main_button_pressed", Value::Null);
    app.main_button().disable().expect("disable");
    app.dispatch("main_button_pressed", Value::Null);

    assert_eq!(*seen.lock().expect("seen"), vec![AppEvent::MainButtonClicked]);
}

#[test]
fn back_and_settings_buttons_forward_presses() {
    let (transport, app) = boot("6.10");
    let seen = record(
        &app,
        &[
            AppEventKind::BackButtonClicked,
            AppEventKind::SettingsButtonClicked,
        ],
    );

    app.back_button().expect("back").show().expect("show back");
    app.settings_button()
        .expect("settings")
        .show()
        .expect("show settings");
    assert_eq!(
        transport.sent(),
        vec![
            Envelope {
                event_type: "web_app_setup_back_button".to_string(),
                event_data: Some(json!({"is_visible": true})),
            },
            Envelope {
                event_type: "web_app_setup_settings_button".to_string(),
                event_data: Some(json!({"is_visible": true})),
            },
        ]
    );

    app.dispatch("back_button_pressed", Value::Null);
    app.dispatch("settings_button_pressed", Value::Null);
    assert_eq!(
        *seen.lock().expect("seen"),
        vec![AppEvent::BackButtonClicked, AppEvent::SettingsButtonClicked]
    );
}

#[test]
fn host_viewport_updates_state_and_emits_app_event() {
    let (_transport, app) = boot("6.0");
    let seen = record(&app, &[AppEventKind::ViewportChanged]);

    app.dispatch(
        "viewport_changed",
        json!({"height": 600.0, "is_state_stable": true, "is_expanded": true}),
    );
    app.dispatch(
        "viewport_changed",
        json!({"height": 420.0, "is_state_stable": false}),
    );

    let viewport = app.viewport();
    assert_eq!(viewport.height, 420.0);
    assert_eq!(viewport.stable_height, 600.0);
    assert!(!app.is_expanded());
    assert_eq!(
        *seen.lock().expect("seen"),
        vec![
            AppEvent::ViewportChanged {
                is_state_stable: true
            },
            AppEvent::ViewportChanged {
                is_state_stable: false
            },
        ]
    );
}

#[test]
fn theme_changed_updates_scheme() {
    let (_transport, app) = boot("6.0");
    let seen = record(&app, &[AppEventKind::ThemeChanged]);

    app.dispatch(
        "theme_changed",
        json!({"theme_params": {"bg_color": "#17212b"}}),
    );

    assert_eq!(app.color_scheme(), ColorScheme::Dark);
    assert_eq!(*seen.lock().expect("seen"), vec![AppEvent::ThemeChanged]);
}

#[test]
fn theme_changed_with_non_string_values_still_applies_colors() {
    let (_transport, app) = boot("6.0");

    app.receive_message(
        r##"{"eventType":"theme_changed","eventData":{"theme_params":{"bg_color":"#000000","button_color":null}}}"##,
    );

    assert_eq!(
        app.theme_params().get("bg_color").map(String::as_str),
        Some("#000000")
    );
    assert_eq!(app.color_scheme(), ColorScheme::Dark);
}

#[test]
fn send_data_enforces_byte_limit() {
    let (transport, app) = boot("6.0");

    assert_eq!(
        app.send_data("").expect_err("empty").code,
        ErrorCode::ParamInvalid
    );
    assert_eq!(
        app.send_data(&"é".repeat(2049)).expect_err("4098 bytes").code,
        ErrorCode::ParamInvalid
    );
    app.send_data(&"x".repeat(MAX_SEND_DATA_BYTES))
        .expect("exactly at limit");
    assert_eq!(transport.sent_names(), ["web_app_data_send"]);
}

#[test]
fn links_are_validated_and_instant_view_is_gated() {
    let (transport, app) = boot("6.1");
    app.open_link("https://example.com/a", true).expect("link");
    assert_eq!(
        payload(&transport.take()[0]),
        json!({"url": "https://example.com/a", "try_instant_view": false})
    );

    let (transport, app) = boot("6.4");
    app.open_link("https://example.com/a", true).expect("link");
    assert_eq!(payload(&transport.take()[0])["try_instant_view"], true);

    app.open_telegram_link("https://t.me/durov?start=1")
        .expect("tg link");
    assert_eq!(
        payload(&transport.take()[0]),
        json!({"path_full": "/durov?start=1"})
    );

    let err = app.open_link("mailto:me@example.com", false).expect_err("scheme");
    assert_eq!(err.code, ErrorCode::UrlInvalid);
}

#[test]
fn inline_query_checks_mode_length_and_chat_types() {
    let (_transport, app) = boot_with(LaunchParams {
        bot_inline: false,
        ..launch("6.7")
    });
    assert_eq!(
        app.switch_inline_query("q", &[]).expect_err("disabled").code,
        ErrorCode::OperationDisabled
    );

    let (transport, app) = boot("6.7");
    assert_eq!(
        app.switch_inline_query(&"q".repeat(257), &[])
            .expect_err("long")
            .code,
        ErrorCode::ParamInvalid
    );
    assert_eq!(
        app.switch_inline_query("q", &["pigeons"])
            .expect_err("chat type")
            .code,
        ErrorCode::ParamInvalid
    );

    app.switch_inline_query("pizza", &["users", "groups", "users"])
        .expect("inline query");
    assert_eq!(
        payload(&transport.take()[0]),
        json!({"query": "pizza", "chat_types": ["users", "groups"]})
    );
}

#[test]
fn header_color_below_hex_support_maps_theme_colors_to_keys() {
    let (transport, app) = boot("6.1");

    app.set_header_color("#F0F0F0").expect("matches secondary bg");
    assert_eq!(
        payload(&transport.take()[0]),
        json!({"color_key": "secondary_bg_color"})
    );
    assert_eq!(app.header_color().as_deref(), Some("#f0f0f0"));

    app.set_header_color("secondary_bg_color").expect("same key");
    assert!(transport.sent().is_empty());

    let err = app.set_header_color("#123456").expect_err("hex needs 6.9");
    assert_eq!(err.code, ErrorCode::MethodUnsupported);
    let err = app.set_header_color("teal").expect_err("garbage");
    assert_eq!(err.code, ErrorCode::ParamInvalid);
}

#[test]
fn header_and_background_colors_accept_hex_on_new_hosts() {
    let (transport, app) = boot("6.9");

    app.set_header_color("#123").expect("hex header");
    app.set_background_color("bg_color").expect("theme key");
    app.set_background_color("#FFFFFF").expect("same color");

    assert_eq!(
        transport.sent(),
        vec![
            Envelope {
                event_type: "web_app_set_header_color".to_string(),
                event_data: Some(json!({"color": "#112233"})),
            },
            Envelope {
                event_type: "web_app_set_background_color".to_string(),
                event_data: Some(json!({"color": "#ffffff"})),
            },
        ]
    );
}

#[test]
fn closing_confirmation_toggles() {
    let (transport, app) = boot("6.2");
    app.enable_closing_confirmation().expect("enable");
    assert!(app.is_closing_confirmation_enabled());
    app.disable_closing_confirmation().expect("disable");
    assert!(!app.is_closing_confirmation_enabled());

    let flags: Vec<Value> = transport.sent().iter().map(payload).collect();
    assert_eq!(
        flags,
        vec![
            json!({"need_confirmation": true}),
            json!({"need_confirmation": false})
        ]
    );
}

#[test]
fn off_event_stops_delivery() {
    let (_transport, app) = boot("6.0");
    let seen = Arc::new(Mutex::new(0_u32));
    let seen_slot = seen.clone();
    let id = app.on_event(AppEventKind::ThemeChanged, move |_event| {
        *seen_slot.lock().expect("seen") += 1
    });

    app.dispatch("theme_changed", json!({"theme_params": {}}));
    assert!(app.off_event(AppEventKind::ThemeChanged, id));
    app.dispatch("theme_changed", json!({"theme_params": {}}));

    assert_eq!(*seen.lock().expect("seen"), 1);
}
