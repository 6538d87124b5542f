use super::*;
use serde_json::json;
use shared::protocol::PopupClosed;

fn bridge() -> (Arc<RecordingTransport>, EventBridge) {
    let transport = RecordingTransport::new();
    let bridge = EventBridge::new(transport.clone());
    (transport, bridge)
}

#[test]
fn post_hands_name_and_params_to_transport() {
    let (transport, bridge) = bridge();

    bridge.post(&HostMethod::WebAppDataSend {
        data: "payload".to_string(),
    });
    bridge.post(&HostMethod::WebAppExpand);

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].event_type, "web_app_data_send");
    assert_eq!(sent[0].event_data, Some(json!({"data": "payload"})));
    assert_eq!(sent[1].event_type, "web_app_expand");
    assert_eq!(sent[1].event_data, None);
}

#[test]
fn dispatch_decodes_and_delivers_typed_event() {
    let (_transport, bridge) = bridge();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_for_handler = seen.clone();
    bridge.on(HostEventName::PopupClosed, move |event| {
        seen_for_handler.lock().expect("seen").push(event.clone());
    });

    bridge.dispatch("popup_closed", json!({"button_id": "ok"}));

    assert_eq!(
        *seen.lock().expect("seen"),
        vec![HostEvent::PopupClosed(PopupClosed {
            button_id: Some("ok".to_string())
        })]
    );
}

#[test]
fn unknown_or_malformed_events_are_dropped_silently() {
    let (_transport, bridge) = bridge();
    let calls = Arc::new(Mutex::new(0_u32));

    let calls_for_handler = calls.clone();
    bridge.on(HostEventName::InvoiceClosed, move |_event| {
        *calls_for_handler.lock().expect("calls") += 1;
    });

    bridge.dispatch("not_an_event", json!({}));
    bridge.dispatch("invoice_closed", json!({"slug": 5}));
    bridge.receive_message("{not json");

    assert_eq!(*calls.lock().expect("calls"), 0);
}

#[test]
fn receive_message_unwraps_envelope() {
    let (_transport, bridge) = bridge();
    let pressed = Arc::new(Mutex::new(0_u32));

    let pressed_for_handler = pressed.clone();
    bridge.on(HostEventName::BackButtonPressed, move |_event| {
        *pressed_for_handler.lock().expect("pressed") += 1;
    });

    bridge.receive_message(r#"{"eventType":"back_button_pressed"}"#);
    bridge.receive_message(r#"{"eventType":"back_button_pressed","eventData":null}"#);

    assert_eq!(*pressed.lock().expect("pressed"), 2);
}

#[test]
fn handler_may_unsubscribe_another_during_dispatch() {
    let (_transport, bridge) = bridge();
    let bridge = Arc::new(bridge);
    let log = Arc::new(Mutex::new(Vec::new()));
    let victim = Arc::new(Mutex::new(None::<HandlerId>));

    let bridge_for_first = bridge.clone();
    let victim_for_first = victim.clone();
    let log_for_first = log.clone();
    bridge.on(HostEventName::MainButtonPressed, move |_event| {
        log_for_first.lock().expect("log").push("first");
        if let Some(id) = victim_for_first.lock().expect("victim").take() {
            bridge_for_first.off(HostEventName::MainButtonPressed, id);
        }
    });

    let log_for_second = log.clone();
    let id = bridge.on(HostEventName::MainButtonPressed, move |_event| {
        log_for_second.lock().expect("log").push("second");
    });
    *victim.lock().expect("victim") = Some(id);

    bridge.dispatch("main_button_pressed", Value::Null);
    bridge.dispatch("main_button_pressed", Value::Null);

    assert_eq!(*log.lock().expect("log"), vec!["first", "second", "first"]);
    assert_eq!(bridge.handler_count(HostEventName::MainButtonPressed), 1);
}
