//! Duplex channel between the mini-app and its host shell.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use shared::protocol::{Envelope, HostEvent, HostEventName, HostMethod};
use tracing::{debug, error, warn};

use crate::{
    events::{Event, Handler, HandlerId, Publisher},
    lock,
};

/// Physical delivery of host-bound messages. Implementations must not block.
pub trait Transport: Send + Sync {
    fn send(&self, event_type: &str, event_data: Option<Value>);
}

impl Event for HostEvent {
    type Kind = HostEventName;

    fn kind(&self) -> HostEventName {
        self.name()
    }
}

pub struct EventBridge {
    transport: Arc<dyn Transport>,
    inbound: Publisher<HostEvent>,
}

impl EventBridge {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            inbound: Publisher::new(),
        }
    }

    pub fn post(&self, method: &HostMethod) {
        match method.to_envelope() {
            Ok(envelope) => {
                debug!(event = %envelope.event_type, "posting to host");
                self.transport
                    .send(&envelope.event_type, envelope.event_data);
            }
            Err(err) => error!(?method, "failed to encode host method: {err}"),
        }
    }

    pub fn on<F>(&self, name: HostEventName, handler: F) -> HandlerId
    where
        F: Fn(&HostEvent) + Send + Sync + 'static,
    {
        self.inbound.on(name, handler)
    }

    pub fn off(&self, name: HostEventName, id: HandlerId) -> bool {
        self.inbound.off(name, id)
    }

    /// Entry point for the transport when the host pushes an event. Never
    /// fails: undecodable events are logged and dropped.
    pub fn dispatch(&self, name: &str, payload: Value) {
        match HostEvent::decode(name, payload) {
            Ok(event) => self.dispatch_event(&event),
            Err(err) => warn!(event = name, "dropping host event: {err}"),
        }
    }

    pub fn dispatch_event(&self, event: &HostEvent) {
        debug!(event = %event.name(), "host event received");
        self.call_event_callbacks(event.name(), |handler| handler(event));
    }

    /// Raw `{"eventType", "eventData"}` message from the transport.
    pub fn receive_message(&self, raw: &str) {
        match HostEvent::from_envelope(raw) {
            Ok(event) => self.dispatch_event(&event),
            Err(err) => warn!("dropping host message: {err}"),
        }
    }

    pub fn call_event_callbacks<A>(&self, name: HostEventName, adapt: A)
    where
        A: FnMut(&Handler<HostEvent>),
    {
        self.inbound.call_each(name, adapt);
    }

    pub fn handler_count(&self, name: HostEventName) -> usize {
        self.inbound.handler_count(name)
    }
}

/// Transport that keeps every posted message in memory.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Envelope>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Envelope> {
        lock(&self.sent).clone()
    }

    pub fn sent_names(&self) -> Vec<String> {
        lock(&self.sent)
            .iter()
            .map(|envelope| envelope.event_type.clone())
            .collect()
    }

    pub fn last(&self) -> Option<Envelope> {
        lock(&self.sent).last().cloned()
    }

    pub fn take(&self) -> Vec<Envelope> {
        std::mem::take(&mut *lock(&self.sent))
    }
}

impl Transport for RecordingTransport {
    fn send(&self, event_type: &str, event_data: Option<Value>) {
        lock(&self.sent).push(Envelope {
            event_type: event_type.to_string(),
            event_data,
        });
    }
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
