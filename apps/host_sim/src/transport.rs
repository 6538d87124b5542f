use std::{
    io::{self, Write},
    sync::{Mutex, PoisonError},
};

use serde_json::Value;
use shared::protocol::Envelope;
use tracing::error;
use webapp_core::Transport;

/// Writes each host-bound post as one JSON envelope per line.
pub struct JsonLinesTransport<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLinesTransport<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Transport for JsonLinesTransport<W> {
    fn send(&self, event_type: &str, event_data: Option<Value>) {
        let envelope = Envelope {
            event_type: event_type.to_string(),
            event_data,
        };
        let line = match serde_json::to_string(&envelope) {
            Ok(line) => line,
            Err(err) => {
                error!(event = event_type, "failed to encode post: {err}");
                return;
            }
        };

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            error!(event = event_type, "failed to write post: {err}");
        }
    }
}
