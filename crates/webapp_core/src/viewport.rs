use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{
    events::{Event, HandlerId, Publisher},
    lock,
};

/// Local window size, used only until the host reports a viewport.
pub trait WindowMetrics: Send + Sync {
    fn inner_height(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportUpdate {
    pub height: Option<f64>,
    pub stable_height: Option<f64>,
    pub is_state_stable: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    HeightCalculated { height: f64, stable_height: f64 },
    ViewportChanged { is_state_stable: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEventKind {
    HeightCalculated,
    ViewportChanged,
}

impl Event for ViewportEvent {
    type Kind = ViewportEventKind;

    fn kind(&self) -> ViewportEventKind {
        match self {
            ViewportEvent::HeightCalculated { .. } => ViewportEventKind::HeightCalculated,
            ViewportEvent::ViewportChanged { .. } => ViewportEventKind::ViewportChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportState {
    pub height: f64,
    pub stable_height: f64,
    pub is_expanded: bool,
}

#[derive(Default)]
struct Heights {
    height: f64,
    stable_height: f64,
    host_reported: bool,
    last_observed: Option<f64>,
}

pub struct Viewport {
    heights: Mutex<Heights>,
    window: Option<Arc<dyn WindowMetrics>>,
    events: Publisher<ViewportEvent>,
}

impl Viewport {
    pub fn new(window: Option<Arc<dyn WindowMetrics>>) -> Self {
        Self {
            heights: Mutex::new(Heights::default()),
            window,
            events: Publisher::new(),
        }
    }

    pub fn height(&self) -> f64 {
        lock(&self.heights).height
    }

    pub fn stable_height(&self) -> f64 {
        lock(&self.heights).stable_height
    }

    pub fn is_expanded(&self) -> bool {
        let heights = lock(&self.heights);
        heights.height >= heights.stable_height
    }

    pub fn state(&self) -> ViewportState {
        let heights = lock(&self.heights);
        ViewportState {
            height: heights.height,
            stable_height: heights.stable_height,
            is_expanded: heights.height >= heights.stable_height,
        }
    }

    /// `Some` carries host-reported values; `None` recomputes from the window.
    pub fn set_height(&self, data: Option<ViewportUpdate>) {
        let events = match data {
            Some(update) => self.apply_host_update(update),
            None => self.recompute_from_window(),
        };
        for event in &events {
            self.events.emit(event);
        }
    }

    pub fn on<F>(&self, kind: ViewportEventKind, handler: F) -> HandlerId
    where
        F: Fn(&ViewportEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    pub fn off(&self, kind: ViewportEventKind, id: HandlerId) -> bool {
        self.events.off(kind, id)
    }

    fn apply_host_update(&self, update: ViewportUpdate) -> Vec<ViewportEvent> {
        let mut heights = lock(&self.heights);
        let mut events = Vec::with_capacity(2);

        if update.height.is_some() || update.stable_height.is_some() {
            heights.host_reported = true;
            if let Some(height) = update.height {
                heights.height = height;
                heights.last_observed = Some(height);
            }
            if let Some(stable_height) = update.stable_height {
                heights.stable_height = stable_height;
            }
            events.push(ViewportEvent::HeightCalculated {
                height: heights.height,
                stable_height: heights.stable_height,
            });
        }

        if let Some(is_state_stable) = update.is_state_stable {
            events.push(ViewportEvent::ViewportChanged { is_state_stable });
        }
        events
    }

    fn recompute_from_window(&self) -> Vec<ViewportEvent> {
        let Some(window) = &self.window else {
            return Vec::new();
        };

        let mut heights = lock(&self.heights);
        if heights.host_reported {
            debug!("host reports the viewport; ignoring window fallback");
            return Vec::new();
        }

        let height = window.inner_height();
        if heights.last_observed == Some(height) {
            return Vec::new();
        }

        heights.height = height;
        heights.stable_height = height;
        heights.last_observed = Some(height);
        vec![ViewportEvent::ViewportChanged {
            is_state_stable: true,
        }]
    }
}

#[cfg(test)]
#[path = "tests/viewport_tests.rs"]
mod tests;
