use std::{collections::BTreeMap, sync::Mutex};

use shared::domain::ColorScheme;
use tracing::debug;

use crate::{
    color::{is_color_dark, normalize_hex_color},
    events::{Event, HandlerId, Publisher},
    lock,
};

pub const BG_COLOR_KEY: &str = "bg_color";
pub const SECONDARY_BG_COLOR_KEY: &str = "secondary_bg_color";

const LEGACY_DARK_BG: &str = "#1c1c1d";
const LEGACY_DARK_SECONDARY_BG: &str = "#2c2c2e";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeEvent {
    ParamSet { key: String, value: String },
    ColorSchemeChanged(ColorScheme),
    ParamsChanged(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeEventKind {
    ParamSet,
    ColorSchemeChanged,
    ParamsChanged,
}

impl Event for ThemeEvent {
    type Kind = ThemeEventKind;

    fn kind(&self) -> ThemeEventKind {
        match self {
            ThemeEvent::ParamSet { .. } => ThemeEventKind::ParamSet,
            ThemeEvent::ColorSchemeChanged(_) => ThemeEventKind::ColorSchemeChanged,
            ThemeEvent::ParamsChanged(_) => ThemeEventKind::ParamsChanged,
        }
    }
}

#[derive(Default)]
struct ThemeState {
    params: BTreeMap<String, String>,
    color_scheme: ColorScheme,
}

#[derive(Default)]
pub struct Theme {
    state: Mutex<ThemeState>,
    events: Publisher<ThemeEvent>,
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_param(&self, key: &str) -> Option<String> {
        lock(&self.state).params.get(key).cloned()
    }

    pub fn params(&self) -> BTreeMap<String, String> {
        lock(&self.state).params.clone()
    }

    pub fn color_scheme(&self) -> ColorScheme {
        lock(&self.state).color_scheme
    }

    /// Merges `new_params`; values that are not hex colors are dropped.
    pub fn set_params(&self, new_params: BTreeMap<String, String>) {
        let incoming: BTreeMap<String, String> = new_params
            .into_iter()
            .filter_map(|(key, raw)| match normalize_hex_color(&raw) {
                Some(color) => Some((key, color)),
                None => {
                    debug!(key = %key, value = %raw, "dropping non-hex theme param");
                    None
                }
            })
            .collect();

        let events = {
            let mut state = lock(&self.state);
            let mut merged = state.params.clone();
            merged.extend(incoming);
            correct_legacy_secondary(&mut merged);

            let mut events = Vec::new();
            for (key, value) in &merged {
                if state.params.get(key) != Some(value) {
                    events.push(ThemeEvent::ParamSet {
                        key: key.clone(),
                        value: value.clone(),
                    });
                }
            }
            state.params = merged;

            let scheme = derive_color_scheme(&state.params);
            if scheme != state.color_scheme {
                state.color_scheme = scheme;
                events.push(ThemeEvent::ColorSchemeChanged(scheme));
            }

            events.push(ThemeEvent::ParamsChanged(state.params.clone()));
            events
        };

        for event in &events {
            self.events.emit(event);
        }
    }

    pub fn on<F>(&self, kind: ThemeEventKind, handler: F) -> HandlerId
    where
        F: Fn(&ThemeEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    pub fn off(&self, kind: ThemeEventKind, id: HandlerId) -> bool {
        self.events.off(kind, id)
    }
}

fn correct_legacy_secondary(params: &mut BTreeMap<String, String>) {
    if params.get(BG_COLOR_KEY).map(String::as_str) == Some(LEGACY_DARK_BG)
        && params.get(BG_COLOR_KEY) == params.get(SECONDARY_BG_COLOR_KEY)
    {
        params.insert(
            SECONDARY_BG_COLOR_KEY.to_string(),
            LEGACY_DARK_SECONDARY_BG.to_string(),
        );
    }
}

fn derive_color_scheme(params: &BTreeMap<String, String>) -> ColorScheme {
    match params.get(BG_COLOR_KEY).and_then(|bg| is_color_dark(bg)) {
        Some(true) => ColorScheme::Dark,
        _ => ColorScheme::Light,
    }
}

#[cfg(test)]
#[path = "tests/theme_tests.rs"]
mod tests;
