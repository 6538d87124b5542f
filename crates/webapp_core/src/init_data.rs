//! Launch inputs handed to the mini-app by its host.
//!
//! The host passes a query string (`tgWebAppData=...&tgWebAppVersion=...`).
//! `tgWebAppData` is itself a url-encoded blob whose object-shaped values
//! (`user`, `receiver`, `chat`) carry JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::form_urlencoded;

pub const DEFAULT_VERSION: &str = "6.0";
pub const DEFAULT_PLATFORM: &str = "unknown";

const INIT_DATA_KEY: &str = "tgWebAppData";
const VERSION_KEY: &str = "tgWebAppVersion";
const PLATFORM_KEY: &str = "tgWebAppPlatform";
const THEME_PARAMS_KEY: &str = "tgWebAppThemeParams";
const BOT_INLINE_KEY: &str = "tgWebAppBotInline";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: Option<bool>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: Option<bool>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// One decoded init-data value.
#[derive(Debug, Clone, PartialEq)]
pub enum InitDataValue {
    Text(String),
    Json(Value),
}

impl InitDataValue {
    fn decode(raw: String) -> Self {
        let looks_like_json = (raw.starts_with('{') && raw.ends_with('}'))
            || (raw.starts_with('[') && raw.ends_with(']'));
        if looks_like_json {
            if let Ok(value) = serde_json::from_str(&raw) {
                return InitDataValue::Json(value);
            }
        }
        InitDataValue::Text(raw)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            InitDataValue::Text(text) => Some(text),
            InitDataValue::Json(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitData {
    raw: String,
    pairs: Vec<(String, InitDataValue)>,
}

impl InitData {
    pub fn parse(raw: &str) -> Self {
        let pairs = form_urlencoded::parse(raw.as_bytes())
            .map(|(key, value)| (key.into_owned(), InitDataValue::decode(value.into_owned())))
            .collect();
        Self {
            raw: raw.to_string(),
            pairs,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn pairs(&self) -> &[(String, InitDataValue)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&InitDataValue> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(InitDataValue::as_text)
    }

    fn object<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get(key)? {
            InitDataValue::Json(value) => match serde_json::from_value(value.clone()) {
                Ok(decoded) => Some(decoded),
                Err(err) => {
                    warn!(key, "init data field has unexpected shape: {err}");
                    None
                }
            },
            InitDataValue::Text(_) => None,
        }
    }

    pub fn query_id(&self) -> Option<&str> {
        self.text("query_id")
    }

    pub fn user(&self) -> Option<WebAppUser> {
        self.object("user")
    }

    pub fn receiver(&self) -> Option<WebAppUser> {
        self.object("receiver")
    }

    pub fn chat(&self) -> Option<WebAppChat> {
        self.object("chat")
    }

    pub fn chat_type(&self) -> Option<&str> {
        self.text("chat_type")
    }

    pub fn chat_instance(&self) -> Option<&str> {
        self.text("chat_instance")
    }

    pub fn start_param(&self) -> Option<&str> {
        self.text("start_param")
    }

    pub fn can_send_after(&self) -> Option<u64> {
        self.text("can_send_after")?.parse().ok()
    }

    pub fn auth_date(&self) -> Option<DateTime<Utc>> {
        let seconds = self.text("auth_date")?.parse::<i64>().ok()?;
        DateTime::from_timestamp(seconds, 0)
    }

    pub fn hash(&self) -> Option<&str> {
        self.text("hash")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchParams {
    pub init_data: InitData,
    pub version: String,
    pub platform: String,
    /// Raw JSON object of theme colors, decoded later by [`LaunchParams::theme_params`].
    pub theme_params: Option<String>,
    pub bot_inline: bool,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            init_data: InitData::default(),
            version: DEFAULT_VERSION.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            theme_params: None,
            bot_inline: false,
        }
    }
}

impl LaunchParams {
    /// Reads the host's launch query string. Unknown keys are ignored.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches(['#', '?']);
        Self::from_pairs(
            form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        )
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                INIT_DATA_KEY => params.init_data = InitData::parse(&value),
                VERSION_KEY if !value.is_empty() => params.version = value,
                PLATFORM_KEY if !value.is_empty() => params.platform = value,
                THEME_PARAMS_KEY => params.theme_params = Some(value),
                BOT_INLINE_KEY => params.bot_inline = value == "1",
                _ => {}
            }
        }
        params
    }

    pub fn init_data_raw(&self) -> &str {
        self.init_data.raw()
    }

    /// Decoded theme colors. Malformed JSON is logged and treated as absent.
    pub fn theme_params(&self) -> BTreeMap<String, String> {
        let Some(raw) = self.theme_params.as_deref() else {
            return BTreeMap::new();
        };
        match serde_json::from_str::<BTreeMap<String, Value>>(raw) {
            Ok(map) => map
                .into_iter()
                .filter_map(|(key, value)| match value {
                    Value::String(color) => Some((key, color)),
                    _ => None,
                })
                .collect(),
            Err(err) => {
                warn!("ignoring malformed theme params: {err}");
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/init_data_tests.rs"]
mod tests;
