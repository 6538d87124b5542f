use std::{collections::HashMap, fs, io, path::Path};

use anyhow::{bail, Context};
use webapp_core::{init_data::InitData, LaunchParams};

pub const DEFAULT_CONFIG_FILE: &str = "host_sim.toml";
pub const ENV_PREFIX: &str = "HOST_SIM__";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub version: String,
    pub platform: String,
    /// JSON object of theme colors, as the host would pass it at launch.
    pub theme_params: Option<String>,
    /// Url-encoded init-data blob.
    pub init_data: String,
    pub bot_inline: bool,
    pub window_height: Option<f64>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "6.10".into(),
            platform: "host_sim".into(),
            theme_params: None,
            init_data: String::new(),
            bot_inline: false,
            window_height: None,
            log_level: "info".into(),
        }
    }
}

impl Settings {
    /// Sets one field from its flat string form. Unknown keys are ignored.
    pub fn apply(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "version" => self.version = value.to_string(),
            "platform" => self.platform = value.to_string(),
            "theme_params" => self.theme_params = non_empty(value),
            "init_data" => self.init_data = value.to_string(),
            "bot_inline" => {
                self.bot_inline = value
                    .parse()
                    .with_context(|| format!("bot_inline must be true or false, got '{value}'"))?
            }
            "window_height" => {
                self.window_height = match non_empty(value) {
                    Some(raw) => Some(raw.parse().with_context(|| {
                        format!("window_height must be a number, got '{raw}'")
                    })?),
                    None => None,
                }
            }
            "log_level" => self.log_level = value.to_string(),
            _ => {}
        }
        Ok(())
    }

    pub fn launch_params(&self) -> LaunchParams {
        LaunchParams {
            init_data: InitData::parse(&self.init_data),
            version: self.version.clone(),
            platform: self.platform.clone(),
            theme_params: self.theme_params.clone(),
            bot_inline: self.bot_inline,
        }
    }
}

/// Overrides given on the command line; `None` keeps the lower layers.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub version: Option<String>,
    pub platform: Option<String>,
    pub theme_params: Option<String>,
    pub init_data: Option<String>,
    pub bot_inline: bool,
    pub window_height: Option<f64>,
    pub log_level: Option<String>,
}

/// Defaults, then the config file, then `HOST_SIM__*` variables, then CLI flags.
pub fn load_settings(config_path: &Path, cli: &CliOverrides) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(config_path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", config_path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read '{}'", config_path.display()))
        }
    }

    apply_env(&mut settings, std::env::vars())?;
    apply_cli(&mut settings, cli);
    Ok(settings)
}

pub fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: HashMap<String, toml::Value> =
        toml::from_str(raw).context("config must be a flat table")?;

    for (key, value) in file_cfg {
        let value = match value {
            toml::Value::String(text) => text,
            toml::Value::Integer(number) => number.to_string(),
            toml::Value::Float(number) => number.to_string(),
            toml::Value::Boolean(flag) => flag.to_string(),
            other => bail!("config key '{key}' must be a scalar, got {}", other.type_str()),
        };
        settings.apply(&key, &value)?;
    }
    Ok(())
}

pub fn apply_env<I>(settings: &mut Settings, vars: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, value) in vars {
        if let Some(key) = name.strip_prefix(ENV_PREFIX) {
            settings
                .apply(&key.to_ascii_lowercase(), &value)
                .with_context(|| format!("invalid environment variable {name}"))?;
        }
    }
    Ok(())
}

pub fn apply_cli(settings: &mut Settings, cli: &CliOverrides) {
    if let Some(v) = &cli.version {
        settings.version = v.clone();
    }
    if let Some(v) = &cli.platform {
        settings.platform = v.clone();
    }
    if let Some(v) = &cli.theme_params {
        settings.theme_params = Some(v.clone());
    }
    if let Some(v) = &cli.init_data {
        settings.init_data = v.clone();
    }
    if cli.bot_inline {
        settings.bot_inline = true;
    }
    if let Some(v) = cli.window_height {
        settings.window_height = Some(v);
    }
    if let Some(v) = &cli.log_level {
        settings.log_level = v.clone();
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
