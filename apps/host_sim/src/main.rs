use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{self, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use webapp_core::{AppEventKind, WebApp, WindowMetrics};

mod config;
mod script;
mod transport;

use config::{load_settings, CliOverrides, DEFAULT_CONFIG_FILE};
use transport::JsonLinesTransport;

/// Plays the host side of the mini-app bridge from a JSON-lines script.
/// Host-bound posts are printed to stdout, logs go to stderr.
#[derive(Parser, Debug)]
struct Args {
    /// Script to play; reads stdin when omitted.
    script: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long)]
    version: Option<String>,
    #[arg(long)]
    platform: Option<String>,
    /// Theme colors as a JSON object.
    #[arg(long)]
    theme_params: Option<String>,
    /// Url-encoded init-data blob.
    #[arg(long)]
    init_data: Option<String>,
    #[arg(long)]
    bot_inline: bool,
    #[arg(long)]
    window_height: Option<f64>,
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            version: self.version.clone(),
            platform: self.platform.clone(),
            theme_params: self.theme_params.clone(),
            init_data: self.init_data.clone(),
            bot_inline: self.bot_inline,
            window_height: self.window_height,
            log_level: self.log_level.clone(),
        }
    }
}

struct SimulatedWindow(f64);

impl WindowMetrics for SimulatedWindow {
    fn inner_height(&self) -> f64 {
        self.0
    }
}

const LOGGED_EVENTS: [AppEventKind; 10] = [
    AppEventKind::ThemeChanged,
    AppEventKind::ViewportChanged,
    AppEventKind::MainButtonClicked,
    AppEventKind::BackButtonClicked,
    AppEventKind::SettingsButtonClicked,
    AppEventKind::InvoiceClosed,
    AppEventKind::PopupClosed,
    AppEventKind::QrTextReceived,
    AppEventKind::ScanQrPopupClosed,
    AppEventKind::ClipboardTextReceived,
];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = load_settings(&args.config, &args.overrides())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let window = settings
        .window_height
        .map(|height| Arc::new(SimulatedWindow(height)) as Arc<dyn WindowMetrics>);
    let app = WebApp::new(
        settings.launch_params(),
        Arc::new(JsonLinesTransport::stdout()),
        window,
    );
    for kind in LOGGED_EVENTS {
        app.on_event(kind, |event| info!(?event, "app event"));
    }

    let stats = match &args.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open script '{}'", path.display()))?;
            script::run_script(&app, BufReader::new(file)).await?
        }
        None => script::run_script(&app, BufReader::new(io::stdin())).await?,
    };

    info!(
        host_events = stats.host_events,
        actions = stats.actions,
        failed_actions = stats.failed_actions,
        skipped = stats.skipped,
        pending_requests = app.pending_request_count(),
        "script finished"
    );
    Ok(())
}
