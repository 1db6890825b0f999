//! Rein host — entry point.
//!
//! Listens for one remote at a time and replays its input on this machine.
//!
//! # Usage
//!
//! ```text
//! rein-host [OPTIONS]
//!
//! Options:
//!   --config <PATH>      Config file [default: platform config dir / host.toml]
//!   --bind <IP>          Listener address
//!   --port <PORT>        Listener port
//!   --token <TOKEN>      Required remote token
//!   --no-auth            Accept remotes without a token
//!   --invert-scroll      Flip scroll direction
//!   --dry-run            Log input instead of injecting it
//!   --save               Write the effective settings back to the config file
//! ```
//!
//! Flags override the config file. When no token is configured and
//! `--no-auth` is not given, a random token is generated for this run and
//! printed in the connect URL.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use rein_core::HostPlatform;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use rein_host::application::{ClipboardBridge, InputBackend, InputDispatcher};
use rein_host::infrastructure::clipboard::MemoryClipboard;
use rein_host::infrastructure::input_backend::RecordingBackend;
use rein_host::infrastructure::storage::config::{self, AppConfig};
use rein_host::infrastructure::HostServer;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Rein host: turns a phone into this computer's trackpad and keyboard.
#[derive(Debug, Parser)]
#[command(name = "rein-host", version)]
struct Cli {
    /// Config file to read (and write with `--save`).
    #[arg(long, env = "REIN_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the listener to.
    #[arg(long, env = "REIN_BIND")]
    bind: Option<String>,

    /// TCP port for the WebSocket listener.
    #[arg(long, env = "REIN_PORT")]
    port: Option<u16>,

    /// Token remotes must present as `?token=`.
    #[arg(long, env = "REIN_TOKEN", conflicts_with = "no_auth")]
    token: Option<String>,

    /// Accept any remote without a token.
    #[arg(long)]
    no_auth: bool,

    /// Flip the direction of both scroll axes.
    #[arg(long, env = "REIN_INVERT_SCROLL")]
    invert_scroll: bool,

    /// Log input instead of injecting it.
    #[arg(long)]
    dry_run: bool,

    /// Write the effective settings back to the config file.
    #[arg(long)]
    save: bool,
}

impl Cli {
    /// Applies the command-line overrides to `file`.
    fn merge_into(&self, mut file: AppConfig) -> AppConfig {
        if let Some(bind) = &self.bind {
            file.server.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            file.server.port = port;
        }
        if let Some(token) = &self.token {
            file.server.auth_token = Some(token.clone());
        }
        if self.no_auth {
            file.server.auth_token = None;
        }
        if self.invert_scroll {
            file.input.invert_scroll = true;
        }
        file
    }
}

fn build_backend(dry_run: bool) -> anyhow::Result<Arc<dyn InputBackend>> {
    if dry_run {
        info!("dry run: input is logged at debug level, not injected");
        return Ok(Arc::new(RecordingBackend::new()));
    }

    #[cfg(feature = "native")]
    {
        let backend = rein_host::infrastructure::input_backend::EnigoBackend::new()
            .context("failed to initialise OS input backend")?;
        Ok(Arc::new(backend))
    }

    #[cfg(not(feature = "native"))]
    {
        warn!("built without the `native` feature; input will only be logged");
        Ok(Arc::new(RecordingBackend::new()))
    }
}

/// Picks the clipboard for copy/paste messages. `None` makes the dispatcher
/// drop them with a diagnostic.
fn build_clipboard(dry_run: bool) -> Option<Arc<dyn ClipboardBridge>> {
    if dry_run {
        return Some(Arc::new(MemoryClipboard::new()));
    }

    #[cfg(feature = "native")]
    {
        match rein_host::infrastructure::clipboard::SystemClipboard::new() {
            Ok(clipboard) => Some(Arc::new(clipboard)),
            Err(e) => {
                warn!("{e}; clipboard messages will be ignored");
                None
            }
        }
    }

    #[cfg(not(feature = "native"))]
    {
        warn!("built without the `native` feature; clipboard messages will be ignored");
        None
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::config_file_path().context("no config file location")?,
    };
    let file_config = config::load_config_from(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&file_config.logging.level)),
        )
        .init();

    let mut app_config = cli.merge_into(file_config);
    if app_config.server.auth_token.is_none() && !cli.no_auth {
        app_config.server.auth_token = Some(Uuid::new_v4().simple().to_string());
        info!("generated a token for this run");
    }

    if cli.save {
        config::save_config_to(&config_path, &app_config)
            .with_context(|| format!("failed to save {}", config_path.display()))?;
        info!("settings saved to {}", config_path.display());
    }

    let host_config = app_config.to_host_config()?;
    let platform = HostPlatform::current();
    let mut dispatcher =
        InputDispatcher::new(build_backend(cli.dry_run)?, platform, host_config.invert_scroll);
    if let Some(clipboard) = build_clipboard(cli.dry_run) {
        dispatcher = dispatcher.with_clipboard(clipboard);
    }

    let server = HostServer::bind(host_config.clone(), dispatcher).await?;
    let local_addr = server.local_addr()?;
    match &host_config.auth_token {
        Some(token) => info!("connect a remote to ws://{local_addr}/ws?token={token}"),
        None => warn!("authentication disabled; connect a remote to ws://{local_addr}/ws"),
    }
    info!("host platform: {platform}");

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    server.run(running).await?;

    info!("rein-host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
