//! Rein remote — entry point.
//!
//! A line-oriented stand-in for the touch UI: each stdin line is one
//! trackpad or keyboard action, sent to the host over a session that
//! reconnects on its own.
//!
//! # Usage
//!
//! ```text
//! rein-remote [OPTIONS]
//!
//! Options:
//!   --host <HOST[:PORT]>  Rein host [env: REIN_HOST] [default: localhost:3000]
//!   --token <TOKEN>       Auth token; remembered for later runs [env: REIN_TOKEN]
//!   --tls                 Connect with wss://
//!   --no-store            Do not read or write the remembered token
//! ```
//!
//! Commands: `move DX DY`, `scroll DX DY`, `click [left|right|middle]`,
//! `key NAME`, `text TEXT`, `combo KEY...`, `swipe left|right|up|down`,
//! `mod`, `cancel`, `copy`, `paste [TEXT]`, `status`, `quit`.

use anyhow::{bail, Context};
use clap::Parser;
use rein_core::{MouseButton, SwipeDirection};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rein_remote::application::Trackpad;
use rein_remote::domain::RemoteConfig;
use rein_remote::infrastructure::{
    ConnectionHandle, ConnectionManager, FileTokenStore, MemoryTokenStore, TokenStore,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Rein remote: drive a Rein host's pointer and keyboard.
#[derive(Debug, Parser)]
#[command(name = "rein-remote", version)]
struct Cli {
    /// Host to connect to, as `host[:port]`.
    #[arg(long, env = "REIN_HOST", default_value = "localhost:3000")]
    host: String,

    /// Auth token printed by the host. Remembered for later runs.
    #[arg(long, env = "REIN_TOKEN")]
    token: Option<String>,

    /// Use `wss://`.
    #[arg(long)]
    tls: bool,

    /// Keep the token in memory only.
    #[arg(long)]
    no_store: bool,
}

impl Cli {
    fn remote_config(&self) -> RemoteConfig {
        let mut config = RemoteConfig::new(self.host.clone());
        config.secure = self.tls;
        config.url_token = self.token.clone();
        config
    }
}

// ── Command parsing ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum RemoteCommand {
    Move(f64, f64),
    Scroll(f64, f64),
    Click(MouseButton),
    Key(String),
    Text(String),
    Combo(Vec<String>),
    Swipe(SwipeDirection),
    ToggleModifier,
    CancelModifier,
    Copy,
    Paste(Option<String>),
    Status,
    Quit,
}

fn parse_f64(arg: Option<&str>, what: &str) -> anyhow::Result<f64> {
    let raw = arg.with_context(|| format!("missing {what}"))?;
    let value: f64 = raw.parse().with_context(|| format!("{what} must be a number, got {raw:?}"))?;
    if !value.is_finite() {
        bail!("{what} must be finite");
    }
    Ok(value)
}

fn parse_command(line: &str) -> anyhow::Result<RemoteCommand> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();
    let mut args = rest.split_whitespace();

    let command = match verb.to_ascii_lowercase().as_str() {
        "move" => RemoteCommand::Move(parse_f64(args.next(), "dx")?, parse_f64(args.next(), "dy")?),
        "scroll" => RemoteCommand::Scroll(parse_f64(args.next(), "dx")?, parse_f64(args.next(), "dy")?),
        "click" => RemoteCommand::Click(match args.next().unwrap_or("left") {
            "left" => MouseButton::Left,
            "right" => MouseButton::Right,
            "middle" => MouseButton::Middle,
            other => bail!("unknown button {other:?}"),
        }),
        "key" => match args.next() {
            Some(name) => RemoteCommand::Key(name.to_string()),
            None => bail!("key needs a name"),
        },
        "text" if !rest.is_empty() => RemoteCommand::Text(rest.to_string()),
        "text" => bail!("text needs something to type"),
        "combo" => {
            let keys: Vec<String> = args.map(str::to_string).collect();
            if keys.is_empty() {
                bail!("combo needs at least one key");
            }
            RemoteCommand::Combo(keys)
        }
        "swipe" => RemoteCommand::Swipe(match args.next() {
            Some("left") => SwipeDirection::Left,
            Some("right") => SwipeDirection::Right,
            Some("up") => SwipeDirection::Up,
            Some("down") => SwipeDirection::Down,
            other => bail!("swipe needs left, right, up or down, got {other:?}"),
        }),
        "mod" => RemoteCommand::ToggleModifier,
        "cancel" => RemoteCommand::CancelModifier,
        "copy" => RemoteCommand::Copy,
        "paste" => RemoteCommand::Paste((!rest.is_empty()).then(|| rest.to_string())),
        "status" => RemoteCommand::Status,
        "quit" | "exit" => RemoteCommand::Quit,
        "" => bail!("empty command"),
        other => bail!("unknown command {other:?}"),
    };
    Ok(command)
}

/// Applies one command. Returns `false` when the session should end.
fn apply(command: RemoteCommand, pad: &mut Trackpad, handle: &ConnectionHandle) -> bool {
    match command {
        RemoteCommand::Move(dx, dy) => pad.on_move(dx, dy),
        RemoteCommand::Scroll(dx, dy) => pad.on_scroll(dx, dy),
        RemoteCommand::Click(button) => {
            pad.click(button);
        }
        RemoteCommand::Key(name) => pad.send_key(&name),
        RemoteCommand::Text(text) => pad.send_text(&text),
        RemoteCommand::Combo(keys) => handle.send_combo(keys),
        RemoteCommand::Swipe(direction) => pad.swipe(direction),
        RemoteCommand::ToggleModifier => {
            let state = pad.toggle_modifier();
            println!("modifier: {state:?} {:?}", pad.staged_keys());
        }
        RemoteCommand::CancelModifier => pad.cancel_modifier(),
        RemoteCommand::Copy => pad.copy(),
        RemoteCommand::Paste(text) => pad.paste(text),
        RemoteCommand::Status => match handle.latency() {
            Some(ms) => println!("{:?}, latency {ms:.0} ms", handle.status()),
            None => println!("{:?}", handle.status()),
        },
        RemoteCommand::Quit => return false,
    }
    true
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store: Box<dyn TokenStore> = if cli.no_store {
        Box::new(MemoryTokenStore::new())
    } else {
        Box::new(FileTokenStore::in_config_dir().context("no place to remember the token")?)
    };

    let manager = ConnectionManager::start(cli.remote_config(), store.as_ref())?;
    let handle = manager.handle();

    let mut clipboard = handle.subscribe_clipboard();
    tokio::spawn(async move {
        while clipboard.changed().await.is_ok() {
            if let Some(text) = clipboard.borrow_and_update().clone() {
                println!("host clipboard: {text}");
            }
        }
    });

    let mut pad = Trackpad::new(std::sync::Arc::new(handle.clone()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::error!("failed to listen for Ctrl+C signal: {e}");
                }
                info!("received Ctrl+C; shutting down");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(command) => {
                if !apply(command, &mut pad, &handle) {
                    break;
                }
            }
            Err(e) => warn!("{e:#}"),
        }
    }

    manager.shutdown().await;
    info!("rein-remote stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["rein-remote"]);
        let config = cli.remote_config();
        assert_eq!(config.host, "localhost:3000");
        assert!(!config.secure);
        assert_eq!(config.url_token, None);
    }

    #[test]
    fn test_cli_token_and_tls() {
        let cli = Cli::parse_from(["rein-remote", "--host", "10.0.0.5:3000", "--token", "abc", "--tls"]);
        let config = cli.remote_config();
        assert_eq!(config.host, "10.0.0.5:3000");
        assert!(config.secure);
        assert_eq!(config.url_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_pointer_commands() {
        assert_eq!(parse_command("move 10 -4.5").unwrap(), RemoteCommand::Move(10.0, -4.5));
        assert_eq!(parse_command("scroll 0 3").unwrap(), RemoteCommand::Scroll(0.0, 3.0));
        assert_eq!(parse_command("click").unwrap(), RemoteCommand::Click(MouseButton::Left));
        assert_eq!(parse_command("CLICK right").unwrap(), RemoteCommand::Click(MouseButton::Right));
    }

    #[test]
    fn test_parse_text_keeps_inner_spacing() {
        assert_eq!(
            parse_command("text hello  world").unwrap(),
            RemoteCommand::Text("hello  world".into())
        );
    }

    #[test]
    fn test_parse_combo_and_swipe() {
        assert_eq!(
            parse_command("combo ctrl shift k").unwrap(),
            RemoteCommand::Combo(vec!["ctrl".into(), "shift".into(), "k".into()])
        );
        assert_eq!(parse_command("swipe up").unwrap(), RemoteCommand::Swipe(SwipeDirection::Up));
    }

    #[test]
    fn test_parse_clipboard_commands() {
        assert_eq!(parse_command("copy").unwrap(), RemoteCommand::Copy);
        assert_eq!(parse_command("paste").unwrap(), RemoteCommand::Paste(None));
        assert_eq!(parse_command("paste hi there").unwrap(), RemoteCommand::Paste(Some("hi there".into())));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for line in ["move 1", "move x 1", "move inf 0", "click thumb", "swipe sideways", "combo", "text", "key", "jump"] {
            assert!(parse_command(line).is_err(), "{line:?} must be rejected");
        }
    }
}
