//! Hi-Lo display for the terminal.
//!
//! Connects to a host, prints every round it receives, and reads player
//! commands from stdin.

use std::time::Duration;

use anyhow::{Context, Error};
use hilo::Command;
use hilo_display::{
    ConfigOverrides, DisplayClient, DisplayConfig, StatusClient,
    commands::{COMMANDS_HELP, Input, ParseError, parse_command},
    input::stdin_lines,
    render::Render,
};
use pico_args::Arguments;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
Show a Hi-Lo table and send it commands

USAGE:
  hilo_display [OPTIONS]

OPTIONS:
  --host       HOST      Host name or address   [default: env HILO_HOST or 127.0.0.1]
  --port       PORT      Host port              [default: env HILO_PORT or 8080]
  --table      N         Table id sent in HELLO [default: env HILO_TABLE_ID or 1]
  --device-id  ID        Device id sent in HELLO [default: env HILO_DEVICE_ID or random]

FLAGS:
  --no-reconnect         Exit instead of reconnecting when the connection drops
  --poll                 Poll /status over HTTP instead of opening a WebSocket
  -h, --help             Print help information

ENVIRONMENT:
  RUST_LOG               Log filter (logs go to stderr) [default: warn]
  (A .env file in the working directory is loaded first)
";

/// How often `--poll` mode fetches `/status`.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

type InputLines = mpsc::Receiver<String>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = ConfigOverrides {
        host: pargs.opt_value_from_str("--host")?,
        port: pargs.opt_value_from_str("--port")?,
        table_id: pargs.opt_value_from_str("--table")?,
        device_id: pargs.opt_value_from_str("--device-id")?,
        no_reconnect: pargs.contains("--no-reconnect"),
    };
    let poll = pargs.contains("--poll");

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {remaining:?}\n\n{HELP}");
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = DisplayConfig::from_env(overrides).context("Invalid configuration")?;
    config.validate().context("Invalid configuration")?;

    // Catching signals for exit.
    let (quit_tx, quit_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = quit_tx.send(true);
    })?;

    let lines = stdin_lines();
    print!("{COMMANDS_HELP}");

    if poll {
        run_poll(&config, lines, quit_rx).await
    } else {
        run_live(&config, lines, quit_rx).await
    }
}

/// Resolves once Ctrl+C has been pressed.
async fn quit_requested(quit: &mut watch::Receiver<bool>) {
    if quit.wait_for(|pressed| *pressed).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// What to do with one line of input.
enum Step {
    Send(Command),
    Quit,
    Skip,
}

fn handle_line(line: &str) -> Step {
    match parse_command(line) {
        Ok(Input::Command(cmd)) => Step::Send(cmd),
        Ok(Input::Quit) => Step::Quit,
        Ok(Input::Help) => {
            print!("{COMMANDS_HELP}");
            Step::Skip
        }
        Err(ParseError::Empty) => Step::Skip,
        Err(e) => {
            println!("{e}");
            Step::Skip
        }
    }
}

async fn run_live(
    config: &DisplayConfig,
    mut lines: InputLines,
    mut quit: watch::Receiver<bool>,
) -> Result<(), Error> {
    println!("Connecting to {}...", config.ws_url());
    let client = DisplayClient::start(config);

    let mut states = client.subscribe();
    let printer = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let snapshot = states.borrow_and_update().clone();
            if let Some(state) = snapshot {
                println!("{}", Render(&state));
            }
        }
    });

    let mut connected = client.connected();
    let watcher = tokio::spawn(async move {
        while connected.changed().await.is_ok() {
            let up = *connected.borrow_and_update();
            println!("{}", if up { "[connected]" } else { "[disconnected]" });
        }
    });

    loop {
        let line = tokio::select! {
            line = lines.recv() => line,
            _ = quit_requested(&mut quit) => None,
        };
        let Some(line) = line else { break };
        match handle_line(&line) {
            Step::Send(cmd) => {
                if !client.send(cmd) {
                    println!("Not connected; command dropped");
                }
            }
            Step::Quit => break,
            Step::Skip => {}
        }
    }

    client.stop().await;
    printer.abort();
    watcher.abort();
    println!("\nDisconnected from host.");
    Ok(())
}

async fn run_poll(
    config: &DisplayConfig,
    mut lines: InputLines,
    mut quit: watch::Receiver<bool>,
) -> Result<(), Error> {
    let client = StatusClient::new(config.http_url());
    println!("Polling {}/status every {}ms", config.http_url(), POLL_INTERVAL.as_millis());

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => match client.status().await {
                Ok(state) if last.as_ref() != Some(&state) => {
                    println!("{}", Render(&state));
                    last = Some(state);
                }
                Ok(_) => {}
                Err(e) => println!("{e:#}"),
            },
            line = lines.recv() => {
                let Some(line) = line else { break };
                match handle_line(&line) {
                    Step::Send(cmd) => match client.command(&cmd).await {
                        Ok(state) => {
                            println!("{}", Render(&state));
                            last = Some(state);
                        }
                        Err(e) => println!("{e:#}"),
                    },
                    Step::Quit => break,
                    Step::Skip => {}
                }
            }
            _ = quit_requested(&mut quit) => break,
        }
    }
    Ok(())
}
