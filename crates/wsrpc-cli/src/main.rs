//! `wsrpc` command-line client.
//!
//! Connects, waits for the handshake, runs one command, and closes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::sync::mpsc;
use wsrpc_client::push::channel_handler;
use wsrpc_client::{Client, PushEvent, Query};
use wsrpc_core::logging::init_subscriber;
use wsrpc_settings::{load_settings, load_settings_from_path};

#[derive(Parser, Debug)]
#[command(name = "wsrpc", about = "Talk to a JSON-RPC server over WebSocket")]
struct Cli {
    /// Connection URL, e.g. `ws://root:root@localhost:8000/ns/db`.
    url: String,

    /// Settings file (defaults to `$WSRPC_SETTINGS`, then `~/.wsrpc/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter, overriding `logLevel` from settings.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query and print one result per statement.
    Query {
        /// Statement text.
        sql: String,

        /// Variable binding as `NAME=JSON`. Repeatable.
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, Value)>,
    },

    /// Call a method and print its result.
    Call {
        /// Method name.
        method: String,

        /// Positional parameters, each parsed as JSON or taken as a string.
        params: Vec<String>,
    },

    /// Print push events until interrupted.
    Live {
        /// Only events for this live query id.
        #[arg(long)]
        id: Option<String>,
    },
}

/// Parse an argument as JSON, keeping anything unparsable as a string.
fn json_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_var(raw: &str) -> std::result::Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=JSON, got {raw:?}"))?;
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        return Err("variable name is empty".to_string());
    }
    Ok((name.to_string(), json_arg(value)))
}

async fn run(client: &Client, command: Command) -> Result<()> {
    match command {
        Command::Query { sql, vars } => {
            let query = vars
                .into_iter()
                .fold(Query::new(sql), |q, (name, value)| q.bind(name, value));
            let responses = client.query(query).await?;
            println!("{}", serde_json::to_string_pretty(&responses)?);
            responses.into_iter().try_for_each(|r| r.ok().map(drop))?;
        }
        Command::Call { method, params } => {
            let params = params.iter().map(String::as_str).map(json_arg).collect();
            let result = client.call(method, params).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Live { id } => {
            let (handler, events) = match id {
                Some(id) => {
                    let (handler, events) = channel_handler();
                    let _ = client.on_live_id(id, std::sync::Arc::clone(&handler));
                    (handler, events)
                }
                None => client.live_channel(),
            };
            print_events(events).await?;
            let _ = client.off_live(&handler);
        }
    }
    Ok(())
}

async fn print_events(mut events: mpsc::UnboundedReceiver<PushEvent>) -> Result<()> {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => println!("{}", serde_json::to_string(&event)?),
                None => return Ok(()),
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = match &args.settings {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("failed to load settings")?;

    let _ = init_subscriber(args.log_level.as_deref().unwrap_or(&settings.log_level));
    tracing::debug!(url = %args.url, "connecting");

    let client = Client::connect(&args.url, &settings)
        .await
        .context("failed to connect")?;
    client.ready().await.context("handshake failed")?;

    let outcome = run(&client, args.command).await;
    client.close().await;
    outcome
}
