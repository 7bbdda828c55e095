//! acorn-cli — socket frontend for the Acorn capture daemon.
//!
//! Speaks the daemon's IPC protocol (4-byte little-endian length prefix +
//! MessagePack) over the Unix socket. Stands in for the popup/options UI
//! surfaces during development and scripting.
//!
//! # Subcommands
//! - `ping`                      — check the daemon is alive
//! - `search <query>`            — semantic search over captured content
//! - `stats`                     — vector store statistics
//! - `delete <id>`               — remove the vector for an entity id
//! - `clear`                     — remove every stored vector
//! - `test`                      — embedding provider connectivity test
//! - `capture-mode <on|off>`     — toggle the shared capture-mode flag

use anyhow::{anyhow, Context};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use acorn_core::ipc::{AcornRequest, AcornResponse};
use acorn_core::RecordType;

const DEFAULT_SOCKET: &str = "/tmp/acorn.sock";
const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Parser)]
#[command(name = "acorn-cli", version, about = "Acorn capture daemon CLI")]
struct Cli {
    /// Daemon socket path (overrides ACORN_SOCKET env var)
    #[arg(long, env = "ACORN_SOCKET", default_value = DEFAULT_SOCKET)]
    socket: String,

    /// Print the raw JSON response instead of human output
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check the daemon is alive
    Ping,

    /// Semantic search over captured content
    Search {
        /// Query text to search for
        query: String,

        /// Maximum number of results to return
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,

        /// Restrict to one record type: tweet | inspiration
        #[arg(long)]
        kind: Option<String>,
    },

    /// Vector store statistics
    Stats,

    /// Remove the vector for an entity id
    Delete {
        id: String,
    },

    /// Remove every stored vector
    Clear,

    /// Embedding provider connectivity test
    Test,

    /// Toggle the shared capture-mode flag on every open page context
    CaptureMode {
        /// "on" or "off"
        state: String,

        /// Skip the broadcast to page contexts
        #[arg(long)]
        no_broadcast: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let request = build_request(&cli.command)?;
    let response = send_request(&cli.socket, &request).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    render(&cli.command, response)
}

fn build_request(command: &Commands) -> anyhow::Result<AcornRequest> {
    let request = match command {
        Commands::Ping => AcornRequest::Ping,
        Commands::Search { query, limit, kind } => {
            let record_type = kind
                .as_deref()
                .map(|k| {
                    k.parse::<RecordType>()
                        .map_err(|e| anyhow!("invalid --kind: {}", e))
                })
                .transpose()?;
            AcornRequest::Search {
                query: query.clone(),
                top_k: Some(*limit),
                record_type,
            }
        }
        Commands::Stats => AcornRequest::Stats,
        Commands::Delete { id } => AcornRequest::DeleteVector { id: id.clone() },
        Commands::Clear => AcornRequest::ClearVectors,
        Commands::Test => AcornRequest::TestEmbedding,
        Commands::CaptureMode {
            state,
            no_broadcast,
        } => {
            let enabled = match state.as_str() {
                "on" => true,
                "off" => false,
                other => return Err(anyhow!("expected 'on' or 'off', got '{}'", other)),
            };
            AcornRequest::SetCaptureMode {
                enabled,
                broadcast: !no_broadcast,
            }
        }
    };
    Ok(request)
}

async fn send_request(socket: &str, request: &AcornRequest) -> anyhow::Result<AcornResponse> {
    let stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("connecting to daemon at {}", socket))?;

    let codec = LengthDelimitedCodec::builder().little_endian().new_codec();
    let mut framed = Framed::new(stream, codec);

    let bytes = rmp_serde::to_vec_named(request)?;
    framed.send(Bytes::from(bytes)).await?;

    let frame = framed
        .next()
        .await
        .ok_or_else(|| anyhow!("daemon closed the connection without responding"))??;

    Ok(rmp_serde::from_slice(&frame)?)
}

fn render(command: &Commands, response: AcornResponse) -> anyhow::Result<()> {
    if !response.success {
        return Err(anyhow!(
            "daemon error: {}",
            response.error.unwrap_or_else(|| "unknown".to_string())
        ));
    }

    let data = response.data.unwrap_or(serde_json::Value::Null);
    match command {
        Commands::Ping => println!("daemon is up"),
        Commands::Search { .. } => {
            let results = data["results"].as_array().cloned().unwrap_or_default();
            if results.is_empty() {
                println!("no results");
                return Ok(());
            }
            for (rank, hit) in results.iter().enumerate() {
                let similarity = hit["similarity"].as_f64().unwrap_or(0.0);
                let id = hit["id"].as_str().unwrap_or("?");
                let kind = hit["record_type"].as_str().unwrap_or("?");
                let content = hit["content"].as_str().unwrap_or("");
                let snippet: String = content.chars().take(80).collect();
                println!("{:>2}. [{:.3}] {} ({})", rank + 1, similarity, id, kind);
                println!("      {}", snippet.replace('\n', " "));
            }
        }
        Commands::Stats => println!(
            "{} records ({} tweets, {} inspirations)",
            data["total"], data["tweets"], data["inspirations"]
        ),
        Commands::Delete { id } => println!("deleted vector for {}", id),
        Commands::Clear => println!("vector store cleared"),
        Commands::Test => println!(
            "{}",
            data["message"].as_str().unwrap_or("connection OK")
        ),
        Commands::CaptureMode { .. } => {
            println!("capture mode: {}", data["capture_mode"])
        }
    }
    Ok(())
}
