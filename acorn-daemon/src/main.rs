use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use acorn_core::{AcornConfig, VectorStore};
use acorn_daemon::server;
use acorn_daemon::state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "acorn.toml")]
    config: String,

    /// Open the store, print record counts, and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match AcornConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Open the vector store
    let store = match VectorStore::open(&config.database).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open vector store at {}: {}", config.database.path, e);
            std::process::exit(1);
        }
    };

    if args.health {
        match store.stats().await {
            Ok(stats) => println!(
                "Vector store OK: {} records ({} tweets, {} inspirations)",
                stats.total, stats.tweets, stats.inspirations
            ),
            Err(e) => {
                println!("Vector store check failed: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // IPC server
    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let socket_path = config.service.socket_path.clone();
    let state = AppState::new(store, config);

    server::run_unix_server(&socket_path, state, tx.subscribe()).await
}
