// crates/trellis-daemon/src/main.rs
//
// Binary entrypoint for the Trellis daemon.
//
// Initializes tracing, parses CLI arguments, loads configuration, opens the
// trust graph, spawns the publication scheduler and serves the command
// protocol until Ctrl-C.

mod config;

use std::sync::Arc;

use clap::Parser;
use config::DaemonConfig;

use trellis_core::traits::{ContentNetwork, GraphPersistence};
use trellis_graph::TrustGraph;
use trellis_publish::{shutdown_channel, Fetcher, PublicationScheduler};
use trellis_reputation::ScoreEngine;
use trellis_rpc::TrellisRpcServer;
use trellis_store::{InMemoryNetwork, IpfsClient, MemoryStore, RocksStore};

/// Trellis daemon: web-of-trust store, scorer and identity publisher.
#[derive(Parser, Debug)]
#[command(name = "trellis-daemon", version = "0.1.0", about = "Trellis web-of-trust node daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.trellis/config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config_path = expand_tilde(&args.config);

    // The log level comes from the config, so read it before logging starts.
    let loaded = DaemonConfig::load(&config_path);
    let log_level = loaded
        .as_ref()
        .map(|cfg| cfg.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    let daemon_config = match loaded {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", config_path);
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                config_path,
                e
            );
            DaemonConfig::default()
        }
    };

    tracing::info!("Trellis Daemon v0.1.0");
    tracing::info!("Data directory: {}", daemon_config.data_dir);
    tracing::info!(
        "RPC endpoint: {}:{}",
        daemon_config.rpc_host,
        daemon_config.rpc_port
    );
    tracing::info!("Network: {}", daemon_config.network);

    // ---------------------------------------------------------------
    // Persistence and network collaborators.
    // ---------------------------------------------------------------
    let (persistence, network): (Arc<dyn GraphPersistence>, Arc<dyn ContentNetwork>) =
        match daemon_config.network.as_str() {
            "ipfs" => {
                let data_dir = expand_tilde(&daemon_config.data_dir);
                std::fs::create_dir_all(&data_dir)?;
                let db_path = format!("{}/graph_rocksdb", data_dir);
                let store = RocksStore::open(&db_path)?;
                tracing::info!("Graph store opened at {}", db_path);
                (
                    Arc::new(store),
                    Arc::new(IpfsClient::new(&daemon_config.ipfs_api_url)),
                )
            }
            "memory" => {
                tracing::warn!("Running in memory: nothing survives a restart");
                (Arc::new(MemoryStore::new()), Arc::new(InMemoryNetwork::new()))
            }
            other => {
                tracing::error!("Unknown network: {}. Use 'ipfs' or 'memory'.", other);
                return Err(format!("Unknown network: {}", other).into());
            }
        };

    // ---------------------------------------------------------------
    // Trust graph.
    // ---------------------------------------------------------------
    let engine = ScoreEngine::new(daemon_config.score())?;
    let graph = Arc::new(TrustGraph::open(persistence, engine)?);
    let own_count = graph.own_identities()?.len();
    tracing::info!("Trust graph loaded with {} own identities", own_count);

    // ---------------------------------------------------------------
    // Background publication and the command server.
    // ---------------------------------------------------------------
    let (trigger, shutdown) = shutdown_channel();

    let scheduler =
        PublicationScheduler::new(graph.clone(), network.clone(), daemon_config.schedule());
    let scheduler_shutdown = shutdown.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    let fetcher = Arc::new(Fetcher::new(graph.clone(), network));
    let rpc_server = TrellisRpcServer::new(daemon_config.rpc(), graph).with_fetcher(fetcher);
    let rpc_handle = tokio::spawn(async move {
        if let Err(e) = rpc_server.start_with_shutdown(shutdown).await {
            tracing::error!("RPC server error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl-C, shutting down");
    trigger.trigger();

    let _ = scheduler_handle.await;
    let _ = rpc_handle.await;
    tracing::info!("Trellis daemon shut down gracefully");

    Ok(())
}

/// Expand a leading `~/` to the home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
