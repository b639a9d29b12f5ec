use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hash_bridge::{
    net::rpc::RpcClient,
    query::QueryService,
    server::{BridgeRpc, start_server},
    store::DiskStore,
    sync::{SyncConfig, SyncState, Synchronizer},
};
use tokio::{signal, sync::watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Database filename inside the data directory.
const STORE_FILENAME: &str = "bridge.redb";

#[derive(Parser, Debug)]
#[command(name = "hash-bridge")]
#[command(about = "Serves canonical block hashes on top of a natively linked execution layer", long_about = None)]
struct Args {
    /// JSON-RPC endpoint of the upstream node
    #[arg(long, env = "BRIDGE_UPSTREAM_URL", default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Directory holding the translation store
    #[arg(long, env = "BRIDGE_DATADIR", default_value = "./data")]
    datadir: PathBuf,

    /// Address the JSON-RPC server binds to
    #[arg(long, env = "BRIDGE_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Seconds between polls for a new block once caught up
    #[arg(long, env = "BRIDGE_POLL_INTERVAL_SECS", default_value_t = 4)]
    poll_interval_secs: u64,

    /// Timeout for each upstream request, in seconds
    #[arg(long, env = "BRIDGE_RPC_TIMEOUT_SECS", default_value_t = 10)]
    rpc_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Upstream endpoint: {}", args.rpc_url);
    info!("Data directory: {}", args.datadir.display());

    std::fs::create_dir_all(&args.datadir)?;
    let store = Arc::new(DiskStore::open(args.datadir.join(STORE_FILENAME))?);
    let client = Arc::new(RpcClient::new(
        &args.rpc_url,
        Duration::from_secs(args.rpc_timeout_secs),
    )?);
    let state = Arc::new(SyncState::new());

    let rpc = BridgeRpc::new(
        QueryService::new(Arc::clone(&client), Arc::clone(&store)),
        Arc::clone(&state),
    );
    let (_, server) = start_server(args.listen, rpc).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let synchronizer = Synchronizer::new(
        client,
        Arc::clone(&store),
        state,
        SyncConfig {
            poll_interval: Duration::from_secs(args.poll_interval_secs),
        },
    );
    let mut sync_task = tokio::spawn(synchronizer.run(shutdown_rx));

    let finished = tokio::select! {
        res = &mut sync_task => Some(res),
        _ = server.clone().stopped() => {
            info!("RPC server has stopped.");
            None
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received.");
            None
        }
    };

    let sync_result = match finished {
        Some(res) => res,
        None => {
            let _ = shutdown_tx.send(true);
            sync_task.await
        }
    };

    let _ = server.stop();
    server.stopped().await;

    match Arc::try_unwrap(store) {
        Ok(store) => {
            drop(store);
            info!("Translation store closed.");
        }
        Err(_) => warn!("Translation store still referenced at exit"),
    }

    match sync_result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Synchronizer failed: {e}");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
