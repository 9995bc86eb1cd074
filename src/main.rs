use anyhow::Context;
use peer_overlay::config::{CONFIG_ENV, PeerConfig};
use peer_overlay::node::PeerNode;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const STATS_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
    let mut skip_bootstrap = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--no-bootstrap" => {
                skip_bootstrap = true;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(config_path) = config_path else {
        eprintln!("Usage: {} --config <path> [--no-bootstrap]", args[0]);
        eprintln!("       (or set {}=<path>)", CONFIG_ENV);
        eprintln!("Example: {} --config configs/peer1.json", args[0]);
        std::process::exit(1);
    };

    let config = PeerConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .init();

    tracing::info!("Starting peer {} at {}", config.name, config.self_url);
    if config.friends.is_empty() {
        tracing::info!("No friends configured, waiting for others to register");
    } else {
        tracing::info!("Friends: {:?}", config.friends);
    }

    let bind_addr = config.bind_addr;
    let node = PeerNode::from_config(config)?;

    // 1. Health monitor:
    node.monitor.start();

    // 2. Stats reporter:
    let reporter = node.spawn_stats_reporter(STATS_INTERVAL);

    // 3. HTTP server:
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("HTTP server listening on {}", bind_addr);

    // 4. Bootstrap once the listener accepts connections, so friends can probe us back:
    if !skip_bootstrap {
        let bootstrap_node = node.clone();
        tokio::spawn(async move {
            bootstrap_node.bootstrap().await;
        });
    }

    tracing::info!("Press Ctrl+C to shutdown");
    axum::serve(
        listener,
        node.router()
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    node.monitor.stop().await;
    reporter.abort();
    tracing::info!("Peer {} stopped", node.config.name);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
