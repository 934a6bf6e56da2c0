use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use voting_common::{metrics, VotingError};
use voting_ledger::config::LedgerConfig;
use voting_ledger::network::LedgerNetwork;
use voting_ledger::Ledger;

/// Command line arguments for the ledger node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on (e.g., "127.0.0.1:8080")
    #[arg(short, long)]
    address: Option<String>,

    /// Owner secret key seed (32 bytes in hex format)
    #[arg(short, long)]
    seed: Option<String>,
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    metrics::render().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn run(args: Args) -> Result<(), VotingError> {
    let mut config = match &args.config {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.owner_public_key = None;
        config.owner_seed = Some(seed);
    }
    let owner = config.owner()?;
    let address = args
        .address
        .or(config.listen_address.clone())
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let ledger = Ledger::new(owner);
    let network = LedgerNetwork::new(ledger);
    let bound = network.listen(&address).await?;
    info!("Ledger for owner {} serving on {}", owner, bound);

    if let Some(metrics_address) = &config.metrics_address {
        let listener = TcpListener::bind(metrics_address)
            .await
            .map_err(|e| VotingError::NetworkError(e.to_string()))?;
        let app = Router::new().route("/metrics", get(metrics_handler));
        info!("Serving metrics on {}", metrics_address);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Metrics endpoint failed: {}", e);
            }
        });
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| VotingError::NetworkError(e.to_string()))?;
    info!("Shutting down");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("Ledger failed: {}", e);
        std::process::exit(1);
    }
}
