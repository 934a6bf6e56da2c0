use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use voting_client::config::ClientConfig;
use voting_client::rest_api::router;
use voting_client::{LedgerConnection, VotingClient};
use voting_common::{Crypto, VotingError};

// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: String,

    /// Secret key seed (32 bytes in hex format), overrides the config file
    #[arg(short, long)]
    seed: Option<String>,

    /// Address for the REST API, overrides the config file
    #[arg(short, long)]
    rest_address: Option<String>,
}

async fn run(args: Args) -> Result<(), VotingError> {
    let config = ClientConfig::load(&args.config)?;

    let crypto = match args.seed.or(config.seed) {
        Some(seed) => Crypto::from_hex_seed(&seed)?,
        None => {
            let crypto = Crypto::generate();
            info!("No seed configured, generated identity {}", crypto.identity());
            crypto
        }
    };

    let connection = LedgerConnection::connect(&config.ledger_url).await?;
    let client = Arc::new(VotingClient::new(Arc::new(connection), crypto));
    info!("Acting as {}", client.identity());

    let rest_address = args.rest_address.unwrap_or(config.rest_address);
    let listener = TcpListener::bind(&rest_address)
        .await
        .map_err(|e| VotingError::NetworkError(e.to_string()))?;
    info!("Starting REST API on {}", rest_address);
    axum::serve(listener, router(client))
        .await
        .map_err(|e| VotingError::NetworkError(e.to_string()))
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
        error!("Client failed: {}", e);
        std::process::exit(1);
    }
}
