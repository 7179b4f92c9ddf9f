use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use glidepath::store::{InMemoryStore, JsonlStore, ProjectionStore};

#[derive(Parser, Debug)]
#[command(
    name = "glidepath",
    about = "Monte Carlo retirement projection service (regime-switching returns + de-risking glidepath)"
)]
struct Cli {
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(
        long,
        help = "Append completed projection rows to this JSONL file; kept in memory when omitted"
    )]
    store: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let store: Arc<dyn ProjectionStore> = match cli.store {
        Some(path) => match JsonlStore::open(&path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        },
        None => Arc::new(InMemoryStore::new()),
    };

    if let Err(e) = glidepath::api::run_http_server(cli.port, store).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}
