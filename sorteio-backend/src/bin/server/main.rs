use std::sync::Arc;

use sorteio_backend::error::AppError;
use sorteio_backend::{run_server, shutdown_signal, AppState};
use sorteio_config::get_config;
use sorteio_database::Store;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const DEFAULT_LOG_LEVEL: &str = "info";

fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_logging();

    let config = get_config()?;
    let store = if config.seed {
        Store::seeded()
    } else {
        Store::new()
    };
    let listener = TcpListener::bind(config.listen).await?;
    info!(url = %config.url, "starting raffle service");
    let state = Arc::new(AppState::new(config, store)?);

    run_server(state, listener, shutdown_signal()).await
}
