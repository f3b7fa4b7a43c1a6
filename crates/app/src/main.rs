use anyhow::Context;
use app::config::{Args, StorageTarget, prepare_sqlite_file};
use app::{AppState, build_router};
use clap::Parser;
use services::{AppServices, Clock};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "app=info,services=info,storage=info,tower_http=info";

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        ratio_convention = %args.ratio_convention,
        shuffle_items = args.shuffle_items,
        "starting asr-qa"
    );

    let clock = Clock::system();
    let settings = args.service_settings();
    let services = match args.storage_target()? {
        StorageTarget::InMemory => {
            info!("using in-memory storage; results are lost on exit");
            AppServices::new_in_memory(clock, settings)
                .context("failed to initialise services")?
        }
        StorageTarget::Sqlite(db_url) => {
            prepare_sqlite_file(&db_url)
                .with_context(|| format!("failed to prepare database file for {db_url}"))?;
            AppServices::new_sqlite(&db_url, clock, settings)
                .await
                .with_context(|| format!("failed to open {db_url}"))?
        }
    };
    if !services.transcription_enabled() {
        tracing::warn!("QA_STT_API_KEY is not set; every attempt will fail transcription");
    }

    let app = build_router(AppState::new(services));
    let addr = args.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
