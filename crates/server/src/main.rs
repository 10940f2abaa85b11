use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tilawah_core::{
    load_config, validate_config, AccountStore, Aligner, Database, FfmpegTranscoder,
    LafzizeClient, RecitationStore, SqliteAccountStore, SqliteRecitationStore, Transcoder,
};
use tilawah_server::api::create_router;
use tilawah_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("tilawah {}", VERSION);

    // Determine config path
    let config_path = std::env::var("TILAWAH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Uploads directory: {:?}", config.storage.uploads_dir());
    if config.auth.disable_csrf_checks {
        warn!("CSRF checks are disabled");
    }

    let db = Arc::new(
        Database::open(&config.database.path).context("Failed to open database")?,
    );
    let accounts: Arc<dyn AccountStore> = Arc::new(SqliteAccountStore::new(Arc::clone(&db)));
    let recitations: Arc<dyn RecitationStore> =
        Arc::new(SqliteRecitationStore::new(Arc::clone(&db)));
    info!("Database initialized");

    let transcoder: Arc<dyn Transcoder> =
        Arc::new(FfmpegTranscoder::new(config.transcoder.ffmpeg_path.clone()));
    let aligner: Arc<dyn Aligner> = Arc::new(LafzizeClient::new(config.lafzize.endpoint.clone()));
    info!(
        endpoint = %config.lafzize.endpoint,
        on_failure = ?config.lafzize.on_failure,
        "Lafzize client initialized"
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        accounts,
        recitations,
        transcoder,
        aligner,
    ));

    if config.lafzize.recover_on_startup {
        let recovered = state
            .lafzize()
            .recover_orphaned()
            .await
            .context("Failed to recover interrupted lafzize jobs")?;
        info!(count = recovered.len(), "Recovered interrupted lafzize jobs");
    }

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
