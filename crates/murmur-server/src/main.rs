mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use murmur_api::intake::BlobIntake;
use murmur_api::recorder::VoiceRecorder;
use murmur_api::transcription::{TRANSCRIPTION_MODEL, WhisperClient};
use murmur_api::{AppState, AppStateInner};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug,murmur_api=debug,murmur_db=info,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Init database and transient upload storage
    let db = Arc::new(murmur_db::Database::open(&config.db_path)?);
    let intake = BlobIntake::new(config.upload_dir.clone()).await?;

    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; voice notes will be stored with a failed transcription");
    }
    let transcriber = Arc::new(WhisperClient::new(
        config.transcription_url.clone(),
        config.openai_api_key.clone(),
    ));
    info!("Transcribing with {} at {}", TRANSCRIPTION_MODEL, config.transcription_url);

    let state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        recorder: VoiceRecorder::new(db, intake, transcriber),
        max_upload_bytes: config.max_upload_bytes,
    });

    let app = murmur_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr()?;
    info!("Murmur server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
