use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kenkoo_server::analysis::model;
use kenkoo_server::config::Config;
use kenkoo_server::contact::LogNotifier;
use kenkoo_server::db::Stores;
use kenkoo_server::db_mongo::MongoStore;
use kenkoo_server::processing::TesseractCli;
use kenkoo_server::{AppState, create_app};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kenkoo_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.uses_default_secret() {
        tracing::warn!("JWT_SECRET not set, signing tokens with the default secret");
    }

    let stores = match &config.mongo_uri {
        Some(uri) => MongoStore::connect(uri, &config.mongo_db).await?.into_stores(),
        None => {
            tracing::warn!("MONGO_URI not set, records will be kept in memory only");
            Stores::in_memory()
        }
    };

    let text_model = model::from_config(&config.model).context("Failed to configure analysis model")?;
    let ocr = Arc::new(TesseractCli::new(&config.ocr.binary, &config.ocr.language));

    info!(
        "Uploads: dir={}, max={}MB | OCR: {} ({}) | Model timeout: {:?}",
        config.upload_dir.display(),
        config.max_upload_bytes / 1024 / 1024,
        config.ocr.binary,
        config.ocr.language,
        config.model.timeout
    );

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, stores, text_model, ocr, Arc::new(LogNotifier));
    let analysis = state.analysis.clone();
    let app = create_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server ready at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    analysis.counter().print_summary();
    info!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
