use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use log::info;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use learnserver::api_router::configure_api_routes;
use learnserver::config::AppConfig;
use learnserver::llm::OpenAiClient;
use learnserver::shared::state::AppState;
use learnserver::store::DocumentStore;

// Lesson videos dominate upload size.
const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    config.ensure_directories()?;

    let store = DocumentStore::open(config.storage.database_path()).await?;
    let llm = OpenAiClient::new(&config.llm);
    let state = Arc::new(AppState {
        store: Arc::new(store),
        llm: Arc::new(llm),
        config: config.clone(),
    });

    let app = configure_api_routes()
        .nest_service("/uploads", ServeDir::new(&config.storage.uploads_dir))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("could not install shutdown handler: {}", e);
        return;
    }
    info!("shutdown signal received");
}
