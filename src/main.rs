use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gaconnect::api::{self, AppState};
use gaconnect::config::Config;
use gaconnect::connect::HttpTitleFetcher;
use gaconnect::google::{RestClient, RESOURCE_OWNER};
use gaconnect::session::SessionStore;
use gaconnect::storage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gaconnect=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let storage = storage::open(&config.database).await?;
    info!("Database initialized successfully");

    if let (Some(client_id), Some(client_secret)) =
        (&config.google.client_id, &config.google.client_secret)
    {
        let application = storage
            .upsert_application(RESOURCE_OWNER, client_id, client_secret)
            .await?;
        info!(application_id = application.id, "Registered Google application from environment");
    }

    let gateway = Arc::new(RestClient::new(&config.google)?);
    let titles = Arc::new(HttpTitleFetcher::new(Duration::from_secs(
        config.google.timeout_secs,
    ))?);
    let sessions = Arc::new(SessionStore::new(&config.session));

    let state = AppState::new(
        Arc::clone(&storage),
        sessions,
        &config.google,
        gateway,
        titles,
    )?;
    let router = api::create_api_router(Arc::new(state));

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);
    info!("   - Start connecting at http://{}/channels/google-analytics/create", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
