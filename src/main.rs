//! OCR Search - page-relative highlight boxes for IIIF image viewers.

mod config;
mod content;
mod error;
mod highlight;
mod routes;
mod search;
mod solr;

use config::Settings;
use content::ContentStore;
use routes::AppState;
use search::OcrSearch;
use solr::SolrClient;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_search=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    match settings.index.selection() {
        Some((index, field)) => info!("OCR search on index {} field {}", index, field),
        None => warn!("SOLR_OCR_INDEX or SOLR_OCR_FIELD not set, searches will return no matches"),
    }

    let content = ContentStore::load_from_file(&settings.content_tree_path)?;

    let backend = SolrClient::new(reqwest::Client::new(), settings.solr_url.clone());
    info!("Solr backend at {}", settings.solr_url);

    let search = OcrSearch::new(
        Arc::new(backend),
        settings.index.clone(),
        settings.limit,
        settings.concurrency,
    );

    let state = AppState {
        search: Arc::new(search),
        content: Arc::new(content),
    };
    let app = routes::router(state);

    // Run server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
