use std::sync::Arc;
use sth_comet::config::{AppConfig, StoreBackend};
use sth_comet::logic::QueryService;
use sth_comet::seed;
use sth_comet::store::{MemoryStore, PostgresStore};
use sth_comet::{build_app, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    log::info!("STH comet: historical context query service");

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={} backend={:?} prefix='{}' max_results={}",
        config.server_address(),
        config.database.backend,
        config.query.prefix,
        config.query.max_results
    );

    match config.database.backend {
        StoreBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let database_url = config.database_url()?;
            let store = PostgresStore::new(
                &database_url,
                config.database.max_connections.unwrap_or(20),
            )
            .await?;
            let service = Arc::new(QueryService::new(Arc::new(store), &config.query));
            serve(build_app(service, &config), &config).await
        }
        StoreBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
                log::info!("Loading seed data...");
                let loaded = seed::load_seed_data(&store, &config.query.prefix)?;
                log::info!("Seed data loaded: {} samples", loaded);
            }
            let service = Arc::new(QueryService::new(store, &config.query));
            serve(build_app(service, &config), &config).await
        }
    }
}
