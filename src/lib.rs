pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

use axum::Router;
use std::sync::Arc;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{CometError, ErrorResponse};

// Export logic types
pub use logic::{BucketRule, CalendarField, QueryBuilder, QueryService, RequestValidator, ResultAssembler};

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, SampleStore};

/// The complete HTTP application for a query service.
pub fn build_app<S: SampleStore + 'static>(
    service: Arc<QueryService<S>>,
    config: &config::AppConfig,
) -> Router {
    let router = routes::create_router::<S>(&config.server.base_path).with_state(service);
    routes::with_request_timeout(router, config.request_timeout())
}

/// Serve `app` on the configured address until the process stops.
pub async fn serve(app: Router, config: &config::AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    log::info!("STH comet server running on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
