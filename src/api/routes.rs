use axum::{
    http::StatusCode,
    middleware::map_response,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::api::handlers::{self, AppState};
use crate::error::ErrorResponse;
use crate::store::traits::SampleStore;

pub const REQUEST_TIMED_OUT: &str = "Request did not complete in time";

pub fn create_router<S: SampleStore + 'static>(base_path: &str) -> Router<AppState<S>> {
    let base = base_path.trim_matches('/');
    let entities = if base.is_empty() {
        String::new()
    } else {
        format!("/{}", base)
    };

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Historical raw and aggregated context data
        .route(
            &format!(
                "{}/contextEntities/type/:entity_type/id/:entity_ids/attributes/:attributes",
                entities
            ),
            get(handlers::get_context_entities::<S>),
        )
}

/// Abort requests running longer than `timeout` with 408 and the usual error body.
pub fn with_request_timeout(router: Router, timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::new(timeout))
        .layer(map_response(timeout_body))
}

async fn timeout_body(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    (
        StatusCode::REQUEST_TIMEOUT,
        Json(ErrorResponse::new(REQUEST_TIMED_OUT)),
    )
        .into_response()
}
