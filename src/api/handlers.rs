use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Json,
};
use log::debug;
use serde::Serialize;
use std::sync::Arc;

use crate::error::CometError;
use crate::logic::QueryService;
use crate::model::{ContextQuery, ContextResponses, QueryParams, TenantContext};
use crate::store::traits::SampleStore;

pub type AppState<S> = Arc<QueryService<S>>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /{base}/contextEntities/type/{type}/id/{ids}/attributes/{attrs}
pub async fn get_context_entities<S: SampleStore + 'static>(
    State(service): State<AppState<S>>,
    Path((entity_type, entity_ids, attributes)): Path<(String, String, String)>,
    tenant: TenantContext,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<ContextResponses>, CometError> {
    let Query(params) = params.map_err(|rejection| CometError::validation(rejection.body_text()))?;

    debug!(
        "context query for tenant '{}' (service path {:?})",
        tenant.service, tenant.service_path
    );

    let query = ContextQuery {
        entity_type,
        entity_ids,
        attributes,
        params,
        tenant: tenant.service,
    };

    service.query(&query).await.map(Json)
}
