use crate::model::TenantContext;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

pub const SERVICE_HEADER: &str = "fiware-service";
pub const SERVICE_PATH_HEADER: &str = "fiware-servicepath";

/// Axum extractor for TenantContext from request headers
///
/// - Fiware-Service: tenant, empty string when absent
/// - Fiware-ServicePath: optional path scope
#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let service = extract_header_value(headers, SERVICE_HEADER).unwrap_or_default();
        let service_path = extract_header_value(headers, SERVICE_PATH_HEADER);

        Ok(TenantContext::with_details(service, service_path))
    }
}

/// Extract header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}
