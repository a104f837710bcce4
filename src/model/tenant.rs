use serde::{Deserialize, Serialize};

/// Tenant information extracted from the request headers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantContext {
    /// Logical namespace (`Fiware-Service`), empty when the header is absent
    pub service: String,
    /// Path scope (`Fiware-ServicePath`). Accepted but not used to scope queries.
    pub service_path: Option<String>,
}

impl TenantContext {
    pub fn with_details(service: String, service_path: Option<String>) -> Self {
        Self {
            service,
            service_path,
        }
    }
}

/// Name of the collection holding all samples of one entity type for a tenant.
///
/// Other systems read and write the same collections, so this layout must not change.
pub fn collection_name(prefix: &str, tenant: &str, entity_type: &str) -> String {
    format!("{}_{}{}", tenant, prefix, entity_type)
}
