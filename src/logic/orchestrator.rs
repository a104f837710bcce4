//! Request-level coordination: validate, fan out store queries, assemble.
//!
//! A request moves through validating -> querying -> assembling -> responded, or
//! stops at failed. Store queries for all entities (and their counts) run
//! concurrently and are joined all-or-nothing; results are paired with entities by
//! position, never by completion order.

use futures::future::{try_join, try_join_all};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::error::{CometError, Result};
use crate::logic::{QueryBuilder, RequestValidator, ResultAssembler};
use crate::model::{ContextQuery, ContextResponse, ContextResponses, CountDescriptor, QuerySpec};
use crate::store::traits::SampleStore;

pub struct QueryService<S: ?Sized> {
    store: Arc<S>,
    validator: RequestValidator,
    query_timeout: Duration,
}

impl<S: SampleStore + ?Sized> QueryService<S> {
    pub fn new(store: Arc<S>, config: &QueryConfig) -> Self {
        Self {
            store,
            validator: RequestValidator::new(config),
            query_timeout: config.query_timeout(),
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub async fn query(&self, query: &ContextQuery) -> Result<ContextResponses> {
        let request_id = Uuid::new_v4();
        debug!(
            "[{}] validating: type={} ids={} attributes={} tenant='{}'",
            request_id, query.entity_type, query.entity_ids, query.attributes, query.tenant
        );

        let spec = match self.validator.validate(query) {
            Ok(spec) => spec,
            Err(err) => {
                info!("[{}] rejected: {}", request_id, err);
                return Err(err);
            }
        };

        debug!(
            "[{}] querying {} entities in '{}' ({})",
            request_id,
            spec.entity_ids.len(),
            spec.collection,
            if spec.is_aggregation() { "aggregation" } else { "raw" }
        );

        let context_responses =
            match tokio::time::timeout(self.query_timeout, self.execute(&spec)).await {
                Ok(Ok(responses)) => responses,
                Ok(Err(err)) => {
                    error!("[{}] failed: {}", request_id, err);
                    return Err(err);
                }
                Err(_) => {
                    error!(
                        "[{}] failed: store queries exceeded {:?}",
                        request_id, self.query_timeout
                    );
                    return Err(CometError::Timeout(self.query_timeout));
                }
            };

        debug!(
            "[{}] responded with {} context responses",
            request_id,
            context_responses.len()
        );
        Ok(ContextResponses { context_responses })
    }

    async fn execute(&self, spec: &QuerySpec) -> Result<Vec<ContextResponse>> {
        if spec.is_aggregation() {
            self.execute_aggregation(spec).await
        } else {
            self.execute_raw(spec).await
        }
    }

    async fn execute_raw(&self, spec: &QuerySpec) -> Result<Vec<ContextResponse>> {
        let store = &self.store;

        let documents = try_join_all(spec.entity_ids.iter().map(|entity_id| {
            let query = QueryBuilder::build_raw(spec, entity_id);
            async move { store.find(&query).await }
        }));

        let count_queries: Vec<CountDescriptor> = if spec.include_count {
            spec.entity_ids
                .iter()
                .map(|entity_id| QueryBuilder::build_count(spec, entity_id))
                .collect()
        } else {
            Vec::new()
        };
        let counts = try_join_all(
            count_queries
                .iter()
                .map(|query| async move { store.count(query).await }),
        );

        let (documents, counts) = try_join(documents, counts).await?;

        debug!("assembling {} raw result sets", documents.len());
        Ok(spec
            .entity_ids
            .iter()
            .zip(documents.iter())
            .enumerate()
            .map(|(i, (entity_id, docs))| {
                ResultAssembler::assemble(docs, &spec.attribute_names, entity_id, counts.get(i).copied())
            })
            .collect())
    }

    async fn execute_aggregation(&self, spec: &QuerySpec) -> Result<Vec<ContextResponse>> {
        let store = &self.store;

        let pipelines = spec
            .entity_ids
            .iter()
            .map(|entity_id| {
                QueryBuilder::build_aggregation(spec, entity_id).ok_or_else(|| {
                    CometError::Internal("aggregation requested without method and period".to_string())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let buckets = try_join_all(
            pipelines
                .iter()
                .map(|pipeline| async move { store.aggregate(pipeline).await }),
        )
        .await?;

        debug!("assembling {} bucket sets", buckets.len());
        Ok(spec
            .entity_ids
            .iter()
            .zip(buckets.iter())
            .map(|(entity_id, buckets)| {
                ResultAssembler::assemble(buckets, &spec.attribute_names, entity_id, None)
            })
            .collect())
    }
}
