use crate::model::{
    AggregationDescriptor, Bucket, CountDescriptor, RawQueryDescriptor, SampleDocument,
};
use anyhow::Result;

/// Read access to the time-series store.
///
/// Implementations own connection handling and retries. A collection that does not
/// exist behaves like an empty one.
#[async_trait::async_trait]
pub trait SampleStore: Send + Sync {
    /// Filtered, sorted, paginated samples
    async fn find(&self, query: &RawQueryDescriptor) -> Result<Vec<SampleDocument>>;
    /// One bucket per distinct calendar key, ordered by bucket timestamp
    async fn aggregate(&self, pipeline: &AggregationDescriptor) -> Result<Vec<Bucket>>;
    /// Number of samples matching the filter, regardless of pagination
    async fn count(&self, query: &CountDescriptor) -> Result<u64>;
}
