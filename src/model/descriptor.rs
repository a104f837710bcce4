use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::logic::bucket::BucketRule;
use crate::model::{AggregationMethod, SampleDocument};

/// Selects the samples of one entity, optionally bounded by an inclusive time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleFilter {
    pub entity_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

impl SampleFilter {
    pub fn matches(&self, doc: &SampleDocument) -> bool {
        doc.entity_name == self.entity_name
            && self.from.map_or(true, |from| doc.timestamp >= from)
            && self.to.map_or(true, |to| doc.timestamp <= to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A filtered, sorted, paginated read of raw samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQueryDescriptor {
    pub collection: String,
    pub filter: SampleFilter,
    /// Attribute names to return besides timestamp, entity name and entity type
    pub projection: Vec<String>,
    pub sort: SortOrder,
    pub skip: u64,
    pub limit: u64,
}

/// Number of samples matching a filter, ignoring pagination.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountDescriptor {
    pub collection: String,
    pub filter: SampleFilter,
}

/// A match + calendar group + sort pipeline producing one bucket per distinct key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationDescriptor {
    pub collection: String,
    pub filter: SampleFilter,
    pub rule: BucketRule,
    pub method: AggregationMethod,
    pub attributes: Vec<String>,
    /// Order of buckets by their representative timestamp
    pub sort: SortOrder,
}
