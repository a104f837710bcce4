use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::model::{
    AggregationDescriptor, AggregationMethod, Bucket, CountDescriptor, RawQueryDescriptor,
    SampleDocument, SampleFilter, SortOrder,
};
use crate::store::traits::SampleStore;

/// In-process store evaluating query descriptors over plain vectors.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<SampleDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: &str, doc: SampleDocument) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    pub fn insert_many(&self, collection: &str, docs: impl IntoIterator<Item = SampleDocument>) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, |docs| docs.len())
    }

    fn matching(&self, collection: &str, filter: &SampleFilter) -> Vec<SampleDocument> {
        self.collections
            .read()
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default()
    }
}

/// Running aggregate of one attribute inside one bucket
#[derive(Debug, Default, Clone)]
struct Accumulator {
    sum: f64,
    count: u64,
    /// Extremes keep the sample's own number so integer series stay integers
    min: Option<(f64, Number)>,
    max: Option<(f64, Number)>,
}

impl Accumulator {
    fn add(&mut self, number: &Number) {
        let Some(value) = number.as_f64() else {
            return;
        };
        self.sum += value;
        self.count += 1;
        if self.min.as_ref().map_or(true, |(m, _)| value < *m) {
            self.min = Some((value, number.clone()));
        }
        if self.max.as_ref().map_or(true, |(m, _)| value > *m) {
            self.max = Some((value, number.clone()));
        }
    }

    fn result(&self, method: AggregationMethod) -> Value {
        let value = match method {
            AggregationMethod::Sum => Number::from_f64(self.sum),
            AggregationMethod::Avg if self.count > 0 => {
                Number::from_f64(self.sum / self.count as f64)
            }
            AggregationMethod::Avg => None,
            AggregationMethod::Min => self.min.as_ref().map(|(_, n)| n.clone()),
            AggregationMethod::Max => self.max.as_ref().map(|(_, n)| n.clone()),
        };
        value.map_or(Value::Null, Value::Number)
    }
}

struct BucketState {
    timestamp: DateTime<Utc>,
    accumulators: Vec<Accumulator>,
}

#[async_trait::async_trait]
impl SampleStore for MemoryStore {
    async fn find(&self, query: &RawQueryDescriptor) -> Result<Vec<SampleDocument>> {
        let mut docs = self.matching(&query.collection, &query.filter);
        match query.sort {
            SortOrder::Ascending => docs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
            SortOrder::Descending => docs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }

        // a limit of 0 means "no limit"
        let limit = match query.limit {
            0 => usize::MAX,
            limit => usize::try_from(limit).unwrap_or(usize::MAX),
        };

        Ok(docs
            .iter()
            .skip(usize::try_from(query.skip).unwrap_or(usize::MAX))
            .take(limit)
            .map(|doc| doc.project(&query.projection))
            .collect())
    }

    async fn aggregate(&self, pipeline: &AggregationDescriptor) -> Result<Vec<Bucket>> {
        let docs = self.matching(&pipeline.collection, &pipeline.filter);

        let mut buckets: HashMap<Vec<i32>, BucketState> = HashMap::new();
        for doc in &docs {
            let state = buckets
                .entry(pipeline.rule.key(&doc.timestamp))
                .or_insert_with(|| BucketState {
                    timestamp: doc.timestamp,
                    accumulators: vec![Accumulator::default(); pipeline.attributes.len()],
                });
            state.timestamp = state.timestamp.min(doc.timestamp);

            for (name, acc) in pipeline.attributes.iter().zip(state.accumulators.iter_mut()) {
                if let Some(Value::Number(number)) = doc.attributes.get(name) {
                    acc.add(number);
                }
            }
        }

        let mut result: Vec<Bucket> = buckets
            .into_iter()
            .map(|(key, state)| {
                let values: Map<String, Value> = pipeline
                    .attributes
                    .iter()
                    .zip(state.accumulators.iter())
                    .map(|(name, acc)| (name.clone(), acc.result(pipeline.method)))
                    .collect();
                Bucket {
                    timestamp: state.timestamp,
                    key,
                    values,
                }
            })
            .collect();

        match pipeline.sort {
            SortOrder::Ascending => result.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
            SortOrder::Descending => result.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }
        Ok(result)
    }

    async fn count(&self, query: &CountDescriptor) -> Result<u64> {
        let collections = self.collections.read();
        let count = collections
            .get(&query.collection)
            .map_or(0, |docs| docs.iter().filter(|doc| query.filter.matches(doc)).count());
        Ok(count as u64)
    }
}
