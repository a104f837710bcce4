use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One stored sample of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDocument {
    pub entity_name: String,
    pub entity_type: String,
    pub timestamp: DateTime<Utc>,
    /// Attribute name -> stored value
    pub attributes: Map<String, Value>,
}

impl SampleDocument {
    pub fn new(entity_name: &str, entity_type: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            entity_type: entity_type.to_string(),
            timestamp,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: Value) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    /// Copy of this sample carrying only the named attributes.
    pub fn project(&self, attributes: &[String]) -> Self {
        let attributes = attributes
            .iter()
            .filter_map(|name| {
                self.attributes
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect();
        Self {
            entity_name: self.entity_name.clone(),
            entity_type: self.entity_type.clone(),
            timestamp: self.timestamp,
            attributes,
        }
    }
}

/// One aggregation output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Earliest sample timestamp within the bucket
    pub timestamp: DateTime<Utc>,
    /// The bucket's calendar key, in the order of the rule's grouping fields
    pub key: Vec<i32>,
    /// Attribute name -> aggregated value (`null` when no numeric samples)
    pub values: Map<String, Value>,
}

/// Anything the result assembler can turn into time-series samples.
pub trait Record {
    fn recv_time(&self) -> DateTime<Utc>;
    fn attribute(&self, name: &str) -> Option<&Value>;
}

impl Record for SampleDocument {
    fn recv_time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

impl Record for Bucket {
    fn recv_time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}
