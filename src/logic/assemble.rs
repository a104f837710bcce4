use serde_json::Value;

use crate::model::{
    AttributeSample, AttributeSeries, ContextElement, ContextResponse, Record, StatusBlock,
};

/// Reshapes one entity's records into the attribute-keyed response element.
pub struct ResultAssembler;

impl ResultAssembler {
    /// Every requested attribute becomes one series over the same records, in record
    /// order. No records means no series at all rather than empty ones.
    pub fn assemble<R: Record>(
        records: &[R],
        attribute_names: &[String],
        entity_id: &str,
        count: Option<u64>,
    ) -> ContextResponse {
        let attributes = if records.is_empty() {
            Vec::new()
        } else {
            let mut series: Vec<AttributeSeries> = attribute_names
                .iter()
                .map(|name| AttributeSeries {
                    name: name.clone(),
                    values: Vec::with_capacity(records.len()),
                })
                .collect();

            for record in records {
                let recv_time = record.recv_time();
                for attribute in series.iter_mut() {
                    attribute.values.push(AttributeSample {
                        recv_time,
                        attr_value: record.attribute(&attribute.name).cloned().unwrap_or(Value::Null),
                    });
                }
            }
            series
        };

        ContextResponse {
            context_element: ContextElement {
                id: entity_id.to_string(),
                is_pattern: false,
                attributes,
                count: count.filter(|c| *c > 0),
            },
            status_code: StatusBlock::ok(),
        }
    }
}
