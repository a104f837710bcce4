use crate::logic::bucket::BucketRule;
use crate::model::{
    AggregationDescriptor, CountDescriptor, QuerySpec, RawQueryDescriptor, SampleFilter, SortOrder,
};

/// Builds the per-entity store queries for a validated `QuerySpec`.
pub struct QueryBuilder;

impl QueryBuilder {
    /// Samples of `entity_id`, newest first unless a start date anchors the page.
    pub fn build_raw(spec: &QuerySpec, entity_id: &str) -> RawQueryDescriptor {
        let sort = if spec.date_from.is_some() {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        };

        RawQueryDescriptor {
            collection: spec.collection.clone(),
            filter: Self::filter(spec, entity_id),
            projection: spec.attribute_names.clone(),
            sort,
            skip: spec.h_offset,
            limit: spec.limit(),
        }
    }

    pub fn build_count(spec: &QuerySpec, entity_id: &str) -> CountDescriptor {
        CountDescriptor {
            collection: spec.collection.clone(),
            filter: Self::filter(spec, entity_id),
        }
    }

    /// Calendar buckets of `entity_id` within the spec's date range.
    ///
    /// Returns `None` for specs without an aggregation.
    pub fn build_aggregation(spec: &QuerySpec, entity_id: &str) -> Option<AggregationDescriptor> {
        let aggregation = spec.aggregation?;
        Some(AggregationDescriptor {
            collection: spec.collection.clone(),
            filter: Self::filter(spec, entity_id),
            rule: BucketRule::for_period(aggregation.period),
            method: aggregation.method,
            attributes: spec.attribute_names.clone(),
            sort: SortOrder::Ascending,
        })
    }

    fn filter(spec: &QuerySpec, entity_id: &str) -> SampleFilter {
        SampleFilter {
            entity_name: entity_id.to_string(),
            from: spec.date_from,
            to: spec.date_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::bucket::CalendarField;
    use crate::model::{Aggregation, AggregationMethod, AggregationPeriod};
    use chrono::{TimeZone, Utc};

    fn spec() -> QuerySpec {
        QuerySpec {
            entity_type: "Room".to_string(),
            entity_ids: vec!["Room42".to_string()],
            attribute_names: vec![
                "temperature".to_string(),
                "pm10".to_string(),
                "pm25".to_string(),
            ],
            tenant: "acme".to_string(),
            collection: "acme_sth_Room".to_string(),
            date_from: None,
            date_to: None,
            last_n: 10,
            h_limit: 0,
            h_offset: 0,
            include_count: false,
            aggregation: None,
            max_results: 100,
        }
    }

    #[test]
    fn test_last_n_sorts_newest_first() {
        let query = QueryBuilder::build_raw(&spec(), "Room42");
        assert_eq!(query.collection, "acme_sth_Room");
        assert_eq!(query.filter.entity_name, "Room42");
        assert_eq!(query.filter.from, None);
        assert_eq!(query.sort, SortOrder::Descending);
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 10);
        assert_eq!(query.projection, vec!["temperature", "pm10", "pm25"]);
    }

    #[test]
    fn test_date_from_sorts_ascending() {
        let mut spec = spec();
        spec.date_from = Some(Utc.with_ymd_and_hms(2019, 1, 1, 8, 10, 0).unwrap());
        assert_eq!(QueryBuilder::build_raw(&spec, "Room42").sort, SortOrder::Ascending);

        spec.date_to = Some(Utc.with_ymd_and_hms(2019, 1, 2, 0, 0, 0).unwrap());
        assert_eq!(QueryBuilder::build_raw(&spec, "Room42").sort, SortOrder::Ascending);
    }

    #[test]
    fn test_date_to_alone_keeps_descending() {
        let mut spec = spec();
        spec.date_to = Some(Utc.with_ymd_and_hms(2019, 1, 2, 0, 0, 0).unwrap());
        let query = QueryBuilder::build_raw(&spec, "Room42");
        assert_eq!(query.sort, SortOrder::Descending);
        assert_eq!(query.filter.to, spec.date_to);
    }

    #[test]
    fn test_h_limit_pages() {
        let mut spec = spec();
        spec.last_n = 0;
        spec.h_limit = 25;
        spec.h_offset = 50;
        let query = QueryBuilder::build_raw(&spec, "Room42");
        assert_eq!(query.skip, 50);
        assert_eq!(query.limit, 25);
    }

    #[test]
    fn test_count_uses_same_filter_without_paging() {
        let mut spec = spec();
        spec.date_from = Some(Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap());
        let count = QueryBuilder::build_count(&spec, "Room42");
        assert_eq!(count.filter, QueryBuilder::build_raw(&spec, "Room42").filter);
    }

    #[test]
    fn test_aggregation_pipeline() {
        let mut spec = spec();
        spec.last_n = 0;
        spec.date_from = Some(Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap());
        spec.date_to = Some(Utc.with_ymd_and_hms(2019, 11, 30, 23, 59, 59).unwrap());
        spec.aggregation = Some(Aggregation {
            method: AggregationMethod::Avg,
            period: AggregationPeriod::HalfHour,
        });

        let pipeline = QueryBuilder::build_aggregation(&spec, "Room42").unwrap();
        assert_eq!(pipeline.filter.entity_name, "Room42");
        assert_eq!(pipeline.filter.from, spec.date_from);
        assert_eq!(pipeline.filter.to, spec.date_to);
        assert_eq!(pipeline.method, AggregationMethod::Avg);
        assert_eq!(pipeline.rule.field, CalendarField::HalfHour);
        assert_eq!(pipeline.attributes.len(), 3);
        assert_eq!(pipeline.sort, SortOrder::Ascending);
    }

    #[test]
    fn test_no_aggregation_without_method() {
        assert!(QueryBuilder::build_aggregation(&spec(), "Room42").is_none());
    }
}
