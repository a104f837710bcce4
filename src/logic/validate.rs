//! Turns the untyped pieces of a context query into a `QuerySpec`.
//!
//! Validation is all-or-nothing: the first violated rule produces a
//! `CometError::Validation` whose message is sent to the client as-is.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use itertools::Itertools;

use crate::config::QueryConfig;
use crate::error::{CometError, Result};
use crate::model::{
    collection_name, Aggregation, AggregationMethod, AggregationPeriod, ContextQuery, QuerySpec,
};

pub const MISSING_PAGINATION: &str =
    "Either \"lastN\" or \"hLimit/hOffset\" need to be used as query parameters";
pub const CONFLICTING_PAGINATION: &str =
    "Only one of \"lastN\" or \"hLimit/hOffset\" can be used as query parameters";
pub const INVERTED_DATE_RANGE: &str = "\"dateFrom\" must not be later than \"dateTo\"";
pub const INCOMPLETE_AGGREGATION: &str =
    "\"aggrMethod\" and \"aggrPeriod\" need to be used together";
pub const AGGREGATION_WITHOUT_RANGE: &str =
    "Aggregation queries need both \"dateFrom\" and \"dateTo\" as query parameters";
pub const MISSING_ENTITY_IDS: &str = "At least one entity id is required";
pub const MISSING_ATTRIBUTES: &str = "At least one attribute name is required";

pub fn too_many_results(max_results: u64) -> String {
    format!(
        "The sum of \"lastN\" and \"hLimit\" must not exceed {}",
        max_results
    )
}

pub fn invalid_method() -> String {
    format!(
        "\"aggrMethod\" must be one of: {}",
        AggregationMethod::ALL.iter().join(", ")
    )
}

pub fn invalid_period() -> String {
    format!(
        "\"aggrPeriod\" must be one of: {}",
        AggregationPeriod::ALL.iter().join(", ")
    )
}

#[derive(Debug, Clone)]
pub struct RequestValidator {
    prefix: String,
    max_results: u64,
}

impl RequestValidator {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            max_results: config.max_results,
        }
    }

    pub fn validate(&self, query: &ContextQuery) -> Result<QuerySpec> {
        let params = &query.params;

        let entity_ids = split_list(&query.entity_ids);
        if entity_ids.is_empty() {
            return Err(CometError::validation(MISSING_ENTITY_IDS));
        }
        let attribute_names = split_list(&query.attributes);
        if attribute_names.is_empty() {
            return Err(CometError::validation(MISSING_ATTRIBUTES));
        }

        let mut last_n = parse_count("lastN", params.last_n.as_deref())?;
        let mut h_limit = parse_count("hLimit", params.h_limit.as_deref())?;
        let mut h_offset = parse_count("hOffset", params.h_offset.as_deref())?;
        let date_from = parse_date("dateFrom", params.date_from.as_deref())?;
        let date_to = parse_date("dateTo", params.date_to.as_deref())?;
        let mut include_count = params
            .count
            .as_deref()
            .map_or(false, |v| v != "false" && v != "0");

        let aggregation = match (params.aggr_method.as_deref(), params.aggr_period.as_deref()) {
            (None, None) => None,
            (Some(method), Some(period)) => Some(Aggregation {
                method: method
                    .parse()
                    .map_err(|_| CometError::validation(invalid_method()))?,
                period: period
                    .parse()
                    .map_err(|_| CometError::validation(invalid_period()))?,
            }),
            _ => return Err(CometError::validation(INCOMPLETE_AGGREGATION)),
        };

        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(CometError::validation(INVERTED_DATE_RANGE));
            }
        }

        if aggregation.is_some() {
            if date_from.is_none() || date_to.is_none() {
                return Err(CometError::validation(AGGREGATION_WITHOUT_RANGE));
            }
            // buckets are neither paginated nor counted
            last_n = 0;
            h_limit = 0;
            h_offset = 0;
            include_count = false;
        } else {
            if last_n == 0 && h_limit == 0 {
                return Err(CometError::validation(MISSING_PAGINATION));
            }
            if last_n > 0 && h_limit > 0 {
                return Err(CometError::validation(CONFLICTING_PAGINATION));
            }
            if last_n.saturating_add(h_limit) > self.max_results {
                return Err(CometError::validation(too_many_results(self.max_results)));
            }
        }

        Ok(QuerySpec {
            collection: collection_name(&self.prefix, &query.tenant, &query.entity_type),
            entity_type: query.entity_type.clone(),
            entity_ids,
            attribute_names,
            tenant: query.tenant.clone(),
            date_from,
            date_to,
            last_n,
            h_limit,
            h_offset,
            include_count,
            aggregation,
            max_results: self.max_results,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Absent or empty is 0; anything else must be a non-negative integer.
fn parse_count(name: &str, raw: Option<&str>) -> Result<u64> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value.parse::<u64>().map_err(|_| {
            CometError::validation(format!("\"{}\" must be a non-negative integer", name))
        }),
    }
}

fn parse_date(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value).map(Some).ok_or_else(|| {
            CometError::validation(format!(
                "\"{}\" is not a valid ISO-8601 date: {}",
                name, value
            ))
        }),
    }
}

/// RFC 3339, or a date-time / date without offset taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
