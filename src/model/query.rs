use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Query string parameters exactly as the client sent them.
///
/// Everything stays a string here; `RequestValidator` owns the parsing so that
/// malformed values surface as validation errors instead of extractor rejections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub last_n: Option<String>,
    pub h_limit: Option<String>,
    pub h_offset: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// Present (even empty, as in `?count`) means "include the total count"
    pub count: Option<String>,
    pub aggr_method: Option<String>,
    pub aggr_period: Option<String>,
}

/// The raw pieces of one context query: URL path segments, query string, tenant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextQuery {
    pub entity_type: String,
    /// Comma separated entity ids as found in the path
    pub entity_ids: String,
    /// Comma separated attribute names as found in the path
    pub attributes: String,
    pub params: QueryParams,
    pub tenant: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    Avg,
    Min,
    Max,
    Sum,
}

impl AggregationMethod {
    pub const ALL: [AggregationMethod; 4] = [
        AggregationMethod::Avg,
        AggregationMethod::Min,
        AggregationMethod::Max,
        AggregationMethod::Sum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Avg => "avg",
            AggregationMethod::Min => "min",
            AggregationMethod::Max => "max",
            AggregationMethod::Sum => "sum",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPeriod {
    Year,
    Month,
    Week,
    Day,
    Hour,
    HalfHour,
    QuarterHour,
    Minute,
    Second,
}

impl AggregationPeriod {
    pub const ALL: [AggregationPeriod; 9] = [
        AggregationPeriod::Year,
        AggregationPeriod::Month,
        AggregationPeriod::Week,
        AggregationPeriod::Day,
        AggregationPeriod::Hour,
        AggregationPeriod::HalfHour,
        AggregationPeriod::QuarterHour,
        AggregationPeriod::Minute,
        AggregationPeriod::Second,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationPeriod::Year => "year",
            AggregationPeriod::Month => "month",
            AggregationPeriod::Week => "week",
            AggregationPeriod::Day => "day",
            AggregationPeriod::Hour => "hour",
            AggregationPeriod::HalfHour => "halfhour",
            AggregationPeriod::QuarterHour => "quarterhour",
            AggregationPeriod::Minute => "minute",
            AggregationPeriod::Second => "second",
        }
    }
}

impl fmt::Display for AggregationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationPeriod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationPeriod::ALL
            .into_iter()
            .find(|period| period.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub method: AggregationMethod,
    pub period: AggregationPeriod,
}

/// A validated, self-consistent query. Only `RequestValidator` constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub entity_type: String,
    pub entity_ids: Vec<String>,
    pub attribute_names: Vec<String>,
    pub tenant: String,
    /// Collection holding the samples of `entity_type` for `tenant`
    pub collection: String,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub last_n: u64,
    pub h_limit: u64,
    pub h_offset: u64,
    pub include_count: bool,
    pub aggregation: Option<Aggregation>,
    pub max_results: u64,
}

impl QuerySpec {
    pub fn is_aggregation(&self) -> bool {
        self.aggregation.is_some()
    }

    /// Page size for raw queries. `lastN` and `hLimit` never both exceed zero.
    pub fn limit(&self) -> u64 {
        self.last_n + self.h_limit
    }
}
