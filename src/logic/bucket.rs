//! Calendar bucketing rules for aggregation queries.
//!
//! Every aggregation period maps to one calendar field extracted from a sample's
//! timestamp (UTC) plus the coarser fields it is grouped with. Two samples land in
//! the same bucket iff all fields of the rule's `group_by` set agree.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;

use crate::model::AggregationPeriod;
use CalendarField::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CalendarField {
    Year,
    Month,
    /// Week of year, 0..=53. Weeks start on Sunday; days before the first Sunday are week 0.
    Week,
    DayOfYear,
    Hour,
    /// 0 for minutes 0..30, 1 for minutes 30..60
    HalfHour,
    /// 1..=4, one per started quarter of the hour
    QuarterHour,
    Minute,
    Second,
}

impl CalendarField {
    pub fn name(&self) -> &'static str {
        match self {
            CalendarField::Year => "year",
            CalendarField::Month => "month",
            CalendarField::Week => "week",
            CalendarField::DayOfYear => "day",
            CalendarField::Hour => "hour",
            CalendarField::HalfHour => "halfhour",
            CalendarField::QuarterHour => "quarterhour",
            CalendarField::Minute => "minute",
            CalendarField::Second => "second",
        }
    }

    pub fn extract(&self, ts: &DateTime<Utc>) -> i32 {
        match self {
            CalendarField::Year => ts.year(),
            CalendarField::Month => ts.month() as i32,
            CalendarField::Week => {
                let days_from_sunday = ts.weekday().num_days_from_sunday() as i32;
                (ts.ordinal0() as i32 + 7 - days_from_sunday) / 7
            }
            CalendarField::DayOfYear => ts.ordinal() as i32,
            CalendarField::Hour => ts.hour() as i32,
            CalendarField::HalfHour => half_hour_index(ts.minute()),
            CalendarField::QuarterHour => quarter_hour_index(ts.minute()),
            CalendarField::Minute => ts.minute() as i32,
            CalendarField::Second => ts.second() as i32,
        }
    }
}

fn half_hour_index(minute: u32) -> i32 {
    if minute < 30 {
        0
    } else {
        1
    }
}

fn quarter_hour_index(minute: u32) -> i32 {
    match minute {
        0..=14 => 1,
        15..=29 => 2,
        30..=44 => 3,
        _ => 4,
    }
}

/// How one aggregation period buckets samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRule {
    pub period: AggregationPeriod,
    /// The field the period is named after
    pub field: CalendarField,
    /// Coarser-to-finer fields that together key one bucket; always ends with `field`
    pub group_by: &'static [CalendarField],
}

const YEAR: &[CalendarField] = &[Year];
const MONTH: &[CalendarField] = &[Year, Month];
const WEEK: &[CalendarField] = &[Year, Week];
const DAY: &[CalendarField] = &[Year, DayOfYear];
const HOUR: &[CalendarField] = &[Year, DayOfYear, Hour];
const HALF_HOUR: &[CalendarField] = &[Year, DayOfYear, Hour, HalfHour];
const QUARTER_HOUR: &[CalendarField] = &[Year, DayOfYear, Hour, QuarterHour];
const MINUTE: &[CalendarField] = &[Year, DayOfYear, Hour, Minute];
const SECOND: &[CalendarField] = &[Year, DayOfYear, Hour, Minute, Second];

impl BucketRule {
    /// Bucket rule for an aggregation period.
    pub fn for_period(period: AggregationPeriod) -> Self {
        let (field, group_by) = match period {
            AggregationPeriod::Year => (Year, YEAR),
            AggregationPeriod::Month => (Month, MONTH),
            AggregationPeriod::Week => (Week, WEEK),
            AggregationPeriod::Day => (DayOfYear, DAY),
            AggregationPeriod::Hour => (Hour, HOUR),
            AggregationPeriod::HalfHour => (HalfHour, HALF_HOUR),
            AggregationPeriod::QuarterHour => (QuarterHour, QUARTER_HOUR),
            AggregationPeriod::Minute => (Minute, MINUTE),
            AggregationPeriod::Second => (Second, SECOND),
        };
        Self {
            period,
            field,
            group_by,
        }
    }

    /// The bucket key of a timestamp under this rule.
    pub fn key(&self, ts: &DateTime<Utc>) -> Vec<i32> {
        self.group_by.iter().map(|field| field.extract(ts)).collect()
    }
}
