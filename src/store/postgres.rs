use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row};

use crate::logic::bucket::CalendarField;
use crate::model::{
    AggregationDescriptor, AggregationMethod, Bucket, CountDescriptor, RawQueryDescriptor,
    SampleDocument, SampleFilter, SortOrder,
};
use crate::store::traits::SampleStore;

/// Samples of one collection live in a table of the same name:
///
/// ```sql
/// CREATE TABLE "<collection>" (
///     entity_name TEXT NOT NULL,
///     entity_type TEXT NOT NULL,
///     "timestamp" TIMESTAMPTZ NOT NULL,
///     attrs       JSONB NOT NULL
/// );
/// ```
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

type SqlBuilder<'a> = sqlx::QueryBuilder<'a, Postgres>;

/// SQLSTATE for `undefined_table`
const UNDEFINED_TABLE: &str = "42P01";

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn is_missing_collection(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNDEFINED_TABLE),
        _ => false,
    }
}

/// OFFSET/LIMIT operand; values beyond BIGINT saturate.
fn bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn push_filter<'a>(qb: &mut SqlBuilder<'a>, filter: &'a SampleFilter) {
    qb.push(" WHERE entity_name = ").push_bind(&filter.entity_name);
    if let Some(from) = filter.from {
        qb.push(" AND \"timestamp\" >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND \"timestamp\" <= ").push_bind(to);
    }
}

fn order(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    }
}

/// UTC calendar field of the sample timestamp, matching `CalendarField::extract`.
fn calendar_sql(field: CalendarField) -> &'static str {
    match field {
        CalendarField::Year => "EXTRACT(YEAR FROM (\"timestamp\" AT TIME ZONE 'UTC'))::int",
        CalendarField::Month => "EXTRACT(MONTH FROM (\"timestamp\" AT TIME ZONE 'UTC'))::int",
        CalendarField::Week => {
            "((EXTRACT(DOY FROM (\"timestamp\" AT TIME ZONE 'UTC'))::int + 6 \
             - EXTRACT(DOW FROM (\"timestamp\" AT TIME ZONE 'UTC'))::int) / 7)"
        }
        CalendarField::DayOfYear => "EXTRACT(DOY FROM (\"timestamp\" AT TIME ZONE 'UTC'))::int",
        CalendarField::Hour => "EXTRACT(HOUR FROM (\"timestamp\" AT TIME ZONE 'UTC'))::int",
        CalendarField::HalfHour => {
            "(CASE WHEN EXTRACT(MINUTE FROM (\"timestamp\" AT TIME ZONE 'UTC')) < 30 \
             THEN 0 ELSE 1 END)"
        }
        CalendarField::QuarterHour => {
            "(CASE WHEN EXTRACT(MINUTE FROM (\"timestamp\" AT TIME ZONE 'UTC')) < 15 THEN 1 \
             WHEN EXTRACT(MINUTE FROM (\"timestamp\" AT TIME ZONE 'UTC')) < 30 THEN 2 \
             WHEN EXTRACT(MINUTE FROM (\"timestamp\" AT TIME ZONE 'UTC')) < 45 THEN 3 \
             ELSE 4 END)"
        }
        CalendarField::Minute => "EXTRACT(MINUTE FROM (\"timestamp\" AT TIME ZONE 'UTC'))::int",
        CalendarField::Second => {
            "FLOOR(EXTRACT(SECOND FROM (\"timestamp\" AT TIME ZONE 'UTC')))::int"
        }
    }
}

/// Aggregate of the numeric values of one attribute as a JSONB column. MIN/MAX pick
/// the extreme sample itself so integer samples stay integers.
fn push_aggregate<'a>(qb: &mut SqlBuilder<'a>, method: AggregationMethod, name: &'a str) {
    match method {
        AggregationMethod::Avg => push_numeric(qb, name, "AVG(", ")"),
        AggregationMethod::Sum => push_numeric(qb, name, "COALESCE(SUM(", "), 0)"),
        AggregationMethod::Min => push_extreme(qb, name, "ASC"),
        AggregationMethod::Max => push_extreme(qb, name, "DESC"),
    }
}

fn push_numeric<'a>(qb: &mut SqlBuilder<'a>, name: &'a str, open: &str, close: &str) {
    qb.push("to_jsonb(")
        .push(open)
        .push("CASE WHEN jsonb_typeof(attrs -> ")
        .push_bind(name)
        .push("::text) = 'number' THEN (attrs ->> ")
        .push_bind(name)
        .push("::text)::float8 END")
        .push(close)
        .push(")");
}

fn push_extreme<'a>(qb: &mut SqlBuilder<'a>, name: &'a str, direction: &str) {
    qb.push("(array_agg(attrs -> ")
        .push_bind(name)
        .push("::text ORDER BY CASE WHEN jsonb_typeof(attrs -> ")
        .push_bind(name)
        .push("::text) = 'number' THEN (attrs ->> ")
        .push_bind(name)
        .push("::text)::float8 END ")
        .push(direction)
        .push(") FILTER (WHERE jsonb_typeof(attrs -> ")
        .push_bind(name)
        .push("::text) = 'number'))[1]");
}

fn find_query(query: &RawQueryDescriptor) -> SqlBuilder<'_> {
    let mut qb = SqlBuilder::new("SELECT entity_name, entity_type, \"timestamp\", jsonb_build_object(");
    for (i, name) in query.projection.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push_bind(name).push("::text, attrs -> ").push_bind(name).push("::text");
    }
    qb.push(") AS attrs FROM ")
        .push(quote_identifier(&query.collection));
    push_filter(&mut qb, &query.filter);
    qb.push(" ORDER BY \"timestamp\" ").push(order(query.sort));
    qb.push(" OFFSET ").push_bind(bigint(query.skip));
    if query.limit > 0 {
        qb.push(" LIMIT ").push_bind(bigint(query.limit));
    }
    qb
}

fn count_query(query: &CountDescriptor) -> SqlBuilder<'_> {
    let mut qb = SqlBuilder::new("SELECT COUNT(*) AS total FROM ");
    qb.push(quote_identifier(&query.collection));
    push_filter(&mut qb, &query.filter);
    qb
}

fn aggregate_query(pipeline: &AggregationDescriptor) -> SqlBuilder<'_> {
    let mut qb = SqlBuilder::new("SELECT MIN(\"timestamp\") AS bucket_time");
    for (i, field) in pipeline.rule.group_by.iter().enumerate() {
        qb.push(format!(", {} AS k{}", calendar_sql(*field), i));
    }
    for (i, name) in pipeline.attributes.iter().enumerate() {
        qb.push(", ");
        push_aggregate(&mut qb, pipeline.method, name);
        qb.push(format!(" AS v{}", i));
    }
    qb.push(" FROM ").push(quote_identifier(&pipeline.collection));
    push_filter(&mut qb, &pipeline.filter);

    let keys = (0..pipeline.rule.group_by.len())
        .map(|i| format!("k{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    qb.push(" GROUP BY ").push(keys);
    qb.push(" ORDER BY bucket_time ").push(order(pipeline.sort));
    qb
}

#[async_trait::async_trait]
impl SampleStore for PostgresStore {
    async fn find(&self, query: &RawQueryDescriptor) -> Result<Vec<SampleDocument>> {
        let mut qb = find_query(query);
        let rows = match qb.build().fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(err) if is_missing_collection(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err).context("Failed to query samples"),
        };

        rows.into_iter()
            .map(|row| {
                let attributes = match row.try_get::<Value, _>("attrs")? {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                Ok(SampleDocument {
                    entity_name: row.try_get("entity_name")?,
                    entity_type: row.try_get("entity_type")?,
                    timestamp: row.try_get("timestamp")?,
                    attributes,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .context("Failed to decode sample row")
    }

    async fn aggregate(&self, pipeline: &AggregationDescriptor) -> Result<Vec<Bucket>> {
        let mut qb = aggregate_query(pipeline);
        let rows = match qb.build().fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(err) if is_missing_collection(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err).context("Failed to aggregate samples"),
        };

        rows.into_iter()
            .map(|row| {
                let timestamp: DateTime<Utc> = row.try_get("bucket_time")?;
                let key = (0..pipeline.rule.group_by.len())
                    .map(|i| row.try_get::<i32, _>(format!("k{}", i).as_str()))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let mut values = Map::new();
                for (i, name) in pipeline.attributes.iter().enumerate() {
                    let value: Option<Value> = row.try_get(format!("v{}", i).as_str())?;
                    values.insert(name.clone(), value.unwrap_or(Value::Null));
                }
                Ok(Bucket {
                    timestamp,
                    key,
                    values,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .context("Failed to decode bucket row")
    }

    async fn count(&self, query: &CountDescriptor) -> Result<u64> {
        let mut qb = count_query(query);
        let row = match qb.build().fetch_one(&self.pool).await {
            Ok(row) => row,
            Err(err) if is_missing_collection(&err) => return Ok(0),
            Err(err) => return Err(err).context("Failed to count samples"),
        };
        let total: i64 = row.try_get("total").context("Failed to decode sample count")?;
        Ok(total.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::bucket::BucketRule;
    use crate::model::AggregationPeriod;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("acme_sth_Room"), "\"acme_sth_Room\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_every_grouping_field_has_sql() {
        for period in AggregationPeriod::ALL {
            for field in BucketRule::for_period(period).group_by {
                assert!(calendar_sql(*field).contains("AT TIME ZONE 'UTC'"));
            }
        }
    }

    const WEEK_SQL: &str = "((EXTRACT(DOY FROM (\"timestamp\" AT TIME ZONE 'UTC'))::int + 6 \
        - EXTRACT(DOW FROM (\"timestamp\" AT TIME ZONE 'UTC'))::int) / 7)";

    fn range_filter() -> SampleFilter {
        SampleFilter {
            entity_name: "Room1".to_string(),
            from: Some(Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2019, 1, 2, 0, 0, 0).unwrap()),
        }
    }

    fn pipeline(period: AggregationPeriod, method: AggregationMethod) -> AggregationDescriptor {
        AggregationDescriptor {
            collection: "acme_sth_Room".to_string(),
            filter: range_filter(),
            rule: BucketRule::for_period(period),
            method,
            attributes: vec!["temperature".to_string(), "pressure".to_string()],
            sort: SortOrder::Ascending,
        }
    }

    #[test]
    fn test_bigint_saturates() {
        assert_eq!(bigint(0), 0);
        assert_eq!(bigint(995), 995);
        assert_eq!(bigint(i64::MAX as u64), i64::MAX);
        assert_eq!(bigint(u64::MAX), i64::MAX);
        assert_eq!(bigint("18446744073709551615".parse().unwrap()), i64::MAX);
    }

    #[test]
    fn test_find_sql() {
        let query = RawQueryDescriptor {
            collection: "acme_sth_Room".to_string(),
            filter: SampleFilter {
                entity_name: "Room1".to_string(),
                from: Some(Utc::now()),
                to: None,
            },
            projection: vec!["temperature".to_string(), "pressure".to_string()],
            sort: SortOrder::Ascending,
            skip: u64::MAX,
            limit: 10,
        };
        assert_eq!(
            find_query(&query).sql(),
            "SELECT entity_name, entity_type, \"timestamp\", \
             jsonb_build_object($1::text, attrs -> $2::text, $3::text, attrs -> $4::text) AS attrs \
             FROM \"acme_sth_Room\" WHERE entity_name = $5 AND \"timestamp\" >= $6 \
             ORDER BY \"timestamp\" ASC OFFSET $7 LIMIT $8"
        );
    }

    #[test]
    fn test_find_sql_without_limit() {
        let query = RawQueryDescriptor {
            collection: "acme_sth_Room".to_string(),
            filter: range_filter(),
            projection: vec!["temperature".to_string()],
            sort: SortOrder::Descending,
            skip: 0,
            limit: 0,
        };
        assert_eq!(
            find_query(&query).sql(),
            "SELECT entity_name, entity_type, \"timestamp\", \
             jsonb_build_object($1::text, attrs -> $2::text) AS attrs \
             FROM \"acme_sth_Room\" WHERE entity_name = $3 AND \"timestamp\" >= $4 \
             AND \"timestamp\" <= $5 ORDER BY \"timestamp\" DESC OFFSET $6"
        );
    }

    #[test]
    fn test_count_sql() {
        let query = CountDescriptor {
            collection: "acme_sth_Room".to_string(),
            filter: SampleFilter {
                entity_name: "Room1".to_string(),
                from: None,
                to: None,
            },
        };
        assert_eq!(
            count_query(&query).sql(),
            "SELECT COUNT(*) AS total FROM \"acme_sth_Room\" WHERE entity_name = $1"
        );
    }

    #[test]
    fn test_half_hour_average_sql() {
        let pipeline = pipeline(AggregationPeriod::HalfHour, AggregationMethod::Avg);
        let expected = format!(
            "SELECT MIN(\"timestamp\") AS bucket_time, {} AS k0, {} AS k1, {} AS k2, {} AS k3, \
             to_jsonb(AVG(CASE WHEN jsonb_typeof(attrs -> $1::text) = 'number' \
             THEN (attrs ->> $2::text)::float8 END)) AS v0, \
             to_jsonb(AVG(CASE WHEN jsonb_typeof(attrs -> $3::text) = 'number' \
             THEN (attrs ->> $4::text)::float8 END)) AS v1 \
             FROM \"acme_sth_Room\" WHERE entity_name = $5 AND \"timestamp\" >= $6 \
             AND \"timestamp\" <= $7 GROUP BY k0, k1, k2, k3 ORDER BY bucket_time ASC",
            calendar_sql(CalendarField::Year),
            calendar_sql(CalendarField::DayOfYear),
            calendar_sql(CalendarField::Hour),
            calendar_sql(CalendarField::HalfHour),
        );
        assert_eq!(aggregate_query(&pipeline).sql(), expected);
    }

    #[test]
    fn test_weekly_max_and_sum_sql() {
        let max = aggregate_query(&pipeline(AggregationPeriod::Week, AggregationMethod::Max))
            .sql()
            .to_string();
        assert!(max.starts_with(&format!(
            "SELECT MIN(\"timestamp\") AS bucket_time, {} AS k0, {} AS k1, ",
            calendar_sql(CalendarField::Year),
            WEEK_SQL
        )));
        assert!(max.contains(
            "(array_agg(attrs -> $1::text ORDER BY CASE WHEN jsonb_typeof(attrs -> $2::text) \
             = 'number' THEN (attrs ->> $3::text)::float8 END DESC) \
             FILTER (WHERE jsonb_typeof(attrs -> $4::text) = 'number'))[1] AS v0, \
             (array_agg(attrs -> $5::text"
        ));
        assert!(max.ends_with(" GROUP BY k0, k1 ORDER BY bucket_time ASC"));

        let sum = aggregate_query(&pipeline(AggregationPeriod::Week, AggregationMethod::Sum))
            .sql()
            .to_string();
        assert!(sum.contains(
            "to_jsonb(COALESCE(SUM(CASE WHEN jsonb_typeof(attrs -> $1::text) = 'number' \
             THEN (attrs ->> $2::text)::float8 END), 0)) AS v0"
        ));
    }

    /// The week expression, evaluated with PostgreSQL's DOY (1-based) and DOW (Sunday = 0).
    #[test]
    fn test_week_sql_formula_matches_extract() {
        assert_eq!(calendar_sql(CalendarField::Week), WEEK_SQL);

        let mut day = Utc.with_ymd_and_hms(2018, 12, 25, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 1, 15, 12, 0, 0).unwrap();
        while day < end {
            let doy = day.ordinal() as i32;
            let dow = day.weekday().num_days_from_sunday() as i32;
            assert_eq!(
                (doy + 6 - dow) / 7,
                CalendarField::Week.extract(&day),
                "week of {}",
                day
            );
            day += chrono::Duration::days(1);
        }
    }
}
