//! Typed parsing of attribute values that arrive as text.
//!
//! Values in the store are already typed, so queries never need this. It is the
//! capability a write path (or the seed loader) uses to turn `"21.5"` declared as
//! `Float` into a JSON number before it is stored.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;

pub type ParseFn = Box<dyn Fn(&str) -> Result<Value> + Send + Sync>;

/// Type name -> parser
pub struct AttributeParsers {
    parsers: HashMap<String, ParseFn>,
}

impl AttributeParsers {
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    pub fn register(&mut self, type_name: &str, parser: ParseFn) {
        self.parsers.insert(type_name.to_string(), parser);
    }

    pub fn supports(&self, type_name: &str) -> bool {
        self.parsers.contains_key(type_name)
    }

    pub fn parse(&self, type_name: &str, raw: &str) -> Result<Value> {
        let parser = self
            .parsers
            .get(type_name)
            .ok_or_else(|| anyhow!("No parser registered for type '{}'", type_name))?;
        parser(raw).with_context(|| format!("Invalid {} value '{}'", type_name, raw))
    }
}

impl Default for AttributeParsers {
    fn default() -> Self {
        let mut parsers = Self::empty();
        parsers.register("Float", Box::new(parse_float));
        parsers.register("Int", Box::new(parse_int));
        parsers.register("Integer", Box::new(parse_int));
        parsers.register("Date", Box::new(parse_date));
        parsers.register("String", Box::new(parse_string));
        parsers.register("Location", Box::new(parse_location));
        parsers
    }
}

fn parse_float(s: &str) -> Result<Value> {
    let value: f64 = s.trim().parse()?;
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| anyhow!("not a finite number"))
}

fn parse_int(s: &str) -> Result<Value> {
    let value: i64 = s.trim().parse()?;
    Ok(json!(value))
}

fn parse_string(s: &str) -> Result<Value> {
    Ok(Value::String(s.to_string()))
}

fn parse_date(s: &str) -> Result<Value> {
    let ts: DateTime<Utc> = DateTime::parse_from_rfc3339(s.trim())?.with_timezone(&Utc);
    Ok(json!(ts))
}

/// `"lat,lon"` -> GeoJSON point, coordinates in `[lon, lat]` order
fn parse_location(s: &str) -> Result<Value> {
    let parts = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let [lat, lon] = parts.as_slice() else {
        return Err(anyhow!("expected 'lat,lon'"));
    };
    Ok(json!({ "type": "Point", "coordinates": [lon, lat] }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_parsers() {
        let parsers = AttributeParsers::default();
        assert_eq!(parsers.parse("Float", "21.5").unwrap(), json!(21.5));
        assert_eq!(parsers.parse("Int", "42").unwrap(), json!(42));
        assert_eq!(parsers.parse("Integer", " 7 ").unwrap(), json!(7));
        assert!(parsers.parse("Int", "4.2").is_err());
        assert!(parsers.parse("Float", "warm").is_err());
    }

    #[test]
    fn test_location_is_reversed_into_geojson() {
        let parsers = AttributeParsers::default();
        assert_eq!(
            parsers.parse("Location", "52.52,13.405").unwrap(),
            json!({"type": "Point", "coordinates": [13.405, 52.52]})
        );
        assert!(parsers.parse("Location", "52.52").is_err());
    }

    #[test]
    fn test_date_and_string() {
        let parsers = AttributeParsers::default();
        assert_eq!(
            parsers.parse("Date", "2019-01-01T00:00:00Z").unwrap(),
            json!("2019-01-01T00:00:00Z")
        );
        assert_eq!(parsers.parse("String", "on").unwrap(), json!("on"));
    }

    #[test]
    fn test_unknown_type_and_custom_parser() {
        let mut parsers = AttributeParsers::default();
        assert!(!parsers.supports("Boolean"));
        assert!(parsers.parse("Boolean", "true").is_err());

        parsers.register("Boolean", Box::new(|s: &str| -> Result<Value> { Ok(Value::Bool(s == "true")) }));
        assert!(parsers.supports("Boolean"));
        assert_eq!(parsers.parse("Boolean", "true").unwrap(), json!(true));
    }
}
