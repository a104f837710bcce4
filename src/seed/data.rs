use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::model::{collection_name, AttributeParsers, SampleDocument};
use crate::store::MemoryStore;

pub const SEED_TENANT: &str = "test_tenant";
pub const SEED_ENTITY_TYPE: &str = "test_sensor";
pub const SEED_SENSORS: usize = 3;
pub const SEED_SAMPLES_PER_SENSOR: usize = 1000;
/// Seconds between two samples of the same sensor
pub const SEED_INTERVAL_SECS: i64 = 30;

pub fn seed_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// (attribute, declared type, raw reading) for sample `nr` of sensor `sensor`
fn readings(sensor: usize, nr: usize) -> Vec<(&'static str, &'static str, String)> {
    let phase = nr as f64 / 120.0 + sensor as f64;
    vec![
        ("temperature", "Float", format!("{:.2}", 7.5 + 27.5 * phase.sin())),
        ("humidity", "Float", format!("{:.2}", 50.0 + 50.0 * phase.cos())),
        ("airPressure", "Float", format!("{:.1}", 1000.0 + 100.0 * (phase / 2.0).sin())),
        ("pm10", "Int", format!("{}", (nr * 7 + sensor * 11) % 70)),
        ("pm25", "Int", format!("{}", (nr * 3 + sensor * 5) % 70)),
        ("location", "Location", format!("{:.4},{:.4}", 52.52 + sensor as f64 / 100.0, 13.405)),
    ]
}

/// Demo samples: `sensors` sensors named `sensor_<n>`, `samples` readings each,
/// every `SEED_INTERVAL_SECS` seconds from `seed_start()`.
pub fn seed_documents(sensors: usize, samples: usize) -> Result<Vec<SampleDocument>> {
    let parsers = AttributeParsers::default();
    let mut docs = Vec::with_capacity(sensors * samples);

    for sensor in 0..sensors {
        let entity_name = format!("sensor_{}", sensor);
        for nr in 0..samples {
            let timestamp = seed_start() + Duration::seconds(SEED_INTERVAL_SECS * nr as i64);
            let mut doc = SampleDocument::new(&entity_name, SEED_ENTITY_TYPE, timestamp);
            for (name, type_name, raw) in readings(sensor, nr) {
                doc = doc.with_attribute(name, parsers.parse(type_name, &raw)?);
            }
            docs.push(doc);
        }
    }

    Ok(docs)
}

/// Fill the in-memory store with the demo data set. Returns the number of samples.
pub fn load_seed_data(store: &MemoryStore, prefix: &str) -> Result<usize> {
    let docs = seed_documents(SEED_SENSORS, SEED_SAMPLES_PER_SENSOR)?;
    let count = docs.len();
    store.insert_many(&collection_name(prefix, SEED_TENANT, SEED_ENTITY_TYPE), docs);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seed_documents() {
        let docs = seed_documents(2, 10).unwrap();
        assert_eq!(docs.len(), 20);
        assert_eq!(docs[0].entity_name, "sensor_0");
        assert_eq!(docs[10].entity_name, "sensor_1");
        assert_eq!(docs[9].timestamp, seed_start() + Duration::seconds(270));
        assert!(docs[0].attributes["temperature"].is_f64());
        assert!(docs[0].attributes["pm10"].is_i64());
        assert_eq!(docs[0].attributes["location"]["type"], json!("Point"));
    }

    #[test]
    fn test_load_seed_data() {
        let store = MemoryStore::new();
        let loaded = load_seed_data(&store, "sth_").unwrap();
        assert_eq!(loaded, SEED_SENSORS * SEED_SAMPLES_PER_SENSOR);
        assert_eq!(store.len("test_tenant_sth_test_sensor"), loaded);
    }
}
