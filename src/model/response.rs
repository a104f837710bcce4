use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Top-level body of a successful query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponses {
    pub context_responses: Vec<ContextResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    pub context_element: ContextElement,
    pub status_code: StatusBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextElement {
    pub id: String,
    pub is_pattern: bool,
    pub attributes: Vec<AttributeSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSeries {
    pub name: String,
    pub values: Vec<AttributeSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSample {
    #[serde(serialize_with = "serialize_recv_time")]
    pub recv_time: DateTime<Utc>,
    pub attr_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBlock {
    pub code: u16,
    pub reason_phrase: String,
}

impl StatusBlock {
    pub fn ok() -> Self {
        Self {
            code: 200,
            reason_phrase: "OK".to_string(),
        }
    }
}

/// `2019-01-01T08:10:00.000Z`
fn serialize_recv_time<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let response = ContextResponses {
            context_responses: vec![ContextResponse {
                context_element: ContextElement {
                    id: "sensor_2".to_string(),
                    is_pattern: false,
                    attributes: vec![AttributeSeries {
                        name: "temperature".to_string(),
                        values: vec![AttributeSample {
                            recv_time: Utc.with_ymd_and_hms(2019, 1, 1, 8, 10, 0).unwrap(),
                            attr_value: json!(21.5),
                        }],
                    }],
                    count: None,
                },
                status_code: StatusBlock::ok(),
            }],
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "contextResponses": [{
                    "contextElement": {
                        "id": "sensor_2",
                        "isPattern": false,
                        "attributes": [{
                            "name": "temperature",
                            "values": [{"recvTime": "2019-01-01T08:10:00.000Z", "attrValue": 21.5}]
                        }]
                    },
                    "statusCode": {"code": 200, "reasonPhrase": "OK"}
                }]
            })
        );
    }

    #[test]
    fn test_count_is_serialized_when_present() {
        let element = ContextElement {
            id: "e".to_string(),
            is_pattern: false,
            attributes: vec![],
            count: Some(1000),
        };
        let value = serde_json::to_value(&element).unwrap();
        assert_eq!(value["count"], json!(1000));
        assert_eq!(value["attributes"], json!([]));
    }
}
