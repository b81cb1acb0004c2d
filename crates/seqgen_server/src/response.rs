//! JSON response bodies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `/sequence/` responses and of every error response.
///
/// Empty fields are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceResponse {
    /// The requested key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// The sequence value.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub value: u64,
    /// Error description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl SequenceResponse {
    /// A successful response.
    pub fn value(key: impl Into<String>, value: u64) -> Self {
        Self {
            key: key.into(),
            value,
            error: String::new(),
        }
    }

    /// An error response.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Body of `/stat/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatResponse {
    /// Requests served per command (`ping`, `get`, `add`).
    pub request_count: BTreeMap<String, u64>,
    /// Server start, `YYYY-MM-DD HH:MM:SS` UTC.
    pub start_time: String,
    /// Last counted request, same format; empty before the first one.
    pub last_request_time: String,
    /// Number of keys in the engine.
    pub len: usize,
    /// Worker threads of the async runtime.
    #[serde(rename = "num_goroutine")]
    pub num_workers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_omitted() {
        let json = serde_json::to_string(&SequenceResponse::value("k", 7)).unwrap();
        assert_eq!(json, r#"{"key":"k","value":7}"#);

        let json = serde_json::to_string(&SequenceResponse::error("missing key")).unwrap();
        assert_eq!(json, r#"{"error":"missing key"}"#);

        let json = serde_json::to_string(&SequenceResponse::value("k", 0)).unwrap();
        assert_eq!(json, r#"{"key":"k"}"#);
    }

    #[test]
    fn stat_field_names() {
        let stat = StatResponse {
            request_count: BTreeMap::from([("get".to_string(), 2)]),
            start_time: "2024-01-02 03:04:05".into(),
            last_request_time: String::new(),
            len: 1,
            num_workers: 4,
        };
        let json = serde_json::to_value(&stat).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object["num_goroutine"], 4);
        assert!(!object.contains_key("num_workers"));
        assert_eq!(object["request_count"]["get"], 2);
        assert_eq!(object["len"], 1);
        assert_eq!(object["last_request_time"], "");
    }
}
