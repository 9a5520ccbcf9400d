use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// One accepted reading from the stream.
///
/// Required keys are always present; their values are kept as raw JSON and
/// only coerced to numbers when projected for display. Optional keys keep the
/// difference between "absent" (`None`) and "present but null" (`Some(Null)`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficPacket {
    pub segment: Value,
    pub pred_speed: Value,
    pub actual_speed: Value,
    pub timestamp: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_speed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    // any other keys the producer sent, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const REQUIRED_KEYS: [&str; 4] = ["segment", "pred_speed", "actual_speed", "timestamp"];

impl TrafficPacket {
    /// Builds a packet out of a decoded object. Returns the object back if any
    /// required key is missing.
    pub fn from_object(mut obj: Map<String, Value>) -> Result<Self, Map<String, Value>> {
        if !REQUIRED_KEYS.iter().all(|k| obj.contains_key(*k)) {
            return Err(obj);
        }
        let mut take = |k: &str| obj.remove(k);
        let segment = take("segment").unwrap_or(Value::Null);
        let pred_speed = take("pred_speed").unwrap_or(Value::Null);
        let actual_speed = take("actual_speed").unwrap_or(Value::Null);
        let timestamp = take("timestamp").unwrap_or(Value::Null);
        let avg_speed = take("avg_speed");
        let occupancy = take("occupancy");
        let status = take("status");
        Ok(Self {
            segment,
            pred_speed,
            actual_speed,
            timestamp,
            avg_speed,
            occupancy,
            status,
            extra: obj,
        })
    }

    /// Status text, when the producer sent it as a string.
    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().and_then(Value::as_str)
    }
}

/// Renders a raw JSON value the way a template would interpolate it:
/// strings without quotes, null as nothing.
pub fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A timestamped line in the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEvent {
    pub time: String,
    pub message: String,
}

impl ActivityEvent {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.time, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies one link; events from a superseded link carry a stale id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_optional_fields_keep_null_vs_absent() {
        let p = TrafficPacket::from_object(obj(json!({
            "segment": "S1", "pred_speed": 50, "actual_speed": 48,
            "timestamp": "t", "avg_speed": null
        })))
        .unwrap();
        assert_eq!(p.avg_speed, Some(Value::Null));
        assert_eq!(p.occupancy, None);
        assert!(p.extra.is_empty());
    }

    #[test]
    fn test_extra_keys_pass_through() {
        let p = TrafficPacket::from_object(obj(json!({
            "segment": "S1", "pred_speed": 50, "actual_speed": 48,
            "timestamp": "t", "lane": 2
        })))
        .unwrap();
        assert_eq!(p.extra.get("lane"), Some(&json!(2)));
        let out = serde_json::to_value(&p).unwrap();
        assert_eq!(out["lane"], json!(2));
        assert!(out.get("status").is_none());
    }

    #[test]
    fn test_missing_required_key_returns_object() {
        let back = TrafficPacket::from_object(obj(json!({"segment": "S1"}))).unwrap_err();
        assert_eq!(back.get("segment"), Some(&json!("S1")));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("S1")), "S1");
        assert_eq!(display_value(&json!(7)), "7");
        assert_eq!(display_value(&Value::Null), "");
    }
}
