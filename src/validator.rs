use serde_json::Value;

use crate::error::Rejection;
use crate::types::TrafficPacket;

/// Number of characters of a rejected payload quoted back in the log.
pub const PREVIEW_CHARS: usize = 120;

/// Checks one inbound text frame.
///
/// Only key presence is checked here; values stay untyped until the view
/// model coerces them. A payload that decodes to something other than an
/// object is treated as non-conforming.
pub fn validate(raw: &str) -> Result<TrafficPacket, Rejection> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| Rejection::ParseError(e.to_string()))?;

    match value {
        Value::Object(obj) => {
            TrafficPacket::from_object(obj).map_err(|_| Rejection::NonConforming(preview(raw)))
        }
        _ => Err(Rejection::NonConforming(preview(raw))),
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_CHARS).collect()
}
