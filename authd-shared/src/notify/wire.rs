/// Redis Stream entry format for notifications
///
/// Each entry carries two fields:
///
/// ```text
/// key:     "a@x.com"
/// payload: "{\"kind\":\"confirmation_email\",\"to_email\":\"a@x.com\",...}"
/// ```

use redis::streams::StreamId;
use std::collections::HashMap;

use super::{Notification, NotifyError};

pub const KEY_FIELD: &str = "key";
pub const PAYLOAD_FIELD: &str = "payload";

/// Field/value pairs for `XADD`
pub fn encode(key: &str, message: &Notification) -> Result<Vec<(&'static str, String)>, NotifyError> {
    Ok(vec![
        (KEY_FIELD, key.to_string()),
        (PAYLOAD_FIELD, serde_json::to_string(message)?),
    ])
}

/// Parses already-stringified entry fields
pub fn decode(fields: &HashMap<String, String>) -> Result<(String, Notification), NotifyError> {
    let key = fields
        .get(KEY_FIELD)
        .ok_or_else(|| NotifyError::InvalidMessage(format!("missing field {}", KEY_FIELD)))?;
    let payload = fields
        .get(PAYLOAD_FIELD)
        .ok_or_else(|| NotifyError::InvalidMessage(format!("missing field {}", PAYLOAD_FIELD)))?;

    Ok((key.clone(), serde_json::from_str(payload)?))
}

/// Parses one entry as returned by `XREAD`/`XREADGROUP`
pub fn decode_entry(entry: &StreamId) -> Result<(String, Notification), NotifyError> {
    let mut fields = HashMap::with_capacity(entry.map.len());

    for (name, value) in &entry.map {
        let text = redis::from_redis_value::<String>(value).map_err(|e| {
            NotifyError::InvalidMessage(format!("field {} is not a string: {}", name, e))
        })?;
        fields.insert(name.clone(), text);
    }

    decode(&fields)
}
