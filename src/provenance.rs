use serde_json::{Map, Value, json};

/// Lines a relayed message body spends on provenance before the actual text.
pub(crate) const RELAY_HEADER_LINES: usize = 2;

const ABSENT: &str = "None";

/// Key sequence the first line of a relayed body must carry, in this order.
const SCHEMA_KEYS: [&str; 6] = [
    "username",
    "display_name",
    "global_name",
    "timestamp",
    "edited_timestamp",
    "id",
];

/// Identity of the original message, as remembered inside the body of its
/// relayed copy. The remote service offers no metadata field on messages, so
/// this rides in the first line of the copy's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceRecord {
    pub username: String,
    pub display_name: Option<String>,
    pub global_name: Option<String>,
    pub timestamp: String,
    pub edited_timestamp: Option<String>,
    pub id: String,
}

impl ProvenanceRecord {
    /// Renders the two header lines prefixed to a relayed body: the JSON
    /// record, then a readable marker line, each newline-terminated.
    pub fn header(&self) -> String {
        let record = json!({
            "username": self.username,
            "display_name": encode_absent(self.display_name.as_deref()),
            "global_name": encode_absent(self.global_name.as_deref()),
            "timestamp": self.timestamp,
            "edited_timestamp": encode_absent(self.edited_timestamp.as_deref()),
            "id": self.id,
        });
        format!("{record}\n```[{}] {}:```\n", self.timestamp, self.username)
    }
}

/// Parses the first line of a message body as a provenance record.
///
/// Anything that is not a JSON object with exactly the schema keys in schema
/// order, all values strings, yields `None` and the message counts as
/// organic. The literal string "None" marks an absent value; an absent
/// username, timestamp, or id invalidates the whole record.
pub fn decode(first_line: &str) -> Option<ProvenanceRecord> {
    let value: Value = serde_json::from_str(first_line).ok()?;
    let Value::Object(fields) = value else {
        return None;
    };
    if !fields.keys().map(String::as_str).eq(SCHEMA_KEYS) {
        return None;
    }
    Some(ProvenanceRecord {
        username: required(&fields, "username")?,
        display_name: optional(&fields, "display_name")?,
        global_name: optional(&fields, "global_name")?,
        timestamp: required(&fields, "timestamp")?,
        edited_timestamp: optional(&fields, "edited_timestamp")?,
        id: required(&fields, "id")?,
    })
}

fn encode_absent(value: Option<&str>) -> &str {
    value.unwrap_or(ABSENT)
}

fn required(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(text) if text != ABSENT => Some(text.clone()),
        _ => None,
    }
}

fn optional(fields: &Map<String, Value>, key: &str) -> Option<Option<String>> {
    match fields.get(key)? {
        Value::String(text) if text == ABSENT => Some(None),
        Value::String(text) => Some(Some(text.clone())),
        _ => None,
    }
}
