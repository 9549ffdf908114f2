use serde::Deserialize;
use serde_json::Value;

use crate::provenance::{self, ProvenanceRecord};

// Wire message shape, limited to the fields the mirror reads.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    pub id: String,
    pub author: AuthorPayload,
    pub timestamp: String,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorPayload {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
}

/// Whether a record is a first-hand message or a relay copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOrigin {
    Organic,
    /// `copy_id` is the copy's own wire-assigned id; `relayed_by` is the
    /// account that physically posted it.
    Relayed { copy_id: String, relayed_by: String },
}

/// A message under its logical identity. For a relayed copy the id, author
/// fields, and timestamps are the original's, recovered from the provenance
/// header; the wire-level facts live in [`MessageOrigin::Relayed`].
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: String,
    pub channel_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub global_name: Option<String>,
    pub timestamp: String,
    pub last_edit: Option<String>,
    pub tts: bool,
    /// Full body as stored remotely, header included for relayed copies.
    pub content: String,
    pub origin: MessageOrigin,
}

impl MessageRecord {
    pub fn from_wire(channel_id: &str, raw: Value) -> Result<Self, serde_json::Error> {
        let payload: MessagePayload = serde_json::from_value(raw)?;
        Ok(Self::from_payload(channel_id, payload))
    }

    pub fn from_payload(channel_id: &str, payload: MessagePayload) -> Self {
        let first_line = payload.content.lines().next().unwrap_or_default();
        if let Some(record) = provenance::decode(first_line) {
            return Self {
                id: record.id,
                channel_id: channel_id.to_string(),
                username: record.username,
                display_name: record.display_name,
                global_name: record.global_name,
                timestamp: record.timestamp,
                last_edit: record.edited_timestamp,
                tts: payload.tts,
                content: payload.content,
                origin: MessageOrigin::Relayed {
                    copy_id: payload.id,
                    relayed_by: payload.author.username,
                },
            };
        }
        Self {
            id: payload.id,
            channel_id: channel_id.to_string(),
            username: payload.author.username,
            display_name: payload.author.display_name,
            global_name: payload.author.global_name,
            timestamp: payload.timestamp,
            last_edit: payload.edited_timestamp,
            tts: payload.tts,
            content: payload.content,
            origin: MessageOrigin::Organic,
        }
    }

    /// The id that addresses this record on the wire; a relayed copy uses
    /// its own id, not the original's.
    pub fn wire_id(&self) -> &str {
        match &self.origin {
            MessageOrigin::Relayed { copy_id, .. } => copy_id,
            MessageOrigin::Organic => &self.id,
        }
    }

    /// True when this record is a relay copy posted by `client_username`.
    pub fn is_relay_copy_by(&self, client_username: &str) -> bool {
        matches!(&self.origin, MessageOrigin::Relayed { relayed_by, .. } if relayed_by == client_username)
    }
}

impl From<&MessageRecord> for ProvenanceRecord {
    fn from(record: &MessageRecord) -> Self {
        ProvenanceRecord {
            username: record.username.clone(),
            display_name: record.display_name.clone(),
            global_name: record.global_name.clone(),
            timestamp: record.timestamp.clone(),
            edited_timestamp: record.last_edit.clone(),
            id: record.id.clone(),
        }
    }
}

// Matching identity across channels. A copy compares equal to its original
// because id, username, and timestamp are recovered from the provenance
// header; content is not part of identity, so an edited original still
// matches its stale copy.
impl PartialEq for MessageRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.username == other.username && self.timestamp == other.timestamp
    }
}

impl Eq for MessageRecord {}
