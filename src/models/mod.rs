use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder returned when the address cell cannot be located
pub const ADDRESS_NOT_FOUND: &str = "Address not found";

/// Placeholder returned when the days-on-market cell cannot be located
pub const DAYS_ON_MARKET_NOT_FOUND: &str = "Days on market not found";

/// Incoming extraction request
///
/// Both fields are optional at the parsing level so that the extractor, not
/// the JSON layer, decides which validation failure wins. A value of the wrong
/// JSON type is read as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(
        default,
        alias = "agentName",
        alias = "name",
        deserialize_with = "string_or_absent"
    )]
    pub agent_identifier: Option<String>,
    #[serde(default, alias = "apiKey", deserialize_with = "string_or_absent")]
    pub credential: Option<String>,
}

fn string_or_absent<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Data pulled from an agent's first listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub address: String,
    pub days_on_market: String,
    pub first_room_image: Option<String>,
}

impl Default for ListingRecord {
    fn default() -> Self {
        Self {
            address: ADDRESS_NOT_FOUND.to_string(),
            days_on_market: DAYS_ON_MARKET_NOT_FOUND.to_string(),
            first_room_image: None,
        }
    }
}

/// Uniform failure body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
}

/// Typed answer from the room classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomVerdict {
    Room,
    NotRoom,
    /// Transport failure or a reply that was neither yes nor no
    Unknown,
}

impl RoomVerdict {
    /// Interpret a free-text reply. Any reply containing "yes" counts as a room.
    pub fn from_reply(reply: &str) -> Self {
        let reply = reply.to_lowercase();
        if reply.contains("yes") {
            RoomVerdict::Room
        } else if reply.contains("no") {
            RoomVerdict::NotRoom
        } else {
            RoomVerdict::Unknown
        }
    }

    pub fn is_room(self) -> bool {
        matches!(self, RoomVerdict::Room)
    }
}

/// Where a debug capture was written
#[derive(Debug, Clone)]
pub struct DebugCapture {
    pub slug: String,
    pub html_path: Option<String>,
    pub screenshot_path: Option<String>,
    pub captured_at: DateTime<Utc>,
}
