use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Active,
    Messaged,
    Blocked,
    Invalid,
    InvalidRecipient,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Active => "active",
            DeliveryStatus::Messaged => "messaged",
            DeliveryStatus::Blocked => "blocked",
            DeliveryStatus::Invalid => "invalid",
            DeliveryStatus::InvalidRecipient => "invalid_recipient",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(DeliveryStatus::Active),
            "messaged" => Some(DeliveryStatus::Messaged),
            "blocked" => Some(DeliveryStatus::Blocked),
            "invalid" => Some(DeliveryStatus::Invalid),
            "invalid_recipient" => Some(DeliveryStatus::InvalidRecipient),
            _ => None,
        }
    }
}

/// A message destination. Mutated at most once per send attempt per cycle;
/// only `active` recipients are eligible for dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub username: String,
    pub status: DeliveryStatus,
    pub message_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<i64>,
    pub imported_at: i64,
}
