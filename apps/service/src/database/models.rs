use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user owning targets and, optionally, a linked chat for alerts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    pub username: String,
    pub telegram_chat_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Owner {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            telegram_chat_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_telegram_chat(mut self, chat_id: i64) -> Self {
        self.telegram_chat_id = Some(chat_id);
        self
    }
}

/// Convert a timestamp to Unix seconds for storage
pub fn timestamp_to_i64(time: DateTime<Utc>) -> i64 {
    time.timestamp()
}

/// Convert stored Unix seconds back to a timestamp
pub fn i64_to_timestamp(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0).single().unwrap_or_default()
}
