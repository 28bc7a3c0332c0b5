use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 推送到令牌下的一条通知
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub message: String,
    /// ISO-8601 UTC，毫秒精度，例如 `2024-01-01T00:00:00.000Z`
    pub timestamp: String,
}

impl Notification {
    pub fn new(message: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message: message.to_string(),
            timestamp: format_timestamp(now),
        }
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_uses_millisecond_iso_format() {
        let at = DateTime::from_timestamp(1_704_067_200, 5_000_000).unwrap();
        assert_eq!(format_timestamp(at), "2024-01-01T00:00:00.005Z");
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let at = DateTime::from_timestamp(1_704_067_200, 0).unwrap();
        let notification = Notification::new("hello", at);
        let json = serde_json::to_value(&notification).unwrap();

        assert_eq!(json["message"], "hello");
        assert_eq!(json["timestamp"], "2024-01-01T00:00:00.000Z");
        assert!(!json["id"].as_str().unwrap().is_empty());
    }
}
