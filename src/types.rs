use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One house row as served by `/api/leaderboard/` and the live channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub points: i64,
    /// Crest image URL; empty when the house has none.
    #[serde(default)]
    pub crest: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NotificationItem {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct NotificationSummary {
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub notifications: Vec<NotificationItem>,
}

/// Reply from the save-subscription and mark-read endpoints.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// A message pushed over the live channel.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundMessage {
    LeaderboardUpdate(Vec<LeaderboardEntry>),
    Notification(String),
    /// Any other `type`; carries the kind for logging.
    Unknown(String),
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Option<Vec<LeaderboardEntry>>,
    #[serde(default)]
    message: Option<String>,
}

impl InboundMessage {
    /// Parse a text frame. Unrecognised kinds, and known kinds missing their
    /// payload, come back as `Unknown` so they are logged and skipped.
    /// Malformed JSON is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawMessage = serde_json::from_str(text)?;
        let kind = raw.kind.unwrap_or_default();
        Ok(match kind.as_str() {
            "leaderboard_update" => match raw.data {
                Some(entries) => InboundMessage::LeaderboardUpdate(entries),
                None => InboundMessage::Unknown(kind),
            },
            "notification" => match raw.message {
                Some(message) => InboundMessage::Notification(message),
                None => InboundMessage::Unknown(kind),
            },
            _ => InboundMessage::Unknown(kind),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leaderboard_update() {
        let msg = InboundMessage::parse(
            r#"{"type":"leaderboard_update","data":[{"id":1,"name":"Gryffindor","points":100,"crest":"/media/g.png"}]}"#,
        )
        .unwrap();
        match msg {
            InboundMessage::LeaderboardUpdate(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].name, "Gryffindor");
                assert_eq!(entries[0].points, 100);
                assert_eq!(entries[0].crest, "/media/g.png");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_notification() {
        let msg = InboundMessage::parse(r#"{"type":"notification","message":"Results are in"}"#).unwrap();
        assert_eq!(msg, InboundMessage::Notification("Results are in".into()));
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        let msg = InboundMessage::parse(r#"{"type":"unknown_kind"}"#).unwrap();
        assert_eq!(msg, InboundMessage::Unknown("unknown_kind".into()));
    }

    #[test]
    fn leaderboard_update_without_data_is_skipped() {
        let missing = InboundMessage::parse(r#"{"type":"leaderboard_update"}"#).unwrap();
        let null = InboundMessage::parse(r#"{"type":"leaderboard_update","data":null}"#).unwrap();
        assert_eq!(missing, InboundMessage::Unknown("leaderboard_update".into()));
        assert_eq!(null, InboundMessage::Unknown("leaderboard_update".into()));
    }

    #[test]
    fn empty_leaderboard_is_still_an_update() {
        let msg = InboundMessage::parse(r#"{"type":"leaderboard_update","data":[]}"#).unwrap();
        assert_eq!(msg, InboundMessage::LeaderboardUpdate(vec![]));
    }

    #[test]
    fn notification_without_message_is_skipped() {
        let msg = InboundMessage::parse(r#"{"type":"notification"}"#).unwrap();
        assert_eq!(msg, InboundMessage::Unknown("notification".into()));
    }

    #[test]
    fn broken_json_is_an_error() {
        assert!(InboundMessage::parse("{not json").is_err());
    }

    #[test]
    fn summary_tolerates_missing_list() {
        let summary: NotificationSummary = serde_json::from_str(r#"{"unread_count":3}"#).unwrap();
        assert_eq!(summary.unread_count, 3);
        assert!(summary.notifications.is_empty());
    }

    #[test]
    fn status_response_success() {
        let ok: StatusResponse = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        let err: StatusResponse = serde_json::from_str(r#"{"status":"error","message":"bad keys"}"#).unwrap();
        assert!(ok.is_success());
        assert!(!err.is_success());
        assert_eq!(err.message.as_deref(), Some("bad keys"));
    }
}
