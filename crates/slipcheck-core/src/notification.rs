//! Win/loss notifications as delivered by the backend.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Win,
    Loss,
    DrawAnnouncement,
    #[default]
    General,
    Other(String),
}

impl From<String> for NotificationKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "win" => NotificationKind::Win,
            "loss" => NotificationKind::Loss,
            "draw_announcement" => NotificationKind::DrawAnnouncement,
            "general" | "" => NotificationKind::General,
            _ => NotificationKind::Other(s),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(k: NotificationKind) -> Self {
        match k {
            NotificationKind::Win => "win".into(),
            NotificationKind::Loss => "loss".into(),
            NotificationKind::DrawAnnouncement => "draw_announcement".into(),
            NotificationKind::General => "general".into(),
            NotificationKind::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// Extra detail such as draw date and prize. Older rows store it as an
    /// encoded JSON string, which is decoded here when possible.
    #[serde(default, deserialize_with = "decode_data")]
    pub data: Value,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Notification {
    /// A string field from `data`, e.g. `prize_amount` or `draw_date`.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationFilter {
    #[default]
    All,
    Unread,
    Read,
}

impl NotificationFilter {
    pub fn matches(&self, n: &Notification) -> bool {
        match self {
            NotificationFilter::All => true,
            NotificationFilter::Unread => !n.is_read,
            NotificationFilter::Read => n.is_read,
        }
    }

    pub fn filter<'a>(&self, notifications: &'a [Notification]) -> Vec<&'a Notification> {
        notifications.iter().filter(|n| self.matches(n)).collect()
    }
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

fn decode_data<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        other => other,
    })
}
