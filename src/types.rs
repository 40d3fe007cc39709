use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "system")]
    System,
}

/// One turn of conversation as exchanged with clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Stored message. Fields missing from older records are filled in on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default = "generate_id")]
    pub id: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default = "now_millis")]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    #[serde(default = "generate_id")]
    pub id: String,
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default = "now_millis")]
    pub created_at: i64,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Material uploaded into a session, kept alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub const UNTITLED_SESSION: &str = "Conversa sem título";

fn untitled() -> String {
    UNTITLED_SESSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults_fill_missing_fields() {
        let session: ChatSession =
            serde_json::from_str(r#"{"messages":[{"content":"oi"}]}"#).unwrap();
        assert!(!session.id.is_empty());
        assert_eq!(session.title, UNTITLED_SESSION);
        assert!(session.created_at > 0);
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].content, "oi");
        assert!(!session.messages[0].id.is_empty());
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let session = ChatSession {
            id: "abc".into(),
            title: "t".into(),
            created_at: 1,
            messages: vec![],
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["createdAt"], 1);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let parsed: Result<ChatMessage, _> =
            serde_json::from_str(r#"{"role":"tool","content":"x"}"#);
        assert!(parsed.is_err());
    }
}
