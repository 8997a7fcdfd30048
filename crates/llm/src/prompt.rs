//! Chat message types

use serde::{Deserialize, Serialize};
use std::fmt;

use frontdesk_core::ChatRequest;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Expand a two-part request into the wire message list.
pub fn messages_for(request: &ChatRequest) -> Vec<Message> {
    vec![
        Message::system(&request.system_prompt),
        Message::user(&request.user_prompt),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_for_request() {
        let request = ChatRequest::new("be brief", "hello");
        let messages = messages_for(&request);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
