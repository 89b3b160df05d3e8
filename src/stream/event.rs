//! Event records carried in the `data:` field of each stream frame.
//!
//! The backend sends one JSON object per frame:
//!
//! ```text
//! data: {"type": "checkpoint", "checkpoint_id": "6f1c..."}
//! data: {"type": "content", "content": "Hel"}
//! data: {"type": "end"}
//! ```

use serde::{Deserialize, Serialize};

/// Kind of a stream event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Backend issued a checkpoint token for the conversation.
    Checkpoint,
    /// A fragment of the reply text.
    Content,
    /// The reply is complete.
    End,
    /// Any type this client does not know about.
    #[serde(other)]
    Unknown,
}

/// A parsed stream event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Event type (`type` on the wire).
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Token to send back on the next turn. Set on `checkpoint` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
    /// Reply fragment. Set on `content` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl StreamEvent {
    /// Parse a frame payload.
    pub fn parse(data: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    #[must_use]
    pub fn checkpoint(checkpoint_id: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Checkpoint,
            checkpoint_id: Some(checkpoint_id.into()),
            content: None,
        }
    }

    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Content,
            checkpoint_id: None,
            content: Some(content.into()),
        }
    }

    #[must_use]
    pub fn end() -> Self {
        Self {
            kind: EventKind::End,
            checkpoint_id: None,
            content: None,
        }
    }

    /// Encode as a single SSE frame.
    #[must_use]
    pub fn to_sse(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"end"}"#.to_string());
        format!("data: {json}\n\n")
    }

    #[must_use]
    pub fn is_checkpoint(&self) -> bool {
        self.kind == EventKind::Checkpoint
    }

    #[must_use]
    pub fn is_content(&self) -> bool {
        self.kind == EventKind::Content
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.kind == EventKind::End
    }
}
