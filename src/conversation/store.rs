//! Message records and the conversation store.

use serde::Serialize;

/// Identifier of a message within one conversation.
pub type MessageId = u64;

/// Kind of record shown in the message list.
///
/// Only plain messages exist today; the field is kept on the wire so the
/// rendered transcript matches what the backend-facing page expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A chat message.
    #[default]
    Message,
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store-assigned identifier.
    pub id: MessageId,
    /// Text shown for this message.
    pub content: String,
    /// Whether the user wrote this message.
    pub is_user: bool,
    /// Record kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Set while a reply is waiting for its first fragment.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_loading: bool,
}

/// A message that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Text to show.
    pub content: String,
    /// Whether the user wrote it.
    pub is_user: bool,
    /// Whether it is a reply still waiting for content.
    pub is_loading: bool,
}

impl NewMessage {
    /// A message typed by the user.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: true,
            is_loading: false,
        }
    }

    /// A finished message from the assistant.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: false,
            is_loading: false,
        }
    }

    /// An empty assistant reply that is still loading.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            content: String::new(),
            is_user: false,
            is_loading: true,
        }
    }
}

/// Partial update merged into an existing message.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePatch {
    /// New content, if it changes.
    pub content: Option<String>,
    /// New loading flag, if it changes.
    pub is_loading: Option<bool>,
}

impl MessagePatch {
    /// Replace the content.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            is_loading: None,
        }
    }

    /// Also clear the loading flag.
    #[must_use]
    pub fn loaded(mut self) -> Self {
        self.is_loading = Some(false);
        self
    }

    fn apply(self, message: &mut Message) {
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(is_loading) = self.is_loading {
            message.is_loading = is_loading;
        }
    }
}

/// Ordered message sequence for one chat session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return the id assigned to it.
    ///
    /// The id is one more than the largest id present, or `1` when empty.
    pub fn append(&mut self, message: NewMessage) -> MessageId {
        let id = self.last_id().map_or(1, |max| max + 1);
        self.messages.push(Message {
            id,
            content: message.content,
            is_user: message.is_user,
            kind: MessageKind::Message,
            is_loading: message.is_loading,
        });
        id
    }

    /// Merge `patch` into the message with `id`.
    ///
    /// Returns `false`, leaving the conversation untouched, when no message
    /// has that id.
    pub fn patch(&mut self, id: MessageId, patch: MessagePatch) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                patch.apply(message);
                true
            }
            None => false,
        }
    }

    /// Look up a message by id.
    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// All messages in display order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Largest id in the conversation.
    #[must_use]
    pub fn last_id(&self) -> Option<MessageId> {
        self.messages.iter().map(|m| m.id).max()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_id_is_one() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.append(NewMessage::user("hi")), 1);
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut conversation = Conversation::new();
        let ids: Vec<_> = (0..20)
            .map(|i| {
                if i % 3 == 0 {
                    conversation.append(NewMessage::placeholder())
                } else {
                    conversation.append(NewMessage::user(format!("m{i}")))
                }
            })
            .collect();

        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        let stored: Vec<_> = conversation.messages().iter().map(|m| m.id).collect();
        assert_eq!(stored, ids);
    }

    #[test]
    fn test_patch_merges_fields() {
        let mut conversation = Conversation::new();
        let id = conversation.append(NewMessage::placeholder());

        assert!(conversation.patch(id, MessagePatch::content("partial")));
        let message = conversation.get(id).unwrap();
        assert_eq!(message.content, "partial");
        assert!(message.is_loading);

        assert!(conversation.patch(id, MessagePatch::content("done").loaded()));
        let message = conversation.get(id).unwrap();
        assert_eq!(message.content, "done");
        assert!(!message.is_loading);
        assert!(!message.is_user);
    }

    #[test]
    fn test_patch_missing_id_is_noop() {
        let mut conversation = Conversation::new();
        conversation.append(NewMessage::assistant("greeting"));
        conversation.append(NewMessage::user("question"));
        let before = conversation.messages().to_vec();

        assert!(!conversation.patch(42, MessagePatch::content("x").loaded()));
        assert_eq!(conversation.messages(), before.as_slice());
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let mut conversation = Conversation::new();
        let id = conversation.append(NewMessage::placeholder());
        let json = serde_json::to_value(conversation.get(id).unwrap()).unwrap();

        assert_eq!(json["type"], "message");
        assert_eq!(json["isUser"], false);
        assert_eq!(json["isLoading"], true);
    }
}
