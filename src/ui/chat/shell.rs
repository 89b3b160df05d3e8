//! Full chat screen.

use crate::conversation::Message;

use super::header::{ChatStatus, render_header};
use super::input_area::HINT;
use super::message_list::render_message_list;

/// Render header, hint and message list.
///
/// # Example
///
/// ```rust
/// use chatstream::conversation::{Conversation, NewMessage};
/// use chatstream::ui::chat::render_shell;
///
/// let mut conversation = Conversation::new();
/// conversation.append(NewMessage::assistant("Hi there, how can I help you?"));
/// let screen = render_shell("Chat", conversation.messages(), false);
/// assert!(screen.contains("Assistant: Hi there"));
/// ```
#[must_use]
pub fn render_shell(title: &str, messages: &[Message], streaming: bool) -> String {
    let status = if streaming {
        ChatStatus::Streaming
    } else {
        ChatStatus::Ready
    };
    let mut screen = render_header(title, status);
    screen.push_str(HINT);
    screen.push_str("\n\n");
    screen.push_str(&render_message_list(messages));
    screen
}
