//! Chat message list.

use crate::conversation::Message;

/// Shown in place of a reply that has no content yet.
pub const LOADING_INDICATOR: &str = "…";

/// Label printed before a message.
#[must_use]
pub fn label(message: &Message) -> &'static str {
    if message.is_user { "You" } else { "Assistant" }
}

/// Render one message.
///
/// Continuation lines are indented under the first so multi-line replies
/// stay readable.
#[must_use]
pub fn render_message(message: &Message) -> String {
    let label = label(message);
    let body = if message.is_loading {
        LOADING_INDICATOR
    } else {
        message.content.as_str()
    };
    let indent = " ".repeat(label.len() + 2);
    let body = body.replace('\n', &format!("\n{indent}"));
    format!("{label}: {body}\n")
}

/// Render every message in display order.
#[must_use]
pub fn render_message_list(messages: &[Message]) -> String {
    messages.iter().map(render_message).collect()
}
