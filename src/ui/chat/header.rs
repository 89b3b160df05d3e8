//! Chat header.

use std::fmt;

/// Status shown next to the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStatus {
    /// No reply in progress.
    Ready,
    /// A reply is streaming in.
    Streaming,
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::Streaming => f.write_str("Streaming"),
        }
    }
}

/// Chat header with title and status.
#[must_use]
pub fn render_header(title: &str, status: ChatStatus) -> String {
    let badge = format!("[{status}]");
    let rule = "─".repeat(title.chars().count() + badge.chars().count() + 4);
    format!("{rule}\n✦ {title}  {badge}\n{rule}\n")
}
