//! Chat input line.

/// Prompt printed before reading input.
pub const PROMPT: &str = "> ";

/// Help line shown under the header.
pub const HINT: &str = "Type a message and press Enter. /history redraws the chat, /quit exits.";

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Send the text as a new turn.
    Submit(String),
    /// Redraw the whole conversation.
    History,
    /// Leave the chat.
    Quit,
    /// Blank line.
    Nothing,
}

/// Interpret one line read from the terminal.
#[must_use]
pub fn parse_input(line: &str) -> InputAction {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.trim() {
        "" => InputAction::Nothing,
        "/quit" | "/exit" => InputAction::Quit,
        "/history" => InputAction::History,
        _ => InputAction::Submit(line.to_string()),
    }
}
