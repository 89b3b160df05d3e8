//! Chat screen rendering.
//!
//! Pure functions from conversation state to text: a header, the message
//! list and the input prompt. Nothing here touches the terminal.

mod header;
mod input_area;
mod message_list;
mod shell;

pub use header::{ChatStatus, render_header};
pub use input_area::{HINT, InputAction, PROMPT, parse_input};
pub use message_list::{LOADING_INDICATOR, label, render_message, render_message_list};
pub use shell::render_shell;
