//! Terminal user interface.
//!
//! # Structure
//!
//! - [`chat`]: pure rendering of the header, message list and input prompt
//! - [`terminal`]: incremental output driven by session events
//! - [`app`]: the interactive loop tying input, session and output together

pub mod app;
pub mod chat;
pub mod terminal;

pub use app::{run, run_with};
pub use terminal::Presenter;
