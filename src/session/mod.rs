//! Chat session controller.
//!
//! A [`ChatSession`] owns everything one chat screen needs: the
//! conversation, the checkpoint token issued by the backend, the backend
//! connection and the turn policy. Submitting text starts a turn that runs
//! on its own tokio task and patches the reply as events arrive.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chatstream::session::{ChatSession, SessionSettings};
//! use chatstream::stream::HttpBackend;
//!
//! # async fn example() -> chatstream::Result<()> {
//! let backend = Arc::new(HttpBackend::new("http://127.0.0.1:8000", "chat_stream")?);
//! let session = ChatSession::new(SessionSettings::default(), backend);
//!
//! if let Some(turn) = session.submit("Hello!")? {
//!     let outcome = turn.wait().await?;
//!     println!("{}", outcome.content);
//! }
//! # Ok(())
//! # }
//! ```

mod controller;

pub use controller::{ChatSession, DEFAULT_GREETING, SessionEvent, SessionSettings, TurnHandle};
