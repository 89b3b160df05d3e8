//! Streaming replies from the chat backend.
//!
//! # Overview
//!
//! - [`sse`]: Server-Sent Events framing of the response body
//! - [`event`]: the JSON record carried by each frame
//! - [`backend`]: the connection seam and its HTTP implementation
//! - [`consumer`]: per-turn reconciliation of events into the reply message

pub mod backend;
pub mod consumer;
pub mod event;
pub mod sse;

pub use backend::{ChatBackend, EventStream, HttpBackend, TurnRequest};
pub use consumer::{
    Connection, DEFAULT_APOLOGY, Flow, Turn, TurnOutcome, TurnSink, TurnState, run_turn,
};
pub use event::{EventKind, StreamEvent};
pub use sse::{SseCodec, SseFrame};
