//! Folding one turn's event stream into its placeholder reply.
//!
//! Each turn owns a [`Turn`]: the id of the placeholder reply, the text
//! received so far and a small state machine
//! (`Idle → Streaming → Completed | Failed`). Terminal states are final.
//!
//! Mutations go through a [`TurnSink`], which the session implements on top
//! of its message store and checkpoint slot.

use futures::StreamExt;
use uuid::Uuid;

use crate::conversation::{MessageId, MessagePatch};

use super::backend::{ChatBackend, EventStream, TurnRequest};
use super::event::{EventKind, StreamEvent};

/// Reply text shown when the connection fails.
pub const DEFAULT_APOLOGY: &str = "Sorry, connection failed. Please try again later.";

/// Receiver of the side effects of a turn.
pub trait TurnSink: Send + Sync {
    /// Replace the session's checkpoint token.
    fn set_checkpoint(&self, checkpoint_id: String);

    /// Merge `patch` into the reply message with `id`.
    fn patch_reply(&self, id: MessageId, patch: MessagePatch);
}

/// Lifecycle of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Created, connection not opened yet.
    Idle,
    /// Connection open, events are being applied.
    Streaming,
    /// An `end` event arrived.
    Completed,
    /// The connection failed; the reply shows the apology.
    Failed,
}

impl TurnState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// What to do with the connection after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading frames.
    Continue,
    /// Stop reading and close the connection.
    Close,
}

/// Final result of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Id of the reply message the turn filled.
    pub reply_id: MessageId,
    /// Terminal state the turn ended in.
    pub state: TurnState,
    /// Content the reply was left with.
    pub content: String,
}

/// Reconciliation state for one turn.
#[derive(Debug)]
pub struct Turn {
    id: Uuid,
    reply_id: MessageId,
    buffer: String,
    state: TurnState,
    failure: Option<String>,
}

impl Turn {
    /// Create a turn that will fill the reply with `reply_id`.
    #[must_use]
    pub fn new(reply_id: MessageId) -> Self {
        Self {
            id: Uuid::new_v4(),
            reply_id,
            buffer: String::new(),
            state: TurnState::Idle,
            failure: None,
        }
    }

    /// Correlation id used in logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn reply_id(&self) -> MessageId {
        self.reply_id
    }

    #[must_use]
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Text received so far.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Enter `Streaming`. Only valid from `Idle`.
    pub fn start(&mut self) {
        if self.state == TurnState::Idle {
            self.state = TurnState::Streaming;
        }
    }

    /// Apply one frame payload.
    ///
    /// Payloads that are not a valid event record are logged and skipped.
    /// Returns [`Flow::Close`] once the turn has reached a terminal state.
    pub fn apply(&mut self, data: &str, sink: &impl TurnSink) -> Flow {
        if self.state != TurnState::Streaming {
            return Flow::Close;
        }
        if data.trim().is_empty() {
            return Flow::Continue;
        }

        let StreamEvent {
            kind,
            checkpoint_id,
            content,
        } = match StreamEvent::parse(data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    name: "stream.frame.skipped",
                    turn_id = %self.id,
                    error = %e,
                    data = %data,
                    "Skipping non-JSON stream frame"
                );
                return Flow::Continue;
            }
        };

        if kind == EventKind::Checkpoint {
            match checkpoint_id {
                Some(checkpoint_id) => {
                    tracing::debug!(
                        turn_id = %self.id,
                        checkpoint_id = %checkpoint_id,
                        "Checkpoint received"
                    );
                    sink.set_checkpoint(checkpoint_id);
                }
                None => tracing::warn!(
                    name: "stream.checkpoint.missing",
                    turn_id = %self.id,
                    "Checkpoint event without checkpoint_id"
                ),
            }
        }

        if kind == EventKind::Content {
            if let Some(fragment) = content {
                self.buffer.push_str(&fragment);
            }
            sink.patch_reply(
                self.reply_id,
                MessagePatch::content(self.buffer.clone()).loaded(),
            );
        }

        if kind == EventKind::End {
            self.state = TurnState::Completed;
            sink.patch_reply(self.reply_id, MessagePatch::default().loaded());
            return Flow::Close;
        }

        if kind == EventKind::Unknown {
            tracing::debug!(turn_id = %self.id, data = %data, "Ignoring unknown event type");
        }

        Flow::Continue
    }

    /// Mark the turn failed and replace the reply with `apology`.
    ///
    /// Has no effect once the turn is terminal.
    pub fn fail(&mut self, reason: &str, apology: &str, sink: &impl TurnSink) {
        if self.state.is_terminal() {
            return;
        }
        tracing::error!(
            name: "stream.connection.failed",
            turn_id = %self.id,
            reply_id = self.reply_id,
            error = %reason,
            "EventSource connection failed"
        );
        self.state = TurnState::Failed;
        self.failure = Some(reason.to_string());
        sink.patch_reply(self.reply_id, MessagePatch::content(apology).loaded());
    }

    /// Why the turn failed, if it did.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn outcome(&self, apology: &str) -> TurnOutcome {
        let content = match self.state {
            TurnState::Failed => apology.to_string(),
            _ => self.buffer.clone(),
        };
        TurnOutcome {
            reply_id: self.reply_id,
            state: self.state,
            content,
        }
    }
}

/// An open event stream that is released exactly once.
pub struct Connection {
    stream: Option<EventStream>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.stream.is_some())
            .finish()
    }
}

impl Connection {
    #[must_use]
    pub fn new(stream: EventStream) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Next frame payload, or `None` when the stream has ended or was
    /// closed.
    pub async fn next(&mut self) -> Option<crate::Result<String>> {
        match &mut self.stream {
            Some(stream) => stream.next().await,
            None => None,
        }
    }

    /// Drop the underlying stream. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        self.stream.take().is_some()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

/// Drive one turn to completion.
///
/// Opens the connection for `request`, folds every frame into `turn` and
/// returns once an `end` event arrives or the connection fails. Failure is
/// terminal: the reply is replaced by `apology` and nothing is retried.
pub async fn run_turn(
    backend: &dyn ChatBackend,
    request: &TurnRequest,
    mut turn: Turn,
    sink: &impl TurnSink,
    apology: &str,
) -> TurnOutcome {
    turn.start();
    tracing::info!(
        name: "turn.started",
        turn_id = %turn.id(),
        reply_id = turn.reply_id(),
        has_checkpoint = request.checkpoint_id.is_some(),
        "Turn started"
    );

    let mut connection = match backend.open(request).await {
        Ok(stream) => Connection::new(stream),
        Err(e) => {
            turn.fail(&e.to_string(), apology, sink);
            return turn.outcome(apology);
        }
    };

    loop {
        match connection.next().await {
            Some(Ok(data)) => {
                if turn.apply(&data, sink) == Flow::Close {
                    break;
                }
            }
            Some(Err(e)) => {
                turn.fail(&e.to_string(), apology, sink);
                break;
            }
            None => {
                turn.fail(&crate::Error::StreamEnded.to_string(), apology, sink);
                break;
            }
        }
    }
    connection.close();

    tracing::info!(
        name: "turn.finished",
        turn_id = %turn.id(),
        state = ?turn.state(),
        content_length = turn.buffer().len(),
        "Turn finished"
    );
    turn.outcome(apology)
}
