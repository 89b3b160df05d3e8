//! Session state and turn orchestration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::conversation::{Conversation, Message, MessageId, MessagePatch, NewMessage};
use crate::error::{Error, Result};
use crate::stream::{
    ChatBackend, DEFAULT_APOLOGY, Turn, TurnOutcome, TurnRequest, TurnSink, run_turn,
};

/// Buffered change notifications per subscriber.
const EVENT_CAPACITY: usize = 256;

/// First message shown in a new session.
pub const DEFAULT_GREETING: &str = "Hi there, how can I help you?";

/// Behaviour knobs for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Assistant message seeded at id 1, if any.
    pub greeting: Option<String>,
    /// Reply text used when a connection fails.
    pub apology: String,
    /// Accept a new turn while another one is still streaming.
    pub allow_overlap: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            greeting: Some(DEFAULT_GREETING.to_string()),
            apology: DEFAULT_APOLOGY.to_string(),
            allow_overlap: false,
        }
    }
}

/// Change notification published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message was added to the conversation.
    Appended(Message),
    /// A message changed; carries its new value.
    Patched(Message),
    /// The backend issued a new checkpoint token.
    CheckpointChanged(String),
    /// A turn reached `Completed` or `Failed`.
    TurnFinished(TurnOutcome),
}

/// Handle to a running turn.
#[derive(Debug)]
pub struct TurnHandle {
    user_id: MessageId,
    reply_id: MessageId,
    join: JoinHandle<TurnOutcome>,
}

impl TurnHandle {
    /// Id of the user message that started the turn.
    #[must_use]
    pub fn user_id(&self) -> MessageId {
        self.user_id
    }

    /// Id of the placeholder reply being filled.
    #[must_use]
    pub fn reply_id(&self) -> MessageId {
        self.reply_id
    }

    /// Wait for the turn to finish.
    pub async fn wait(self) -> Result<TurnOutcome> {
        Ok(self.join.await?)
    }
}

/// One chat screen's worth of state.
///
/// Cloning is cheap and every clone refers to the same session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    conversation: RwLock<Conversation>,
    checkpoint: RwLock<Option<String>>,
    backend: Arc<dyn ChatBackend>,
    settings: SessionSettings,
    active_turns: AtomicUsize,
    events: broadcast::Sender<SessionEvent>,
}

/// Counts a turn as active until dropped.
struct ActiveTurn(Arc<SessionInner>);

impl Drop for ActiveTurn {
    fn drop(&mut self) {
        self.0.active_turns.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ChatSession {
    /// Create a session talking to `backend`.
    pub fn new(settings: SessionSettings, backend: Arc<dyn ChatBackend>) -> Self {
        let mut conversation = Conversation::new();
        if let Some(greeting) = settings.greeting.as_deref().filter(|g| !g.is_empty()) {
            conversation.append(NewMessage::assistant(greeting));
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(SessionInner {
                conversation: RwLock::new(conversation),
                checkpoint: RwLock::new(None),
                backend,
                settings,
                active_turns: AtomicUsize::new(0),
                events,
            }),
        }
    }

    /// Submit user input and start a turn.
    ///
    /// Returns `Ok(None)` without touching the conversation when the input
    /// is blank. Otherwise the user message and a loading placeholder are
    /// appended and the reply streams on a spawned task; this returns
    /// without waiting for it. Must be called from within a tokio runtime.
    pub fn submit(&self, input: &str) -> Result<Option<TurnHandle>> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        let active = self.begin_turn()?;

        let (user_id, reply_id, appended) = {
            let mut conversation = self.write_conversation();
            let user_id = conversation.append(NewMessage::user(input));
            let reply_id = conversation.append(NewMessage::placeholder());
            let appended: Vec<Message> = [user_id, reply_id]
                .iter()
                .filter_map(|id| conversation.get(*id).cloned())
                .collect();
            (user_id, reply_id, appended)
        };
        for message in appended {
            self.publish(SessionEvent::Appended(message));
        }

        let request = TurnRequest {
            input: input.to_string(),
            checkpoint_id: self.checkpoint(),
        };
        let session = self.clone();
        let join = tokio::spawn(async move {
            let inner = &session.inner;
            let outcome = run_turn(
                inner.backend.as_ref(),
                &request,
                Turn::new(reply_id),
                &session,
                &inner.settings.apology,
            )
            .await;
            drop(active);
            session.publish(SessionEvent::TurnFinished(outcome.clone()));
            outcome
        });

        Ok(Some(TurnHandle {
            user_id,
            reply_id,
            join,
        }))
    }

    /// Current checkpoint token.
    #[must_use]
    pub fn checkpoint(&self) -> Option<String> {
        self.inner
            .checkpoint
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy of all messages in display order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Message> {
        self.read_conversation().messages().to_vec()
    }

    /// Copy of one message.
    #[must_use]
    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.read_conversation().get(id).cloned()
    }

    /// Whether any turn is still streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.inner.active_turns.load(Ordering::SeqCst) > 0
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    fn begin_turn(&self) -> Result<ActiveTurn> {
        let active = &self.inner.active_turns;
        if self.inner.settings.allow_overlap {
            active.fetch_add(1, Ordering::SeqCst);
        } else if active
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Rejecting submit while a reply is streaming");
            return Err(Error::TurnInProgress);
        }
        Ok(ActiveTurn(Arc::clone(&self.inner)))
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn read_conversation(&self) -> std::sync::RwLockReadGuard<'_, Conversation> {
        self.inner
            .conversation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_conversation(&self) -> std::sync::RwLockWriteGuard<'_, Conversation> {
        self.inner
            .conversation
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl TurnSink for ChatSession {
    fn set_checkpoint(&self, checkpoint_id: String) {
        *self
            .inner
            .checkpoint
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(checkpoint_id.clone());
        tracing::info!(
            name: "checkpoint.updated",
            checkpoint_id = %checkpoint_id,
            "Checkpoint updated"
        );
        self.publish(SessionEvent::CheckpointChanged(checkpoint_id));
    }

    fn patch_reply(&self, id: MessageId, patch: MessagePatch) {
        let updated = {
            let mut conversation = self.write_conversation();
            if conversation.patch(id, patch) {
                conversation.get(id).cloned()
            } else {
                None
            }
        };
        match updated {
            Some(message) => self.publish(SessionEvent::Patched(message)),
            None => tracing::warn!(reply_id = id, "Patch for unknown message dropped"),
        }
    }
}
