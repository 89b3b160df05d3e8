//! Incremental terminal output.
//!
//! [`Presenter`] turns [`SessionEvent`]s into writes on a terminal. A reply
//! that is streaming stays on the last line: the loading indicator is
//! replaced by the first fragment, later fragments are appended, and a
//! reply whose text was replaced outright (the apology) is printed again.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::conversation::{Message, MessageId};
use crate::session::SessionEvent;

use super::chat::{LOADING_INDICATOR, PROMPT, label, render_message, render_shell};

/// Return to column 0 and clear the line.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// What is currently on screen for a reply in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Shown {
    Loading,
    Text(String),
}

/// Writes session changes to a terminal.
#[derive(Debug)]
pub struct Presenter<W: Write> {
    out: W,
    in_progress: HashMap<MessageId, Shown>,
}

impl<W: Write> Presenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            in_progress: HashMap::new(),
        }
    }

    /// Draw the whole screen.
    pub fn draw_shell(&mut self, title: &str, messages: &[Message], streaming: bool) -> io::Result<()> {
        self.out
            .write_all(render_shell(title, messages, streaming).as_bytes())?;
        self.out.flush()
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        self.out.write_all(PROMPT.as_bytes())?;
        self.out.flush()
    }

    /// Print an out-of-band line, such as a notice about queued input.
    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "({text})")?;
        self.out.flush()
    }

    /// Apply one session change.
    pub fn handle(&mut self, event: &SessionEvent) -> io::Result<()> {
        match event {
            // The terminal already echoed what the user typed.
            SessionEvent::Appended(message) if message.is_user => {}
            SessionEvent::Appended(message) if message.is_loading => {
                write!(self.out, "{}: {LOADING_INDICATOR}", label(message))?;
                self.in_progress.insert(message.id, Shown::Loading);
            }
            SessionEvent::Appended(message) => {
                self.out.write_all(render_message(message).as_bytes())?;
            }
            SessionEvent::Patched(message) => self.patched(message)?,
            SessionEvent::CheckpointChanged(_) => {}
            SessionEvent::TurnFinished(outcome) => {
                if self.in_progress.remove(&outcome.reply_id).is_some() {
                    writeln!(self.out)?;
                }
            }
        }
        self.out.flush()
    }

    fn patched(&mut self, message: &Message) -> io::Result<()> {
        let Some(shown) = self.in_progress.get(&message.id) else {
            return Ok(());
        };
        match shown {
            Shown::Loading if message.is_loading => return Ok(()),
            Shown::Loading => {
                write!(
                    self.out,
                    "{CLEAR_LINE}{}: {}",
                    label(message),
                    message.content
                )?;
            }
            Shown::Text(previous) => match message.content.strip_prefix(previous.as_str()) {
                Some(suffix) => self.out.write_all(suffix.as_bytes())?,
                None => write!(self.out, "\n{}: {}", label(message), message.content)?,
            },
        }
        self.in_progress
            .insert(message.id, Shown::Text(message.content.clone()));
        Ok(())
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, MessagePatch, NewMessage};
    use crate::stream::{DEFAULT_APOLOGY, TurnOutcome, TurnState};

    struct Script {
        conversation: Conversation,
        presenter: Presenter<Vec<u8>>,
    }

    impl Script {
        fn new() -> Self {
            Self {
                conversation: Conversation::new(),
                presenter: Presenter::new(Vec::new()),
            }
        }

        fn append(&mut self, message: NewMessage) -> MessageId {
            let id = self.conversation.append(message);
            let message = self.conversation.get(id).unwrap().clone();
            self.presenter.handle(&SessionEvent::Appended(message)).unwrap();
            id
        }

        fn patch(&mut self, id: MessageId, patch: MessagePatch) {
            self.conversation.patch(id, patch);
            let message = self.conversation.get(id).unwrap().clone();
            self.presenter.handle(&SessionEvent::Patched(message)).unwrap();
        }

        fn finish(&mut self, reply_id: MessageId, state: TurnState) {
            let content = self.conversation.get(reply_id).unwrap().content.clone();
            let outcome = TurnOutcome {
                reply_id,
                state,
                content,
            };
            self.presenter
                .handle(&SessionEvent::TurnFinished(outcome))
                .unwrap();
        }

        fn output(self) -> String {
            String::from_utf8(self.presenter.into_inner()).unwrap()
        }
    }

    #[test]
    fn test_streamed_reply_prints_increments() {
        let mut script = Script::new();
        script.append(NewMessage::user("hi"));
        let reply = script.append(NewMessage::placeholder());
        script.patch(reply, MessagePatch::content("Hel").loaded());
        script.patch(reply, MessagePatch::content("Hello").loaded());
        script.patch(reply, MessagePatch::default().loaded());
        script.finish(reply, TurnState::Completed);

        assert_eq!(
            script.output(),
            format!("Assistant: {LOADING_INDICATOR}{CLEAR_LINE}Assistant: Hello\n")
        );
    }

    #[test]
    fn test_apology_reprints_reply() {
        let mut script = Script::new();
        let reply = script.append(NewMessage::placeholder());
        script.patch(reply, MessagePatch::content("part").loaded());
        script.patch(reply, MessagePatch::content(DEFAULT_APOLOGY).loaded());
        script.finish(reply, TurnState::Failed);

        assert_eq!(
            script.output(),
            format!(
                "Assistant: {LOADING_INDICATOR}{CLEAR_LINE}Assistant: part\nAssistant: {DEFAULT_APOLOGY}\n"
            )
        );
    }

    #[test]
    fn test_finished_messages_print_whole() {
        let mut script = Script::new();
        script.append(NewMessage::assistant("Welcome"));
        assert_eq!(script.output(), "Assistant: Welcome\n");
    }
}
