//! Interactive chat loop.

use std::collections::VecDeque;
use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::error::{Error, Result};
use crate::session::{ChatSession, SessionEvent};

use super::chat::{InputAction, parse_input};
use super::terminal::Presenter;

/// Run the chat screen on stdin/stdout until `/quit` or end of input.
pub async fn run(session: ChatSession, title: &str) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_with(session, title, stdin, std::io::stdout()).await
}

/// Run the chat screen over arbitrary input and output.
///
/// Lines submitted while a reply is streaming are queued and sent, in
/// order, once the reply finishes, unless the session allows overlapping
/// turns, in which case they start right away. When input ends the loop
/// waits for every reply in flight and any queued lines before returning.
pub async fn run_with<R, W>(session: ChatSession, title: &str, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut events = session.subscribe();
    let mut presenter = Presenter::new(output);
    let mut lines = input.lines();
    let mut queued: VecDeque<String> = VecDeque::new();
    let mut input_open = true;
    // Turns started here whose `TurnFinished` has not been shown yet.
    let mut awaiting = 0usize;

    presenter.draw_shell(title, &session.snapshot(), session.is_streaming())?;
    presenter.prompt()?;

    loop {
        if !input_open && queued.is_empty() && awaiting == 0 {
            break;
        }

        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    presenter.handle(&event)?;
                    if let SessionEvent::TurnFinished(_) = event {
                        awaiting = awaiting.saturating_sub(1);
                        match queued.pop_front() {
                            Some(text) => {
                                awaiting += submit(&session, &text, &mut presenter, &mut queued)?;
                            }
                            None if input_open => presenter.prompt()?,
                            None => {}
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Presenter fell behind, redrawing");
                    presenter.draw_shell(title, &session.snapshot(), session.is_streaming())?;
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    continue;
                };
                match parse_input(&line) {
                    InputAction::Quit => break,
                    InputAction::History => {
                        presenter.draw_shell(title, &session.snapshot(), session.is_streaming())?;
                        presenter.prompt()?;
                    }
                    InputAction::Nothing => presenter.prompt()?,
                    InputAction::Submit(text)
                        if awaiting > 0 && !session.settings().allow_overlap =>
                    {
                        presenter.notice("queued until the current reply finishes")?;
                        queued.push_back(text);
                    }
                    InputAction::Submit(text) => {
                        awaiting += submit(&session, &text, &mut presenter, &mut queued)?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Start a turn for `text`. Returns how many turns were started.
fn submit<W: Write>(
    session: &ChatSession,
    text: &str,
    presenter: &mut Presenter<W>,
    queued: &mut VecDeque<String>,
) -> Result<usize> {
    match session.submit(text) {
        // The turn task reports back through the event channel.
        Ok(Some(_turn)) => Ok(1),
        Ok(None) => {
            presenter.prompt()?;
            Ok(0)
        }
        Err(Error::TurnInProgress) => {
            // Started elsewhere on the same session; retry after it finishes.
            presenter.notice("queued until the current reply finishes")?;
            queued.push_front(text.to_string());
            Ok(0)
        }
        Err(e) => Err(e),
    }
}
