//! Server-Sent Events framing.
//!
//! [`SseCodec`] is a [`Decoder`] that turns the raw response body into
//! [`SseFrame`]s, following the EventSource parsing rules: frames end at a
//! blank line, `data:` lines are joined with `\n`, comment lines start with
//! `:` and any of `\n`, `\r\n` or `\r` terminates a line.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::Error;

/// One dispatched Server-Sent Event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// Concatenated `data:` lines.
    pub data: String,
    /// Value of the `id:` field, if any.
    pub id: Option<String>,
    /// Reconnection delay in milliseconds, if the server sent one.
    pub retry: Option<u64>,
}

impl SseFrame {
    /// Whether an EventSource would deliver this frame to `onmessage`.
    #[must_use]
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

/// Incremental SSE decoder.
#[derive(Debug, Default)]
pub struct SseCodec {
    pending: PendingFrame,
    /// Last line ended with `\r` at the end of the buffer; a leading `\n`
    /// in the next chunk belongs to it.
    skip_lf: bool,
}

#[derive(Debug, Default)]
struct PendingFrame {
    event: Option<String>,
    data: Option<String>,
    id: Option<String>,
    retry: Option<u64>,
}

impl PendingFrame {
    fn take(&mut self) -> Option<SseFrame> {
        let pending = std::mem::take(self);
        pending.data.map(|data| SseFrame {
            event: pending.event,
            data,
            id: pending.id,
            retry: pending.retry,
        })
    }

    fn field(&mut self, name: &str, value: &str) {
        match name {
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse() {
                    self.retry = Some(ms);
                }
            }
            other => tracing::trace!(name = other, "Ignoring unknown SSE field"),
        }
    }
}

impl SseCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_line(&mut self, src: &mut BytesMut) -> Option<String> {
        if self.skip_lf && !src.is_empty() {
            if src[0] == b'\n' {
                src.advance(1);
            }
            self.skip_lf = false;
        }

        let pos = src.iter().position(|b| *b == b'\n' || *b == b'\r')?;
        let line = src.split_to(pos);
        let terminator = src[0];
        src.advance(1);

        if terminator == b'\r' {
            match src.first() {
                Some(b'\n') => src.advance(1),
                Some(_) => {}
                None => self.skip_lf = true,
            }
        }

        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl Decoder for SseCodec {
    type Item = SseFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<SseFrame>, Error> {
        while let Some(line) = self.next_line(src) {
            if line.is_empty() {
                if let Some(frame) = self.pending.take() {
                    return Ok(Some(frame));
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (name, value) = match line.split_once(':') {
                Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };
            self.pending.field(name, value);
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<SseFrame>, Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        // An unterminated frame at end of stream is never dispatched.
        src.clear();
        self.pending = PendingFrame::default();
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&str]) -> Vec<SseFrame> {
        let mut codec = SseCodec::new();
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            buf.extend_from_slice(chunk.as_bytes());
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                frames.push(frame);
            }
        }
        while let Some(frame) = codec.decode_eof(&mut buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_single_frame() {
        let frames = decode_all(&["data: {\"type\": \"end\"}\n\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"type\": \"end\"}");
        assert!(frames[0].is_message());
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let frames = decode_all(&["da", "ta: hel", "lo\n", "\ndata: next\n\n"]);
        let data: Vec<_> = frames.iter().map(|f| f.data.as_str()).collect();
        assert_eq!(data, vec!["hello", "next"]);
    }

    #[test]
    fn test_crlf_split_between_chunks() {
        let frames = decode_all(&["data: a\r", "\n\r", "\ndata: b\r\n\r\n"]);
        let data: Vec<_> = frames.iter().map(|f| f.data.as_str()).collect();
        assert_eq!(data, vec!["a", "b"]);
    }

    #[test]
    fn test_multiline_data_and_fields() {
        let frames = decode_all(&[
            ": keep-alive\nevent: status\nid: 7\nretry: 1500\ndata: one\ndata:two\n\n",
        ]);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.data, "one\ntwo");
        assert_eq!(frame.event.as_deref(), Some("status"));
        assert_eq!(frame.id.as_deref(), Some("7"));
        assert_eq!(frame.retry, Some(1500));
        assert!(!frame.is_message());
    }

    #[test]
    fn test_blank_lines_without_data_are_not_dispatched() {
        let frames = decode_all(&["\n\n: comment\n\nevent: x\n\ndata: y\n\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "y");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn test_unterminated_frame_is_dropped() {
        let frames = decode_all(&["data: complete\n\ndata: partial\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "complete");
    }
}
