//! Connections to the chat backend.
//!
//! A [`ChatBackend`] opens one streaming connection per turn and yields the
//! `data` payload of every message frame. [`HttpBackend`] talks to the real
//! endpoint over HTTP; tests plug in scripted backends.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use url::Url;

use crate::error::{Error, Result};

use super::sse::SseCodec;

/// Frame payloads of one open connection, in arrival order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Parameters of the connection opened for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    /// Text the user submitted.
    pub input: String,
    /// Checkpoint token from an earlier turn, if any.
    pub checkpoint_id: Option<String>,
}

/// Source of streamed replies.
#[async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    /// Open the streaming connection for `request`.
    ///
    /// Any error returned here, or yielded by the stream, is a
    /// connection-level failure for the turn.
    async fn open(&self, request: &TurnRequest) -> Result<EventStream>;
}

/// Backend reached over HTTP Server-Sent Events.
///
/// Requests go to `GET {base_url}/{stream_path}/{input}` with the checkpoint
/// token, when present, in the `checkpoint_id` query parameter.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
    stream_path: Vec<String>,
}

impl HttpBackend {
    /// Create a backend for the server at `base_url`.
    pub fn new(base_url: impl AsRef<str>, stream_path: &str) -> Result<Self> {
        Self::with_client(base_url, stream_path, reqwest::Client::new())
    }

    /// Create a backend with a custom reqwest client.
    pub fn with_client(
        base_url: impl AsRef<str>,
        stream_path: &str,
        http: reqwest::Client,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("{base_url} cannot be used as a base URL")));
        }
        let stream_path = stream_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
        Ok(Self {
            http,
            base_url,
            stream_path,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the endpoint URL for a turn.
    ///
    /// The user input becomes a single percent-encoded path segment.
    pub fn stream_url(&self, request: &TurnRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("{} cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(&self.stream_path)
            .push(&request.input);
        if let Some(checkpoint_id) = &request.checkpoint_id {
            url.query_pairs_mut()
                .append_pair("checkpoint_id", checkpoint_id);
        }
        Ok(url)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn open(&self, request: &TurnRequest) -> Result<EventStream> {
        let url = self.stream_url(request)?;
        tracing::debug!(url = %url, "Opening event stream");

        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("text/event-stream") {
            return Err(Error::UnexpectedContentType(content_type));
        }

        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let frames = FramedRead::new(StreamReader::new(body), SseCodec::new());

        let out = async_stream::try_stream! {
            futures::pin_mut!(frames);
            while let Some(frame) = frames.next().await {
                let frame = frame?;
                if !frame.is_message() {
                    tracing::debug!(
                        event = frame.event.as_deref().unwrap_or_default(),
                        "Skipping named event"
                    );
                    continue;
                }
                yield frame.data;
            }
        };

        Ok(Box::pin(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(input: &str, checkpoint_id: Option<&str>) -> TurnRequest {
        TurnRequest {
            input: input.to_string(),
            checkpoint_id: checkpoint_id.map(ToString::to_string),
        }
    }

    #[test]
    fn test_stream_url_encodes_input() {
        let backend = HttpBackend::new("http://127.0.0.1:8000", "chat_stream").unwrap();
        let url = backend
            .stream_url(&request("what's 1/2 + ok? #yes", None))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/chat_stream/what's%201%2F2%20+%20ok%3F%20%23yes"
        );
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_stream_url_with_checkpoint() {
        let backend = HttpBackend::new("http://localhost:8000/api/", "/chat_stream/").unwrap();
        let url = backend
            .stream_url(&request("hello", Some("abc123")))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/chat_stream/hello?checkpoint_id=abc123"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(HttpBackend::new("mailto:someone@example.com", "chat_stream").is_err());
        assert!(HttpBackend::new("not a url", "chat_stream").is_err());
    }
}
