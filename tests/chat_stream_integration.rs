use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
    routing::get,
};
use chatstream::session::{ChatSession, SessionSettings};
use chatstream::stream::{DEFAULT_APOLOGY, HttpBackend, StreamEvent, TurnState};
use serde::Deserialize;

/// What the test backend saw: the decoded input and the checkpoint query.
#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl Recorded {
    fn take(&self) -> Vec<(String, Option<String>)> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }
}

#[derive(Deserialize)]
struct StreamQuery {
    checkpoint_id: Option<String>,
}

fn data(event: &StreamEvent) -> Result<Event, Infallible> {
    Ok(Event::default().data(serde_json::to_string(event).unwrap()))
}

/// Issues a checkpoint on the first turn, then echoes the input in pieces.
async fn chat_stream(
    State(recorded): State<Recorded>,
    Path(message): Path<String>,
    Query(query): Query<StreamQuery>,
) -> impl IntoResponse {
    recorded
        .requests
        .lock()
        .unwrap()
        .push((message.clone(), query.checkpoint_id.clone()));

    let mut events = Vec::new();
    if query.checkpoint_id.is_none() {
        events.push(data(&StreamEvent::checkpoint("cp-1")));
    }
    events.push(data(&StreamEvent::content("You said: ")));
    // Noise the client has to skip.
    events.push(Ok(Event::default().data("{not json")));
    events.push(Ok(Event::default().event("status").data(
        serde_json::to_string(&StreamEvent::content("ignored")).unwrap(),
    )));
    events.push(data(&StreamEvent::content(message)));
    events.push(data(&StreamEvent::end()));

    Sse::new(futures::stream::iter(events))
}

async fn broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn plain_text() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        StreamEvent::content("nope").to_sse(),
    )
}

/// Sends one fragment and hangs up without `end`.
async fn cut_short() -> impl IntoResponse {
    Sse::new(futures::stream::iter(vec![data(&StreamEvent::content(
        "partial",
    ))]))
}

async fn spawn_backend() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/chat_stream/{message}", get(chat_stream))
        .route("/broken/chat_stream/{message}", get(broken))
        .route("/plain/chat_stream/{message}", get(plain_text))
        .route("/cut/chat_stream/{message}", get(cut_short))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), recorded)
}

fn session_for(base_url: &str) -> ChatSession {
    let backend = HttpBackend::new(base_url, "chat_stream").unwrap();
    ChatSession::new(SessionSettings::default(), Arc::new(backend))
}

#[tokio::test]
async fn test_turns_stream_and_carry_checkpoint() {
    let (base_url, recorded) = spawn_backend().await;
    let session = session_for(&base_url);

    let turn = session.submit("Hello").unwrap().unwrap();
    let outcome = turn.wait().await.unwrap();
    assert_eq!(outcome.state, TurnState::Completed);
    assert_eq!(outcome.content, "You said: Hello");
    assert_eq!(session.checkpoint().as_deref(), Some("cp-1"));

    let turn = session.submit("Again").unwrap().unwrap();
    let outcome = turn.wait().await.unwrap();
    assert_eq!(outcome.content, "You said: Again");

    assert_eq!(
        recorded.take(),
        vec![
            ("Hello".to_string(), None),
            ("Again".to_string(), Some("cp-1".to_string())),
        ]
    );

    let messages = session.snapshot();
    assert_eq!(messages.len(), 5);
    assert!(messages.iter().all(|m| !m.is_loading));
    assert_eq!(
        messages.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
}

#[tokio::test]
async fn test_input_is_one_path_segment() {
    let (base_url, recorded) = spawn_backend().await;
    let session = session_for(&base_url);

    let input = "what's 1/2? #ok & more";
    let outcome = session.submit(input).unwrap().unwrap().wait().await.unwrap();

    assert_eq!(outcome.content, format!("You said: {input}"));
    assert_eq!(recorded.take(), vec![(input.to_string(), None)]);
}

#[tokio::test]
async fn test_error_status_shows_apology() {
    let (base_url, _) = spawn_backend().await;
    let session = session_for(&format!("{base_url}/broken"));

    let turn = session.submit("Hello").unwrap().unwrap();
    let reply_id = turn.reply_id();
    let outcome = turn.wait().await.unwrap();

    assert_eq!(outcome.state, TurnState::Failed);
    let reply = session.message(reply_id).unwrap();
    assert_eq!(reply.content, DEFAULT_APOLOGY);
    assert!(!reply.is_loading);
    assert!(!session.is_streaming());
}

#[tokio::test]
async fn test_wrong_content_type_shows_apology() {
    let (base_url, _) = spawn_backend().await;
    let session = session_for(&format!("{base_url}/plain"));

    let outcome = session.submit("Hello").unwrap().unwrap().wait().await.unwrap();

    assert_eq!(outcome.state, TurnState::Failed);
    assert_eq!(outcome.content, DEFAULT_APOLOGY);
}

#[tokio::test]
async fn test_stream_without_end_shows_apology() {
    let (base_url, _) = spawn_backend().await;
    let session = session_for(&format!("{base_url}/cut"));

    let outcome = session.submit("Hello").unwrap().unwrap().wait().await.unwrap();

    assert_eq!(outcome.state, TurnState::Failed);
    assert_eq!(outcome.content, DEFAULT_APOLOGY);
    assert_eq!(session.checkpoint(), None);
}

#[tokio::test]
async fn test_unreachable_backend_shows_apology() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = session_for(&format!("http://{addr}"));
    let outcome = session.submit("Hello").unwrap().unwrap().wait().await.unwrap();

    assert_eq!(outcome.state, TurnState::Failed);
    assert_eq!(outcome.content, DEFAULT_APOLOGY);
}
