//! Streaming chat client
//!
//! Entry point for the terminal chat screen.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use chatstream::config::AppConfig;
use chatstream::session::ChatSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(config.log.json);

    info!(
        name: "config.loaded",
        base_url = %config.backend.base_url,
        stream_path = %config.backend.stream_path,
        allow_overlap = config.turns.allow_overlap,
        "Configuration loaded"
    );

    let backend = Arc::new(config.backend().context("invalid backend URL")?);
    let session = ChatSession::new(config.session_settings(), backend);

    chatstream::ui::run(session, &config.ui.title).await?;

    info!(name: "session.closed", "Chat closed");
    Ok(())
}

/// Initialize tracing (M-LOG-STRUCTURED).
///
/// Logs go to stderr so they never interleave with the chat on stdout.
/// `RUST_LOG` overrides the default `warn` level.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
