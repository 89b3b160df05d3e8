use std::path::Path;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::session::{DEFAULT_GREETING, SessionSettings};
use crate::stream::{DEFAULT_APOLOGY, HttpBackend};

/// Prefix of environment variables read by [`AppConfig::load`].
pub const ENV_PREFIX: &str = "CHATSTREAM";

/// Config file looked up in the working directory when none is given.
const DEFAULT_CONFIG_NAME: &str = "chatstream";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Base URL of the chat backend
    #[arg(long, env = "CHATSTREAM_BASE_URL")]
    pub base_url: Option<String>,

    /// Title shown in the header
    #[arg(long)]
    pub title: Option<String>,

    /// Accept new input while a reply is still streaming
    #[arg(long)]
    pub allow_overlap: Option<bool>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub ui: UiConfig,
    pub turns: TurnsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub stream_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    pub title: String,
    pub greeting: String,
    pub apology: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TurnsConfig {
    pub allow_overlap: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layer defaults, config file, environment and CLI flags, in that
    /// order of increasing priority.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("backend.base_url", "http://127.0.0.1:8000")?
            .set_default("backend.stream_path", "chat_stream")?
            .set_default("ui.title", "Chat")?
            .set_default("ui.greeting", DEFAULT_GREETING)?
            .set_default("ui.apology", DEFAULT_APOLOGY)?
            .set_default("turns.allow_overlap", false)?
            .set_default("log.json", false)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(Path::new(path)).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        // E.g. CHATSTREAM_BACKEND__BASE_URL=http://localhost:9000
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Flags (and the env vars clap reads for them) win over everything.
        if let Some(base_url) = cli.base_url {
            builder = builder.set_override("backend.base_url", base_url)?;
        }
        if let Some(title) = cli.title {
            builder = builder.set_override("ui.title", title)?;
        }
        if let Some(allow_overlap) = cli.allow_overlap {
            builder = builder.set_override("turns.allow_overlap", allow_overlap)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("log.json", json)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Session behaviour described by this configuration.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            greeting: Some(self.ui.greeting.clone()).filter(|g| !g.trim().is_empty()),
            apology: self.ui.apology.clone(),
            allow_overlap: self.turns.allow_overlap,
        }
    }

    /// HTTP backend for the configured endpoint.
    pub fn backend(&self) -> crate::Result<HttpBackend> {
        HttpBackend::new(&self.backend.base_url, &self.backend.stream_path)
    }
}
