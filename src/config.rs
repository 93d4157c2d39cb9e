use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::interpret::{DEFAULT_FALLBACK_REPLY, DEFAULT_PATCHED_REPLY, DEFAULT_UNINITIALIZED_REPLY, ReplyTexts};

/// Default endpoint for single-message (JSON) turns.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/chat";

/// Default endpoint for streaming turns.
pub const DEFAULT_STREAM_ENDPOINT: &str = "http://localhost:8000/chat";

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "schema-chat.yaml";

/// Prefix for environment overrides, e.g. `SCHEMA_CHAT__BACKEND__MODE=stream`.
pub const ENV_PREFIX: &str = "SCHEMA_CHAT";

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "SCHEMA_CHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Endpoint for single-message turns
    #[arg(long, env = "SCHEMA_CHAT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Endpoint for streaming turns
    #[arg(long, env = "SCHEMA_CHAT_STREAM_ENDPOINT")]
    pub stream_endpoint: Option<String>,

    /// How replies are requested
    #[arg(long, value_enum)]
    pub mode: Option<ChatMode>,

    /// JSON file holding the initial page schema
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Send a single message and exit
    #[arg(short, long)]
    pub message: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "SCHEMA_CHAT_LOG_JSON")]
    pub log_json: Option<bool>,
}

/// How replies are requested from the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// One message per request, JSON reply that may carry a schema patch.
    #[default]
    Json,
    /// Full history per request, `data:`-delimited streamed reply.
    Stream,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub replies: ReplyTexts,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub endpoint: String,
    pub stream_endpoint: String,
    pub mode: ChatMode,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SchemaConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Layer defaults, config file, environment and CLI flags, in that order.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("backend.endpoint", DEFAULT_ENDPOINT)?
            .set_default("backend.stream_endpoint", DEFAULT_STREAM_ENDPOINT)?
            .set_default("backend.mode", "json")?
            .set_default("replies.patched", DEFAULT_PATCHED_REPLY)?
            .set_default("replies.fallback", DEFAULT_FALLBACK_REPLY)?
            .set_default("replies.uninitialized", DEFAULT_UNINITIALIZED_REPLY)?
            .set_default("logging.json", false)?;

        // Explicit file must exist; the working-directory one is optional.
        match &cli.config {
            Some(path) => builder = builder.add_source(File::from(path.as_path())),
            None => {
                builder = builder
                    .add_source(File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(endpoint) = &cli.endpoint {
            builder = builder.set_override("backend.endpoint", endpoint.as_str())?;
        }
        if let Some(endpoint) = &cli.stream_endpoint {
            builder = builder.set_override("backend.stream_endpoint", endpoint.as_str())?;
        }
        if let Some(mode) = cli.mode {
            let mode = match mode {
                ChatMode::Json => "json",
                ChatMode::Stream => "stream",
            };
            builder = builder.set_override("backend.mode", mode)?;
        }
        if let Some(path) = &cli.schema {
            builder = builder.set_override("schema.path", path.to_string_lossy().into_owned())?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        builder.build()?.try_deserialize()
    }
}
