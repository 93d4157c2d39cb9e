//! Schema Chat
//!
//! Entry point for the terminal chat client.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use schema_chat::client::HttpBackend;
use schema_chat::config::{AppConfig, Cli, LoggingConfig};
use schema_chat::dispatch::Dispatcher;
use schema_chat::repl::Repl;
use schema_chat::schema::PageSchema;
use schema_chat::session::ChatSession;
use schema_chat::Error;

/// How long runtime shutdown waits for blocking tasks. Stdin is read on a
/// blocking thread that only returns on the next line.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let result = runtime.block_on(run());
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run() -> anyhow::Result<()> {
    // Load .env (if present) before clap reads env-backed flags
    let _ = dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli).context("failed to load configuration")?;

    init_tracing(&config.logging);

    info!(
        name: "config.loaded",
        endpoint = %config.backend.endpoint,
        stream_endpoint = %config.backend.stream_endpoint,
        mode = ?config.backend.mode,
        "Configuration loaded"
    );

    let schema = match &config.schema.path {
        Some(path) => PageSchema::load(path)
            .await
            .with_context(|| format!("failed to load page schema from {}", path.display()))?,
        None => PageSchema::default(),
    };

    let backend = HttpBackend::new(&config.backend.endpoint, &config.backend.stream_endpoint)?;
    let dispatcher = Dispatcher::with_replies(backend, config.replies.clone());

    let session = ChatSession::started(schema);
    info!(
        name: "session.started",
        session_id = session.id().unwrap_or_default(),
        page_id = %session.schema().page_id(),
        "Chat session started"
    );

    // Ctrl-C closes any in-flight stream and ends the loop.
    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(name: "repl.interrupted", "Interrupt received");
            interrupt.cancel();
        }
    });

    let mut repl =
        Repl::new(dispatcher, session, config.backend.mode).with_shutdown(shutdown);
    let mut stdout = tokio::io::stdout();

    if let Some(message) = &cli.message {
        match repl.turn(message, &mut stdout).await {
            Ok(()) | Err(Error::Interrupted) => {}
            Err(e) => return Err(e.into()),
        }
    } else {
        repl.run(BufReader::new(tokio::io::stdin()), &mut stdout).await?;
    }

    Ok(())
}

/// Initialize tracing (M-LOG-STRUCTURED). Logs go to stderr so replies on
/// stdout stay clean.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
