use std::sync::Arc;

use ai_consult::config::{ConsultConfig, api_key_from_env};
use ai_consult::llm::{LlmBackend, LlmConfig, create_provider};
use ai_consult::server::{self, Services};
use ai_consult::store::{Database, LibSqlBackend};
use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConsultConfig::from_env();

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_tracing(&config);

    let api_key = api_key_from_env().unwrap_or_else(|_| {
        eprintln!("Error: ANTHROPIC_API_KEY not set");
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    });

    eprintln!("AI Consult v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   API: http://0.0.0.0:{}/api", config.port);
    eprintln!("   Session WS: ws://0.0.0.0:{}/ws/session", config.port);

    let llm = create_provider(&LlmConfig {
        backend: LlmBackend::Anthropic,
        api_key,
        model: config.model.clone(),
        max_tokens: config.max_tokens,
    })
    .context("failed to create LLM provider")?;

    let router = match open_database(&config).await {
        Ok(db) => server::app(&Services::new(db, llm, &config)),
        Err(e) => {
            tracing::error!(error = %e, "Startup failed, serving maintenance responses");
            server::unavailable_router()
        }
    };

    server::serve(router, config.port)
        .await
        .with_context(|| format!("HTTP server on port {} failed", config.port))
}

async fn open_database(config: &ConsultConfig) -> anyhow::Result<Arc<dyn Database>> {
    let backend = LibSqlBackend::new_local(&config.db_path)
        .await
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    Ok(Arc::new(backend))
}

fn init_tracing(config: &ConsultConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer().with_target(false);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "ai-consult.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            None
        }
    }
}
