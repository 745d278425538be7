use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use search_summary::api::create_router;
use search_summary::config::CONFIG;
use search_summary::data_models::SearchQuery;
use search_summary::orchestrator::Orchestrator;

#[derive(Parser)]
#[command(about = "Search the web and summarize the top results")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to listen on, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a single query and print the result as JSON
    Query {
        q: String,
        #[arg(long, default_value = "US")]
        country: String,
        #[arg(long, default_value = "en-US")]
        ui_lang: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    CONFIG.warn_missing_credentials();
    let orchestrator = Arc::new(Orchestrator::from_config(&CONFIG)?);

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| CONFIG.bind_addr.clone());
            let app = create_router(orchestrator, &CONFIG.cors_origins);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            tracing::info!("listening on {addr}");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Command::Query { q, country, ui_lang } => {
            let query = SearchQuery::new(q).with_locale(country, ui_lang);
            let result = orchestrator.run(&query).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
    tracing::info!("shutting down");
}
