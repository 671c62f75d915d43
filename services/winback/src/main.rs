use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sea_orm::Database;
use tracing::info;

use mandate_core::tracing::init_tracing;
use mandate_winback::config::WinbackConfig;
use mandate_winback::handlers::cycle::RunCycleResponse;
use mandate_winback::infra::email::HttpEmailGateway;
use mandate_winback::router::build_router;
use mandate_winback::state::AppState;

#[derive(Parser)]
#[command(name = "winback", about = "Winback re-engagement processor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve,
    /// Run one processor cycle, print the summary as JSON and exit.
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve => serve().await,
        Command::Run => run_once().await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "winback exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn build_state() -> anyhow::Result<(WinbackConfig, AppState)> {
    let config = WinbackConfig::from_env()?;
    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    let state = AppState {
        db,
        email: HttpEmailGateway::new(config.email_send_url.clone())?,
        settings: config.settings(),
        cron_secret: config.cron_secret.as_deref().map(Arc::from),
    };
    Ok((config, state))
}

async fn serve() -> anyhow::Result<()> {
    let (config, state) = build_state().await?;
    if state.cron_secret.is_none() {
        tracing::warn!("WINBACK_CRON_SECRET is unset; POST /winback/run is unauthenticated");
    }

    let router = build_router(state);
    let http_addr = format!("0.0.0.0:{}", config.winback_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind {http_addr}"))?;

    info!("winback service listening on {http_addr}");
    axum::serve(listener, router).await.context("server error")
}

async fn run_once() -> anyhow::Result<()> {
    let (_, state) = build_state().await?;
    match state.run_cycle_usecase().execute(Utc::now()).await {
        Ok(summary) => {
            let output = serde_json::to_string(&RunCycleResponse {
                success: true,
                summary,
            })?;
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            let output = serde_json::json!({
                "success": false,
                "kind": e.kind(),
                "message": e.to_string(),
            });
            println!("{output}");
            Err(anyhow::Error::new(e).context("winback cycle failed"))
        }
    }
}
