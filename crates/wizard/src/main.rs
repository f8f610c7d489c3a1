//! `pension-wizard` -- terminal pension calculator.
//!
//! Asks the wizard's questions on the terminal, submits the answers to the
//! calculation service, prints the pre-/post-reform comparison and hosts
//! the chat with the virtual assistant. State survives restarts.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default | Description                          |
//! |----------------------------|----------|---------|--------------------------------------|
//! | `API_BASE_URL`             | yes      | --      | Calculation service, e.g. `http://host:8000` |
//! | `CHAT_WEBHOOK_URL`         | no       | --      | Chat agent webhook; unset disables the agent |
//! | `CALCULATION_TIMEOUT_SECS` | no       | `10`    | Bound on calculation/session/email calls |
//! | `CHAT_TIMEOUT_SECS`        | no       | `15`    | Bound on a chat reply                |
//! | `PENSION_STATE_DIR`        | no       | platform data dir | Where wizard state is stored |

use std::sync::Arc;

use anyhow::Context;
use pension_client::api::PensionApi;
use pension_client::chat::ChatAgent;
use pension_client::config::ClientConfig;
use pension_wizard::controller::{Services, WizardController};
use pension_wizard::storage::{FileStore, KeyValueStore, MemoryStore, Storage};
use pension_wizard::terminal::Terminal;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pension_wizard=info,pension_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env().context("Invalid configuration")?;

    tracing::info!(
        api_base_url = %config.api_base_url,
        chat_enabled = config.chat_webhook_url.is_some(),
        calculation_timeout_secs = config.calculation_timeout.as_secs(),
        chat_timeout_secs = config.chat_timeout.as_secs(),
        "Starting pension-wizard",
    );

    let storage = Storage::new(open_backend());

    let http = reqwest::Client::new();
    let api = Arc::new(PensionApi::from_config(http.clone(), &config));
    let services = Services {
        calculation: api.clone(),
        reports: api,
        chat: Arc::new(ChatAgent::from_config(http, &config)),
    };

    let mut controller = WizardController::new(storage, services);
    let phase = controller.load().await;
    tracing::info!(phase = phase.as_str(), "Wizard ready");

    // Ctrl-C abandons a calculation in flight instead of killing the process.
    let abort = controller.abort_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !abort.abort() {
                std::process::exit(130);
            }
            tracing::info!("Calculation aborted");
        }
    });

    let mut terminal = Terminal::new(BufReader::new(tokio::io::stdin()), std::io::stdout());
    terminal.run(&mut controller).await?;
    Ok(())
}

/// File-backed storage under `PENSION_STATE_DIR` or the platform data
/// directory, falling back to memory when neither is usable.
fn open_backend() -> Arc<dyn KeyValueStore> {
    let dir = std::env::var("PENSION_STATE_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(Into::into)
        .or_else(FileStore::default_dir);

    let Some(dir) = dir else {
        tracing::warn!("No state directory available, state will not survive restarts");
        return Arc::new(MemoryStore::new());
    };

    match FileStore::open(&dir) {
        Ok(store) => {
            tracing::info!(dir = %store.dir().display(), "Using file storage");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "Cannot open state directory, state will not survive restarts",
            );
            Arc::new(MemoryStore::new())
        }
    }
}
