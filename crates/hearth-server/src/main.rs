use anyhow::Context;
use hearth_auth::AuthService;
use hearth_db::{DbManager, SurrealAccountRepository};
use hearth_server::config::Settings;
use hearth_server::notify::{OutboxNotifier, drain_outbox};
use hearth_server::{AppState, router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_name = std::env::args().nth(1).unwrap_or_else(|| "hearth".into());
    let settings = Settings::load(&config_name).context("loading settings")?;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    info!(bind_addr = %settings.bind_addr, "Starting hearth server");

    let db = DbManager::connect(&settings.db_config())
        .await
        .context("connecting to the credential store")?;

    let (notifier, outbox) = OutboxNotifier::channel();
    tokio::spawn(drain_outbox(outbox));

    let auth = AuthService::new(
        SurrealAccountRepository::new(db.client().clone()),
        notifier,
        settings.auth_config()?,
    )?;
    let state = AppState::new(auth);

    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Hearth server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
