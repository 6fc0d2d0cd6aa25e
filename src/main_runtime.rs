use matchbook::adapters::{LogMessenger, WebhookMessenger};
use matchbook::config::{AppConfig, LoggingConfig, StorageBackend};
use matchbook::coordinator::ConfirmationCoordinator;
use matchbook::error::Result;
use matchbook::ledger::LedgerApplier;
use matchbook::messenger::{Broadcaster, Confirmable};
use matchbook::persistence::{MemoryStore, PostgresStore, Store};
use matchbook::services::NotificationFanout;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", config.level)));

    // MATCHBOOK_LOG_DIR wins over logging.dir; no directory means console only
    let log_dir = std::env::var("MATCHBOOK_LOG_DIR")
        .ok()
        .or_else(|| config.dir.clone());

    // `tracing_appender::rolling::daily` panics if it can't create the
    // initial log file, so preflight writability.
    let file_layer = log_dir.as_deref().and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Could not create log directory {} ({}), file logging disabled", dir, e);
            return None;
        }
        let probe = std::path::Path::new(dir).join(".matchbook_write_test");
        match std::fs::OpenOptions::new().create(true).append(true).open(&probe) {
            Ok(_) => {
                let _ = std::fs::remove_file(&probe);
                let file_appender = tracing_appender::rolling::daily(dir, "matchbook.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the life of the process
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!("Warning: Could not write to log directory {} ({}), file logging disabled", dir, e);
                None
            }
        }
    });

    let (plain_layer, json_layer) = if config.json {
        (None, Some(tracing_subscriber::fmt::layer().json().with_target(true)))
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
            None,
        )
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, log_dir) {
        eprintln!("Logging to: {}/matchbook.log", dir);
    }
}

pub fn init_logging_simple() {
    // Minimal logging for admin commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// Open the configured store, running migrations first when asked
pub async fn build_store(config: &AppConfig, migrate: bool) -> Result<Arc<dyn Store>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using the in-memory store; nothing survives a restart");
            Ok(Arc::new(MemoryStore::from_config(
                &config.rating,
                &config.economy,
            )))
        }
        StorageBackend::Postgres => {
            let store = PostgresStore::new(&config.database.url, config.database.max_connections)
                .await?
                .with_initial_rating(config.rating.initial_rating);
            if migrate {
                store.migrate().await?;
            }
            Ok(Arc::new(store))
        }
    }
}

/// Webhook bridge when configured, otherwise log-only messaging
pub fn build_messenger(config: &AppConfig) -> (Arc<dyn Confirmable>, Arc<dyn Broadcaster>) {
    match WebhookMessenger::from_config(&config.messenger) {
        Some(webhook) => {
            let confirmable: Arc<dyn Confirmable> = webhook.clone();
            let broadcaster: Arc<dyn Broadcaster> = webhook;
            (confirmable, broadcaster)
        }
        None => {
            info!("No chat bridge configured; prompts and outcomes go to the log");
            let messenger = Arc::new(LogMessenger::new(
                config.messenger.prompt_channel.clone(),
                config.messenger.affordance,
            ));
            let confirmable: Arc<dyn Confirmable> = messenger.clone();
            let broadcaster: Arc<dyn Broadcaster> = messenger;
            (confirmable, broadcaster)
        }
    }
}

pub fn build_coordinator(config: &AppConfig, store: Arc<dyn Store>) -> ConfirmationCoordinator {
    let (confirmable, broadcaster) = build_messenger(config);
    ConfirmationCoordinator::new(
        store.clone(),
        LedgerApplier::from_config(store, config),
        confirmable,
        NotificationFanout::from_config(broadcaster, &config.fanout)
            .with_prompt_channel(config.messenger.prompt_channel.clone()),
        config.confirmation.timeout(),
    )
}
