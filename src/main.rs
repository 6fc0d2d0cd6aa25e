use clap::Parser;
use matchbook::adapters::start_api_server_background;
use matchbook::api::AppState;
use matchbook::cli::output::{self, OutputMode};
use matchbook::cli::{admin, Cli, Commands, TeamCommands};
use matchbook::config::{AppConfig, StorageBackend};
use matchbook::coordinator::RecoveryLoader;
use matchbook::error::{MatchbookError, Result};
use matchbook::services::StandingsService;
use matchbook::tier::TierClassifier;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

mod main_runtime;

use main_runtime::{build_coordinator, build_store, init_logging, init_logging_simple};

/// Inbound actor events buffered ahead of the coordinator's pump
const EVENT_QUEUE_DEPTH: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        None => {
            init_logging(&config.logging);
            run_serve(config, true).await?;
        }
        Some(Commands::Serve { no_recover }) => {
            init_logging(&config.logging);
            run_serve(config, !no_recover).await?;
        }
        Some(Commands::Migrate) => {
            init_logging_simple();
            if config.storage.backend == StorageBackend::Memory {
                output::print_kv("migrate", "in-memory store, nothing to do");
            } else {
                build_store(&config, true).await?;
                output::print_success("Migrations applied");
            }
        }
        Some(Commands::Leaderboard { kind, limit, json }) => {
            init_logging_simple();
            let store = build_store(&config, false).await?;
            let standings =
                StandingsService::new(store, TierClassifier::from_config(&config.tiers));
            admin::show_leaderboard(&standings, kind, limit, OutputMode::from_json_flag(json))
                .await?;
        }
        Some(Commands::Tier { participant }) => {
            init_logging_simple();
            let store = build_store(&config, false).await?;
            let standings =
                StandingsService::new(store, TierClassifier::from_config(&config.tiers));
            admin::show_tier(&standings, participant).await?;
        }
        Some(Commands::House { json }) => {
            init_logging_simple();
            let store = build_store(&config, false).await?;
            admin::show_house(store.as_ref(), OutputMode::from_json_flag(json)).await?;
        }
        Some(Commands::Ledger { limit, json }) => {
            init_logging_simple();
            let store = build_store(&config, false).await?;
            admin::show_ledger(store.as_ref(), limit, OutputMode::from_json_flag(json)).await?;
        }
        Some(Commands::Register { id, name }) => {
            init_logging_simple();
            let store = build_store(&config, false).await?;
            admin::register(store.as_ref(), id, name).await?;
        }
        Some(Commands::Retire { id, undo }) => {
            init_logging_simple();
            let store = build_store(&config, false).await?;
            admin::retire(store.as_ref(), id, undo).await?;
        }
        Some(Commands::Team(cmd)) => {
            init_logging_simple();
            let store = build_store(&config, false).await?;
            match cmd {
                TeamCommands::Create {
                    kind,
                    name,
                    owner,
                    members,
                } => admin::create_team(store.as_ref(), kind, name, owner, members).await?,
                TeamCommands::Show { id } => admin::show_team(store.as_ref(), id).await?,
            }
        }
    }

    Ok(())
}

fn load_config(dir: &str) -> Result<AppConfig> {
    let config = AppConfig::load_from(dir)?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            output::print_error(e);
        }
        return Err(MatchbookError::validation(format!(
            "invalid configuration: {}",
            errors.join("; ")
        )));
    }
    Ok(config)
}

async fn run_serve(config: AppConfig, recover: bool) -> Result<()> {
    info!(
        backend = ?config.storage.backend,
        timeout_secs = config.confirmation.timeout_secs,
        "Starting matchbook"
    );

    let store = build_store(&config, true).await?;
    let coordinator = build_coordinator(&config, store.clone());

    if recover && config.confirmation.recover_on_start {
        RecoveryLoader::new(coordinator.clone()).recover().await?;
    }

    let standings = StandingsService::new(store, TierClassifier::from_config(&config.tiers));
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let (shutdown_tx, _) = broadcast::channel(1);

    let pump = tokio::spawn(coordinator.clone().run(events_rx, shutdown_tx.subscribe()));

    let state = AppState::new(
        coordinator,
        standings,
        events_tx,
        config.messenger.affordance,
    );
    let mut api = start_api_server_background(state, config.api.port, shutdown_tx.subscribe());

    let finished = tokio::select! {
        res = signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutdown requested");
            None
        }
        res = &mut api => Some(res),
    };

    let _ = shutdown_tx.send(());

    let api_result = match finished {
        Some(res) => res,
        None => api.await,
    };
    let failure = match api_result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => {
            error!("API server failed: {}", e);
            Some(e)
        }
        Err(e) => {
            error!("API server task aborted: {}", e);
            Some(MatchbookError::Internal(e.to_string()))
        }
    };

    if let Err(e) = pump.await {
        error!("Coordinator task aborted: {}", e);
    }

    info!("Matchbook stopped");
    failure.map_or(Ok(()), Err)
}
