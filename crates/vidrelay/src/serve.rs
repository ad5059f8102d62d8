// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vidrelay serve` command implementation.
//!
//! Wires storage, the credential pool, the job registry, the operator bot,
//! and the health endpoint together, then waits for a shutdown signal and
//! drains running jobs.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use vidrelay_config::VidrelayConfig;
use vidrelay_core::{
    Credential, HealthStatus, MediaStore, PluginAdapter, PostArchive, RelayError,
};
use vidrelay_relay::{
    CredentialPool, JobRegistry, RelayContext, RelaySettings, install_signal_handler,
};
use vidrelay_storage::SqliteStorage;
use vidrelay_telegram::{BotApiConnector, BotState, OperatorBot};

use crate::health::{self, HealthState};

/// Runs the daemon until SIGINT or SIGTERM.
pub async fn run_serve(config: VidrelayConfig) -> Result<(), RelayError> {
    info!("starting vidrelay serve");

    let storage = open_storage(&config).await?;
    let cancel = install_signal_handler();

    let ctx = relay_context(&config, Arc::clone(&storage))?;
    info!(credentials = ctx.pool.len(), "credential pool ready");
    let registry = Arc::new(JobRegistry::new(ctx, cancel.clone()));

    let state = Arc::new(BotState {
        registry: Arc::clone(&registry),
        media: Arc::clone(&storage) as Arc<dyn MediaStore>,
        archive: Arc::clone(&storage) as Arc<dyn PostArchive>,
        operators: config.telegram.operators.clone(),
    });
    let bot = OperatorBot::new(&config.telegram, state)?;
    match bot.health_check().await? {
        HealthStatus::Healthy => info!("Telegram bot reachable"),
        HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => {
            warn!(reason = %reason, "Telegram bot health check failed, polling anyway");
        }
    }

    let health_task = if config.health.enabled {
        let listener = health::bind(&config.health).await?;
        let state = HealthState::new(Arc::clone(&registry));
        Some(tokio::spawn(health::serve(listener, state, cancel.clone())))
    } else {
        info!("health endpoint disabled by configuration");
        None
    };

    bot.run(cancel.clone()).await;
    // Polling may also stop on its own; make sure jobs see it.
    cancel.cancel();

    let timeout = Duration::from_secs(config.relay.drain_timeout_secs);
    if !registry.drain(timeout).await {
        warn!(
            remaining = registry.running_count().await,
            "relay jobs still running after drain timeout"
        );
    }

    if let Some(task) = health_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "health endpoint failed"),
            Err(e) => error!(error = %e, "health endpoint task panicked"),
        }
    }

    if let Err(e) = bot.shutdown().await {
        warn!(error = %e, "operator bot shutdown failed");
    }
    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }

    info!("vidrelay stopped");
    Ok(())
}

/// Opens the SQLite database and runs migrations.
pub(crate) async fn open_storage(
    config: &VidrelayConfig,
) -> Result<Arc<SqliteStorage>, RelayError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Builds the shared relay context over SQLite and the Bot API transport.
pub(crate) fn relay_context(
    config: &VidrelayConfig,
    storage: Arc<SqliteStorage>,
) -> Result<RelayContext, RelayError> {
    let credentials: Vec<Credential> = config
        .credentials
        .iter()
        .map(|c| c.to_credential())
        .collect();
    let pool = CredentialPool::new(credentials)?;
    let media = if config.relay.record_forwarded {
        Some(Arc::clone(&storage) as Arc<dyn MediaStore>)
    } else {
        None
    };

    Ok(RelayContext {
        connector: Arc::new(BotApiConnector::new(Arc::clone(&storage) as Arc<dyn PostArchive>)),
        pool: Arc::new(pool),
        cursors: storage,
        media,
        settings: RelaySettings::from(config),
    })
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence when set.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vidrelay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
