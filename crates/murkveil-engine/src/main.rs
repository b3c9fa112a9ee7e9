//! Lucidity engine binary for the Murkveil world.
//!
//! Wires the lucidity subsystem together: live storage, the catatonia
//! registry with its relocation failover, the NATS notifier and command
//! listener, and the flux scheduler task.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `murkveil-config.yaml`
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Connect to `Dragonfly`
//! 5. Connect to NATS
//! 6. Assemble the live store, registry, notifier, engine, and gateway
//! 7. Start the command listener
//! 8. Spawn the flux scheduler task
//! 9. Wait for ctrl-c, then shut down: abort the scheduler, close pools

mod commands;
mod config;
mod error;
mod failover;
mod notifier;
mod worldview;

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use murkveil_flux::FluxScheduler;
use murkveil_lucidity::{
    AdjustmentEngine, CatatoniaRegistry, EffectsGateway, Notifier, TransitionObserver,
};
use murkveil_store::{DragonflyPool, LiveStore, PostgresPool};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::failover::NatsFailover;
use crate::notifier::NatsNotifier;
use crate::worldview::NatsWorldView;

/// Application entry point for the lucidity engine.
///
/// Initializes all subsystems and runs until interrupted.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("murkveil-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        tick_interval_ms = config.flux.tick_interval_ms,
        ticks_per_cadence = config.flux.ticks_per_cadence,
        loss_threshold = config.lucidity.loss_threshold,
        "Configuration loaded"
    );

    // 3. Connect to PostgreSQL and run migrations.
    let pg = PostgresPool::connect_url(&config.infrastructure.postgres_url)
        .await
        .map_err(EngineError::from)?;
    pg.run_migrations().await.map_err(EngineError::from)?;

    // 4. Connect to Dragonfly.
    let hot = DragonflyPool::connect(&config.infrastructure.dragonfly_url)
        .await
        .map_err(EngineError::from)?;

    // 5. Connect to NATS.
    let nats_url = &config.infrastructure.nats_url;
    info!(nats_url, "Connecting to NATS");
    let nats = async_nats::connect(nats_url)
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("connect {nats_url}: {e}"),
        })?;
    info!("NATS connected");

    // 6. Assemble the services.
    let store = Arc::new(LiveStore::new(pg.clone(), hot));

    let registry = Arc::new(CatatoniaRegistry::with_failover(Arc::new(
        NatsFailover::new(nats.clone()),
    )));
    let notifier = Arc::new(NatsNotifier::spawn(nats.clone()));

    let engine = Arc::new(
        AdjustmentEngine::new(
            Arc::clone(&store),
            Arc::clone(&registry) as Arc<dyn TransitionObserver>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        )
        .with_config(config.lucidity.clone()),
    );
    let gateway = Arc::new(
        EffectsGateway::new(Arc::clone(&engine), Arc::clone(&store))
            .with_config(config.lucidity.clone()),
    );
    info!("Lucidity services assembled");

    // 7. Start the command listener.
    commands::start(&nats, gateway).await?;

    // 8. Spawn the flux scheduler task.
    let world = Arc::new(NatsWorldView::new(nats.clone()));
    let scheduler = FluxScheduler::new(
        Arc::clone(&engine),
        world,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    )
    .with_config(config.flux.to_flux_config());
    let scheduler_handle = tokio::spawn(scheduler.run());
    info!("Flux scheduler task spawned");

    // 9. Run until interrupted, then shut down cleanly.
    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");

    scheduler_handle.abort();
    pg.close().await;

    info!(
        catatonic_actors = registry.len(),
        "murkveil-engine shutdown complete"
    );
    Ok(())
}

/// Load the engine configuration from `murkveil-config.yaml`.
///
/// Looks for the config file relative to the current working directory;
/// a missing file yields defaults.
fn load_config() -> Result<EngineConfig, EngineError> {
    let config_path = Path::new("murkveil-config.yaml");
    if config_path.exists() {
        Ok(EngineConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(EngineConfig::default())
    }
}
