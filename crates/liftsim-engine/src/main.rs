//! Engine binary for the liftsim elevator simulation.
//!
//! Wires the tick scheduler to its store, the Observer API, and the
//! optional NATS publisher, then runs until Ctrl-C or an operator stop.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `liftsim-config.yaml` (or `LIFTSIM_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Select the store: `PostgreSQL` when `database_url` is set, in-memory
//!    otherwise
//! 4. Start the Observer API server
//! 5. Connect the NATS publisher when `nats_url` is set
//! 6. Run the scheduler until stopped
//! 7. Log the result

mod error;
mod nats_notifier;

use std::path::PathBuf;
use std::sync::Arc;

use liftsim_core::config::LoggingConfig;
use liftsim_core::{FanoutNotifier, Scheduler, SchedulerControl, SimulationConfig, run_scheduler};
use liftsim_db::{EntityStore, InMemoryStore, PostgresConfig, PostgresPool};
use liftsim_observer::{AppState, ServerConfig, spawn_observer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::nats_notifier::NatsNotifier;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "liftsim-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step fails. Failures inside
/// the tick loop are logged and never end the process.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        tick_interval_ms = config.simulation.tick_interval_ms,
        door_open_ticks = config.simulation.door_open_ticks,
        door_close_ticks = config.simulation.door_close_ticks,
        "liftsim-engine starting"
    );

    // 3. Select the store.
    if let Some(url) = config.infrastructure.database_url.as_deref() {
        info!("Connecting to PostgreSQL");
        let pool = PostgresPool::connect(&PostgresConfig::new(url))
            .await
            .map_err(EngineError::from)?;
        pool.run_migrations().await.map_err(EngineError::from)?;
        info!("Database migrations applied");
        run(&config, Arc::new(pool.store())).await?;
        pool.close().await;
    } else {
        warn!("No database_url configured, running on the in-memory store");
        run(&config, Arc::new(InMemoryStore::new())).await?;
    }

    Ok(())
}

/// Start the observer and NATS publisher, then run the scheduler over
/// `store` until it is stopped.
async fn run<S: EntityStore + 'static>(
    config: &SimulationConfig,
    store: Arc<S>,
) -> Result<(), EngineError> {
    let control = Arc::new(SchedulerControl::new(config.simulation.tick_interval_ms));

    // 4. Start Observer API server.
    let app_state = Arc::new(
        AppState::new(Arc::clone(&store), config.buildings.clone())
            .with_control(Arc::clone(&control)),
    );
    let server_config = ServerConfig {
        host: config.infrastructure.observer_host.clone(),
        port: config.infrastructure.observer_port,
    };
    let observer = spawn_observer(&server_config, Arc::clone(&app_state)).await?;

    // 5. Connect the NATS publisher.
    let nats = match config.infrastructure.nats_url.as_deref() {
        Some(url) => match NatsNotifier::connect(url).await {
            Ok(notifier) => {
                info!(nats_url = url, "NATS snapshot publisher connected");
                Some(notifier)
            }
            Err(e) => {
                warn!(error = %e, "NATS unavailable, snapshots go to the observer only");
                None
            }
        },
        None => None,
    };

    // Ctrl-C requests a stop; the cycle in progress completes.
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping scheduler");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }

    // 6. Run the scheduler.
    let notifier = FanoutNotifier::new(app_state.notifier(), nats);
    let mut scheduler = Scheduler::new(store, notifier, config.door_timing());
    let report = run_scheduler(&mut scheduler, &control).await;

    // 7. Shut down.
    observer.abort();
    info!(
        cycles = report.cycles,
        elevator_failures = report.elevator_failures,
        "liftsim-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from `LIFTSIM_CONFIG` or `liftsim-config.yaml`.
///
/// A missing file yields the defaults with environment overrides applied.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let path = std::env::var("LIFTSIM_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(SimulationConfig::from_file(&path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.infrastructure.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(config: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EngineError::Logging {
            message: format!("invalid log level {:?}: {e}", config.level),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
