//! Bridge runner for lifecycle management.

use std::future::Future;
use std::time::Duration;

use tokio::signal;

use solarsight_common::{LoggingConfig, init_tracing};

use crate::BridgeArgs;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

/// One unit of periodic bridge work, e.g. an acquire-and-publish cycle.
pub trait Worker {
    /// Run one cycle. Errors are logged by the runner and never stop it.
    fn tick(&mut self) -> impl Future<Output = Result<()>>;
}

/// State of the periodic loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// Sleeping between cycles.
    Idle,
    /// Executing one cycle.
    Running,
}

impl DaemonState {
    /// Name used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonState::Idle => "idle",
            DaemonState::Running => "running",
        }
    }
}

/// Bridge runner that manages the lifecycle of a protocol bridge.
///
/// Handles:
/// - Logging initialization
/// - Running a [`Worker`] at a fixed interval, forever
/// - Stopping on Ctrl+C
///
/// # Example
///
/// ```ignore
/// use solarsight_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let args = BridgeArgs::parse_with_default("mybridge.json5");
///     let config = MyBridgeConfig::load(&args.config)?;
///
///     let runner = BridgeRunner::new_with_args("mybridge", config, Some(&args))?;
///     let mut worker = MyWorker::new(runner.config());
///
///     runner.run_periodic(&mut worker, Duration::from_secs(60)).await
/// }
/// ```
pub struct BridgeRunner<C: BridgeConfig> {
    /// Bridge name for logging.
    name: String,
    /// Bridge version.
    version: String,
    /// The loaded configuration.
    config: C,
}

impl<C: BridgeConfig> BridgeRunner<C> {
    /// Create a new bridge runner and initialize logging.
    ///
    /// The log level from the CLI args, when given, overrides the config.
    pub fn new_with_args(
        name: impl Into<String>,
        config: C,
        args: Option<&BridgeArgs>,
    ) -> Result<Self> {
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION").to_string();

        let log_config = match args.and_then(|a| a.log_level.as_ref()) {
            Some(level) => LoggingConfig {
                level: level.clone(),
                format: config.logging().format,
            },
            None => config.logging().clone(),
        };

        init_tracing(&log_config).map_err(|e| BridgeError::config(e.to_string()))?;

        tracing::info!(bridge = %name, version = %version, "Starting bridge");

        Ok(Self::without_logging(name, config))
    }

    /// Create a runner that leaves logging setup to the caller.
    pub fn without_logging(name: impl Into<String>, config: C) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Run `worker` every `interval` until Ctrl+C is received.
    ///
    /// The interval is measured from the end of one cycle to the start of
    /// the next, so cycles never overlap and slow cycles push later ones back.
    pub async fn run_periodic<W: Worker>(&self, worker: &mut W, interval: Duration) -> Result<()> {
        let shutdown = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(worker, interval, shutdown).await
    }

    /// Run `worker` every `interval` until `shutdown` completes.
    ///
    /// A cycle in progress when `shutdown` completes runs to the end before
    /// the loop exits, so the worker gets to close its connections.
    pub async fn run_until<W, S>(&self, worker: &mut W, interval: Duration, shutdown: S) -> Result<()>
    where
        W: Worker,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            bridge = %self.name,
            version = %self.version,
            interval_secs = interval.as_secs_f64(),
            "Bridge running. Press Ctrl+C to stop."
        );

        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            tracing::debug!(cycle, state = DaemonState::Running.as_str(), "Cycle starting");

            let tick = worker.tick();
            tokio::pin!(tick);

            let finished = tokio::select! {
                result = &mut tick => Some(result),
                _ = &mut shutdown => None,
            };
            let stopping = finished.is_none();
            let result = match finished {
                Some(result) => result,
                None => {
                    tracing::info!(bridge = %self.name, cycle, "Shutdown requested, finishing current cycle");
                    tick.await
                }
            };

            if let Err(e) = result {
                tracing::error!(bridge = %self.name, cycle, error = %e, "Cycle failed");
            }
            tracing::debug!(cycle, state = DaemonState::Idle.as_str(), "Cycle finished");

            if stopping {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => break,
            }
        }

        tracing::info!(bridge = %self.name, cycles = cycle, "Received shutdown signal");
        tracing::info!(bridge = %self.name, "Goodbye!");

        Ok(())
    }
}
