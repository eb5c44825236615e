//! Run coordination: spawning, pacing and stopping virtual users.
//!
//! ```text
//!            LoadRunner
//!                │ spawn (spawn_rate users/sec)
//!      ┌─────────┼──────────┐
//!      ▼         ▼          ▼
//!   user 1    user 2 …   user N      one tokio task each
//!      │         │          │
//!      └── OutcomeEvent (mpsc) ──► MetricsCollector ──► RunReport
//! ```
//!
//! Stopping is cooperative: the shared [`CancellationToken`] is observed
//! during think-time, never in the middle of a request.

use crate::client::{ApiRequest, HttpTransport, Transport, TransportError};
use crate::config::{ConfigError, LoadConfig};
use crate::executor::ActionExecutor;
use crate::identities::IdentityPool;
use crate::metrics::{MetricsCollector, RunReport};
use crate::scheduler::{user_seed, TaskScheduler};
use crate::user::{UserSummary, VirtualUser};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives a full load run.
pub struct LoadRunner {
    config: LoadConfig,
    transport: Arc<dyn Transport>,

    /// Validated scheduler, reseeded for every user.
    scheduler: TaskScheduler,
}

impl LoadRunner {
    /// Create a runner talking HTTP to `config.base_url`.
    pub fn new(config: LoadConfig) -> Result<Self, RunError> {
        let transport = HttpTransport::new(&config.base_url, &config.http)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a runner over an arbitrary transport.
    pub fn with_transport(
        config: LoadConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let scheduler = TaskScheduler::new(&config.weights, config.think_time, config.seed)
            .map_err(ConfigError::from)?;

        Ok(Self {
            config,
            transport,
            scheduler,
        })
    }

    /// Poll the API until it answers anything at all.
    pub async fn wait_for_ready(&self, timeout: Duration) -> Result<(), RunError> {
        let deadline = Instant::now() + timeout;

        loop {
            let probe = ApiRequest::Info {
                token: String::new(),
            };
            match self.transport.execute(probe).await {
                Ok(response) => {
                    debug!(status = response.status, "API is reachable");
                    return Ok(());
                }
                Err(e) if Instant::now() >= deadline => {
                    warn!(error = %e, "API not reachable before deadline");
                    return Err(RunError::NotReady(timeout));
                }
                Err(e) => {
                    debug!(error = %e, "API not reachable yet");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
        }
    }

    /// Run for a fixed duration.
    pub async fn run_for(&self, duration: Duration) -> RunReport {
        let stop = CancellationToken::new();
        let timer = {
            let stop = stop.clone();
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                stop.cancel();
            })
        };

        let report = self.run_until(stop).await;
        timer.abort();
        report
    }

    /// Run until `stop` is cancelled.
    ///
    /// Spawns `config.users` users at `config.spawn_rate` per second, then
    /// waits for every user to finish its current action and exit.
    pub async fn run_until(&self, stop: CancellationToken) -> RunReport {
        let config = &self.config;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let collector = tokio::spawn(MetricsCollector::new().collect(events_rx));

        let identities = Arc::new(IdentityPool::new(config.identity_prefix.clone()));
        let executor = Arc::new(ActionExecutor::new(
            Arc::clone(&self.transport),
            Arc::clone(&identities),
            Arc::new(config.catalog.clone()),
            config.session,
            events_tx,
        ));

        info!(
            users = config.users,
            spawn_rate = config.spawn_rate,
            base_url = %config.base_url,
            "Starting load run"
        );

        let start = Instant::now();
        let interval = config.spawn_interval();
        let mut handles = Vec::with_capacity(config.users);

        for id in 1..=config.users as u64 {
            if stop.is_cancelled() {
                break;
            }

            let identity = identities.allocate();
            let user = VirtualUser::new(id, identity, config.password.clone());
            let scheduler = self.scheduler.reseed(user_seed(config.seed, id));

            handles.push(tokio::spawn(run_user(
                user,
                scheduler,
                Arc::clone(&executor),
                stop.clone(),
            )));

            if id < config.users as u64 {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }

        info!(spawned = handles.len(), "All users spawned");

        // The collector ends once the last user drops its executor handle.
        drop(executor);

        let summaries: Vec<UserSummary> = join_all(handles)
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(error = %e, "User task panicked");
                    None
                }
            })
            .collect();
        let elapsed = start.elapsed();

        let collector = match collector.await {
            Ok(collector) => collector,
            Err(e) => {
                warn!(error = %e, "Metrics collector failed");
                MetricsCollector::new()
            }
        };
        let report = collector.finish(elapsed, &summaries);

        info!(
            requests = report.total_requests(),
            failures = report.total_failures(),
            rps = report.requests_per_second(),
            identities = identities.len(),
            "Load run finished"
        );

        report
    }
}

/// One virtual user's session, from login to stop.
async fn run_user(
    mut user: VirtualUser,
    mut scheduler: TaskScheduler,
    executor: Arc<ActionExecutor>,
    stop: CancellationToken,
) -> UserSummary {
    if !executor.authenticate(&mut user).await {
        return user.summary();
    }

    loop {
        let pause = scheduler.think_time();
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }

        let task = scheduler.next_task();
        let issued = executor.run_task(task, &mut user, scheduler.rng()).await;
        if issued == 0 {
            debug!(user = user.identity(), %task, "Task skipped by guard");
        }
    }

    user.stop();
    debug!(
        id = user.id(),
        user = user.identity(),
        balance = user.balance(),
        transfers = user.transfers(),
        purchases = user.purchases(),
        "User stopped"
    );
    user.summary()
}

/// Errors that prevent a run from starting.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API not ready after {0:?}")]
    NotReady(Duration),
}
