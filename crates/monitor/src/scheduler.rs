use std::{sync::Arc, time::Duration};

use config::{ProviderConfig, Settings};
use feed::{FeedParser, XmlFeedParser};
use notifier::IncidentEvent;
use reqwest::Client;
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    monitor::{FeedMonitor, MonitorOptions},
    status::StatusBoard,
};

const USER_AGENT: &str = concat!("status-tracker/", env!("CARGO_PKG_VERSION"));

/// Starts one [`FeedMonitor`] task per provider, all sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct Scheduler {
    settings: Settings,
    events: mpsc::Sender<IncidentEvent>,
    client: Client,
    parser: Arc<dyn FeedParser>,
    jitter: fn(Duration) -> Duration,
}

impl Scheduler {
    /// Create a scheduler whose monitors report on `events`.
    pub fn new(settings: Settings, events: mpsc::Sender<IncidentEvent>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(settings, events, client))
    }

    /// Create a scheduler around an existing HTTP client.
    pub fn with_client(
        settings: Settings,
        events: mpsc::Sender<IncidentEvent>,
        client: Client,
    ) -> Self {
        Self {
            settings,
            events,
            client,
            parser: Arc::new(XmlFeedParser),
            jitter: tokio_retry::strategy::jitter,
        }
    }

    /// Replace the backoff jitter source of every monitor.
    #[must_use]
    pub fn with_jitter(mut self, jitter: fn(Duration) -> Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Spawn a monitor for every provider.
    pub fn start(&self, providers: Vec<ProviderConfig>) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let options = MonitorOptions::from(&self.settings);
        let mut tasks = Vec::with_capacity(providers.len());
        let mut receivers = Vec::with_capacity(providers.len());

        for provider in providers {
            let name = provider.name.clone();
            let monitor = FeedMonitor::new(
                provider,
                options,
                self.client.clone(),
                Arc::clone(&self.parser),
                self.events.clone(),
            )
            .with_jitter(self.jitter);
            receivers.push(monitor.subscribe());
            tasks.push((name, tokio::spawn(monitor.run(cancel.child_token()))));
        }

        info!(providers = tasks.len(), "Scheduler started");
        SchedulerHandle {
            cancel,
            tasks,
            board: StatusBoard::new(receivers),
            grace: self.settings.shutdown_grace,
        }
    }
}

/// Running monitors started by [`Scheduler::start`].
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    tasks: Vec<(String, JoinHandle<()>)>,
    board: StatusBoard,
    grace: Duration,
}

impl SchedulerHandle {
    /// Per-provider status receivers.
    pub const fn statuses(&self) -> &StatusBoard {
        &self.board
    }

    /// Number of monitor tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no monitor was started.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every monitor and wait for them to finish.
    ///
    /// Monitors still running when the grace period ends are aborted. A
    /// monitor that panicked is logged and does not affect the others.
    pub async fn stop(self) {
        info!(monitors = self.tasks.len(), grace = ?self.grace, "Stopping monitors");
        self.cancel.cancel();
        let deadline = Instant::now() + self.grace;

        for (provider, mut task) in self.tasks {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => debug!(%provider, "Monitor stopped"),
                Ok(Err(e)) if e.is_panic() => error!(%provider, error = %e, "Monitor panicked"),
                Ok(Err(e)) => warn!(%provider, error = %e, "Monitor task cancelled"),
                Err(_) => {
                    warn!(%provider, "Monitor did not stop within the grace period, aborting");
                    task.abort();
                    let _ = task.await;
                }
            }
        }
    }
}
