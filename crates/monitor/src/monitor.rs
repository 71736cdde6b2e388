use std::{sync::Arc, time::Duration};

use chrono::Utc;
use config::{ProviderConfig, Settings};
use feed::FeedParser;
use notifier::IncidentEvent;
use reqwest::Client;
use tokio::sync::{
    mpsc::{self, error::SendTimeoutError},
    watch,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    backoff::{BackoffPolicy, Health},
    error::MonitorError,
    fetch::{self, FetchOutcome},
    seen::SeenIncidentIndex,
    state::{FetchState, content_hash},
    status::MonitorStatus,
};

/// Settings shared by every feed monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Retry policy applied on failed cycles
    pub backoff: BackoffPolicy,
    /// Incidents replayed as historical on the first parse, `None` to disable
    pub history: Option<usize>,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// How long to wait for the notifier to accept an event
    pub notify_timeout: Duration,
}

impl From<&Settings> for MonitorOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            backoff: BackoffPolicy::from_settings(settings),
            history: settings.show_historical.then_some(settings.max_historical),
            request_timeout: settings.request_timeout,
            notify_timeout: settings.notify_timeout,
        }
    }
}

/// What a successful poll cycle found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The server answered 304.
    NotModified,
    /// The body hashed to the last processed one; parsing was skipped.
    Unchanged,
    /// The body changed and was parsed and diffed.
    Changed {
        /// Events handed to the notifier
        emitted: usize,
    },
}

/// Polls one provider's feed and reports incident changes.
#[derive(Debug)]
pub struct FeedMonitor {
    provider: ProviderConfig,
    options: MonitorOptions,
    client: Client,
    parser: Arc<dyn FeedParser>,
    events: mpsc::Sender<IncidentEvent>,
    state: FetchState,
    seen: SeenIncidentIndex,
    status: watch::Sender<MonitorStatus>,
    jitter: fn(Duration) -> Duration,
}

impl FeedMonitor {
    /// Create a monitor for `provider` that reports events on `events`.
    pub fn new(
        provider: ProviderConfig,
        options: MonitorOptions,
        client: Client,
        parser: Arc<dyn FeedParser>,
        events: mpsc::Sender<IncidentEvent>,
    ) -> Self {
        let (status, _) = watch::channel(MonitorStatus::initial(provider.name.clone()));
        Self {
            provider,
            options,
            client,
            parser,
            events,
            state: FetchState::default(),
            seen: SeenIncidentIndex::new(),
            status,
            jitter: tokio_retry::strategy::jitter,
        }
    }

    /// Replace the backoff jitter source.
    ///
    /// The function receives the maximum jitter and returns the amount to add.
    #[must_use]
    pub fn with_jitter(mut self, jitter: fn(Duration) -> Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Subscribe to the status published after every cycle.
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status.subscribe()
    }

    /// Conditional-request state.
    pub const fn fetch_state(&self) -> &FetchState {
        &self.state
    }

    /// Incidents seen so far.
    pub const fn seen(&self) -> &SeenIncidentIndex {
        &self.seen
    }

    /// Health derived from the current failure count.
    pub const fn health(&self) -> Health {
        self.options.backoff.health(self.state.consecutive_failures)
    }

    /// Wait before the next cycle given the current failure count.
    pub fn next_wait(&self) -> Duration {
        self.options.backoff.next_wait(
            self.state.consecutive_failures,
            self.provider.poll_interval,
            self.jitter,
        )
    }

    /// Run a single fetch/diff/emit cycle and update the failure count.
    pub async fn poll_once(&mut self) -> Result<CycleOutcome, MonitorError> {
        let result = match self.fetch().await {
            Ok(outcome) => self.process(outcome).await,
            Err(e) => Err(e),
        };
        self.record(&result);
        result
    }

    /// Poll until `cancel` fires.
    ///
    /// Cancellation is observed only while a request is in flight or while
    /// sleeping between cycles; a body already received is always parsed,
    /// diffed and emitted before the monitor stops.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            provider = %self.provider.name,
            url = %self.provider.feed_url,
            feed_type = %self.provider.feed_type,
            interval = ?self.provider.poll_interval,
            "Starting feed monitor"
        );

        loop {
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                fetched = self.fetch() => fetched,
            };
            let result = match fetched {
                Ok(outcome) => self.process(outcome).await,
                Err(e) => Err(e),
            };
            self.record(&result);

            let wait = self.next_wait();
            debug!(provider = %self.provider.name, ?wait, "Waiting for next poll");
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }
        }

        info!(provider = %self.provider.name, "Feed monitor stopped");
    }

    async fn fetch(&self) -> Result<FetchOutcome, MonitorError> {
        fetch::conditional_get(
            &self.client,
            &self.provider.feed_url,
            &self.state,
            self.options.request_timeout,
        )
        .await
    }

    async fn process(&mut self, outcome: FetchOutcome) -> Result<CycleOutcome, MonitorError> {
        let FetchOutcome::Modified { body, validators } = outcome else {
            debug!(provider = %self.provider.name, "Feed not modified");
            return Ok(CycleOutcome::NotModified);
        };

        let hash = content_hash(&body);
        if self.state.is_unchanged(&hash) {
            debug!(provider = %self.provider.name, "Feed body unchanged, skipping parse");
            self.state.commit(hash, validators);
            return Ok(CycleOutcome::Unchanged);
        }

        let incidents = self.parser.parse(&body, self.provider.feed_type, &self.provider.name)?;
        self.state.commit(hash, validators);
        let first = !self.seen.has_baseline();
        let parsed = incidents.len();
        let events = self.seen.diff(incidents, self.options.history);
        debug!(
            provider = %self.provider.name,
            parsed,
            events = events.len(),
            hash = ?self.state.hash_prefix(),
            "Processed changed feed"
        );
        if first {
            info!(
                provider = %self.provider.name,
                tracked = self.seen.len(),
                "Established incident baseline"
            );
        }

        let emitted = self.emit(events).await;
        Ok(CycleOutcome::Changed { emitted })
    }

    async fn emit(&self, events: Vec<IncidentEvent>) -> usize {
        let mut emitted = 0;
        for event in events {
            info!(
                provider = %self.provider.name,
                kind = %event.kind,
                incident = %event.incident.key(),
                status = %event.incident.status,
                "Incident change detected"
            );
            match self.events.send_timeout(event, self.options.notify_timeout).await {
                Ok(()) => emitted += 1,
                Err(SendTimeoutError::Timeout(event)) => warn!(
                    provider = %self.provider.name,
                    incident = %event.incident.key(),
                    "Notifier busy, dropping event"
                ),
                Err(SendTimeoutError::Closed(event)) => warn!(
                    provider = %self.provider.name,
                    incident = %event.incident.key(),
                    "Notifier channel closed, dropping event"
                ),
            }
        }
        emitted
    }

    fn record(&mut self, result: &Result<CycleOutcome, MonitorError>) {
        let before = self.health();
        match result {
            Ok(_) => {
                if before == Health::Exhausted {
                    info!(
                        provider = %self.provider.name,
                        failures = self.state.consecutive_failures,
                        "Provider recovered"
                    );
                } else if before == Health::BackingOff {
                    debug!(provider = %self.provider.name, "Provider healthy again");
                }
                self.state.consecutive_failures = 0;
            }
            Err(e) => {
                self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
                let failures = self.state.consecutive_failures;
                debug!(
                    provider = %self.provider.name,
                    kind = e.kind(),
                    error = %e,
                    failures,
                    "Poll cycle failed"
                );
                if before != Health::Exhausted && self.health() == Health::Exhausted {
                    error!(
                        provider = %self.provider.name,
                        error = %MonitorError::Exhausted { failures },
                        retry_every = ?self.options.backoff.cap,
                        "ProviderExhausted"
                    );
                }
            }
        }

        let health = self.health();
        let failures = self.state.consecutive_failures;
        let tracked = self.seen.len();
        let succeeded = result.is_ok();
        self.status.send_modify(|s| {
            s.health = health;
            s.consecutive_failures = failures;
            s.tracked_incidents = tracked;
            if succeeded {
                s.last_success = Some(Utc::now());
            }
        });
    }
}
