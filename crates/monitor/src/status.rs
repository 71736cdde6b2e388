use api_types::{ProviderStatus, StatusResponse};
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::backoff::Health;

/// Snapshot of one provider's monitor, published after every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatus {
    /// Provider name
    pub provider: String,
    /// Current health
    pub health: Health,
    /// Failed cycles since the last success
    pub consecutive_failures: u32,
    /// Identities in the seen-incident index
    pub tracked_incidents: usize,
    /// End of the last successful cycle
    pub last_success: Option<DateTime<Utc>>,
}

impl MonitorStatus {
    /// Status of a monitor that has not polled yet.
    pub const fn initial(provider: String) -> Self {
        Self {
            provider,
            health: Health::Healthy,
            consecutive_failures: 0,
            tracked_incidents: 0,
            last_success: None,
        }
    }
}

impl From<&MonitorStatus> for ProviderStatus {
    fn from(s: &MonitorStatus) -> Self {
        let health = match s.health {
            Health::Healthy => "healthy",
            Health::BackingOff => "backing_off",
            Health::Exhausted => "exhausted",
        };
        Self {
            provider: s.provider.clone(),
            health: health.to_owned(),
            consecutive_failures: s.consecutive_failures,
            tracked_incidents: s.tracked_incidents,
            last_success: s.last_success.map(|ts| ts.to_rfc3339()),
        }
    }
}

/// Read side of every monitor's status channel.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    receivers: Vec<watch::Receiver<MonitorStatus>>,
}

impl StatusBoard {
    /// Aggregate the given status receivers.
    pub const fn new(receivers: Vec<watch::Receiver<MonitorStatus>>) -> Self {
        Self { receivers }
    }

    /// Latest status of every provider, in start order.
    pub fn snapshot(&self) -> Vec<MonitorStatus> {
        self.receivers.iter().map(|rx| rx.borrow().clone()).collect()
    }

    /// Total identities tracked across providers.
    pub fn tracked_incidents(&self) -> usize {
        self.receivers.iter().map(|rx| rx.borrow().tracked_incidents).sum()
    }

    /// Body served on the status endpoint.
    pub fn response(&self) -> StatusResponse {
        StatusResponse::running(self.snapshot().iter().map(ProviderStatus::from).collect())
    }
}
