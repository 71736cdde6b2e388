//! Feed monitoring engine: conditional fetching, change detection, incident
//! diffing, failure backoff, and the scheduler that runs one monitor per provider.
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cognitive_complexity)]

/// Jittered exponential backoff and provider health
pub mod backoff;
/// Monitor error taxonomy
pub mod error;
/// Conditional HTTP GET of a feed
pub mod fetch;
/// The per-provider polling loop
pub mod monitor;
/// Orchestration of many monitors
pub mod scheduler;
/// Seen-incident tracking and diffing
pub mod seen;
/// Conditional-request validators and content hashing
pub mod state;
/// Observable per-provider status
pub mod status;

pub use backoff::{BackoffPolicy, Health};
pub use error::MonitorError;
pub use monitor::{CycleOutcome, FeedMonitor, MonitorOptions};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use seen::SeenIncidentIndex;
pub use state::{ContentHash, FetchState, Validators, content_hash};
pub use status::{MonitorStatus, StatusBoard};
