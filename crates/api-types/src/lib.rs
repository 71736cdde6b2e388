//! Data types for the status tracker's HTTP endpoints.
//!
//! These structs define the JSON responses returned by the health server. They
//! live in a separate crate so the server and the monitors can share them
//! without depending on each other.

#![allow(missing_docs)]

use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Health of a single provider as exposed on `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub provider: String,
    /// `healthy`, `backing_off` or `exhausted`
    pub health: String,
    pub consecutive_failures: u32,
    pub tracked_incidents: usize,
    /// RFC 3339 time of the last successful cycle
    pub last_success: Option<String>,
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub tracked_incidents: usize,
    pub providers: Vec<ProviderStatus>,
}

impl StatusResponse {
    /// A `running` response summarising `providers`.
    pub fn running(providers: Vec<ProviderStatus>) -> Self {
        let tracked_incidents = providers.iter().map(|p| p.tracked_incidents).sum();
        Self {
            status: "running".to_owned(),
            message: format!("Status tracker is monitoring {} provider(s)", providers.len()),
            tracked_incidents,
            providers,
        }
    }
}
