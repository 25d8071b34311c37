use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named fields extracted from a page. `None` means the field was not found.
pub type Fields = BTreeMap<String, Option<String>>;

/// Classification of a transport-level failure reported by the fetch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Timeout,
    Proxy,
    Render,
    Driver,
    Unknown,
}

impl TransportKind {
    /// Transient kinds are worth retrying with more effort; `Unknown` is terminal.
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportKind::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Proxy => "proxy",
            TransportKind::Render => "render",
            TransportKind::Driver => "driver",
            TransportKind::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(TransportKind::Timeout),
            "proxy" => Some(TransportKind::Proxy),
            "render" => Some(TransportKind::Render),
            "driver" => Some(TransportKind::Driver),
            "unknown" => Some(TransportKind::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Content fetched and the primary field was found.
    Success,
    /// Content fetched but the primary field is missing.
    Incomplete,
    /// Content matched a known "blocked/unavailable" marker.
    Blocked,
    TransportError(TransportKind),
}

/// Opaque cost token reported by the fetch service for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostToken(Option<String>);

impl CostToken {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new(raw: impl Into<String>) -> Self {
        Self(Some(raw.into()))
    }

    pub fn raw(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Numeric credit value; tokens that are absent or not numeric count as zero.
    pub fn credits(&self) -> f64 {
        self.0
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

/// Result of one fetch attempt. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub status: OutcomeStatus,
    pub fields: Fields,
    pub cost: CostToken,
    pub timestamp: DateTime<Utc>,
}

impl AttemptOutcome {
    pub fn new(status: OutcomeStatus, fields: Fields, cost: CostToken) -> Self {
        Self {
            status,
            fields,
            cost,
            timestamp: Utc::now(),
        }
    }

    /// A failed attempt still carries whatever the service charged for it.
    pub fn transport_error(kind: TransportKind, cost: CostToken) -> Self {
        Self::new(OutcomeStatus::TransportError(kind), Fields::new(), cost)
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
