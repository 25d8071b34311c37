use crate::outcome::{Fields, TransportKind};
use crate::target::Target;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "ERROR")]
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Ok => "OK",
            RecordStatus::Failed => "FAILED",
            RecordStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a target did not resolve to `OK`.
///
/// Serialized as a flat string (`"blocked"`, `"incomplete"`, `"timeout"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FailureReason {
    Incomplete,
    Blocked,
    Transport(TransportKind),
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Incomplete => "incomplete",
            FailureReason::Blocked => "blocked",
            FailureReason::Transport(kind) => kind.as_str(),
        }
    }

    /// A blocked page is a clean "no" from the site; everything else is an error.
    pub fn status(&self) -> RecordStatus {
        match self {
            FailureReason::Blocked => RecordStatus::Failed,
            _ => RecordStatus::Error,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FailureReason> for String {
    fn from(reason: FailureReason) -> Self {
        reason.as_str().to_string()
    }
}

impl TryFrom<String> for FailureReason {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "incomplete" => Ok(FailureReason::Incomplete),
            "blocked" => Ok(FailureReason::Blocked),
            other => TransportKind::parse(other)
                .map(FailureReason::Transport)
                .ok_or_else(|| format!("unknown failure reason: {}", other)),
        }
    }
}

/// The pass a record was produced by. Later passes compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Sessions,
    Rescue,
    Deep,
}

impl Pass {
    pub fn number(&self) -> u8 {
        match self {
            Pass::Sessions => 1,
            Pass::Rescue => 2,
            Pass::Deep => 3,
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pass {}", self.number())
    }
}

/// Outcome of one pass for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub index: u32,
    pub address: String,
    pub status: RecordStatus,
    #[serde(default)]
    pub fields: Fields,
    pub attempt_count: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<FailureReason>,
    pub pass: Pass,
    #[serde(default)]
    pub cost: f64,
}

impl TargetRecord {
    pub fn ok(
        target: &Target,
        pass: Pass,
        fields: Fields,
        attempt_count: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            index: target.index,
            address: target.address.clone(),
            status: RecordStatus::Ok,
            fields,
            attempt_count,
            timestamp,
            error_detail: None,
            pass,
            cost: 0.0,
        }
    }

    pub fn unresolved(
        target: &Target,
        pass: Pass,
        reason: FailureReason,
        attempt_count: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            index: target.index,
            address: target.address.clone(),
            status: reason.status(),
            fields: Fields::new(),
            attempt_count,
            timestamp,
            error_detail: Some(reason),
            pass,
            cost: 0.0,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == RecordStatus::Ok
    }

    pub fn target(&self) -> Target {
        Target::new(self.index, self.address.clone())
    }
}

/// Final reconciled record for one index across all passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub index: u32,
    pub address: String,
    pub status: RecordStatus,
    #[serde(default)]
    pub fields: Fields,
    pub attempt_count: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<FailureReason>,
    pub source_pass: Pass,
    pub cost_total: f64,
}

impl MergedRecord {
    pub fn from_record(record: &TargetRecord, cost_total: f64) -> Self {
        Self {
            index: record.index,
            address: record.address.clone(),
            status: record.status,
            fields: record.fields.clone(),
            attempt_count: record.attempt_count,
            timestamp: record.timestamp,
            error_detail: record.error_detail,
            source_pass: record.pass,
            cost_total,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RecordStatus::Ok
    }
}
