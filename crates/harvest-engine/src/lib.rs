pub mod backend;
pub mod config;
pub mod escalation;
pub mod executor;
pub mod extract;
pub mod merge;
pub mod pacing;
pub mod passes;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod store;

pub use harvest_common::error_mapping;
pub use harvest_common::{
    AttemptOutcome, CostToken, EffortConfig, FailureReason, FetchError, Fields, MergedRecord,
    OutcomeStatus, Pass, RecordStatus, Target, TargetRecord, Tier, TransportKind,
};
