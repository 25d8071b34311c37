pub mod effort;
pub mod error;
pub mod error_mapping;
pub mod outcome;
pub mod record;
pub mod target;

pub use effort::{EffortConfig, Tier};
pub use error::FetchError;
pub use outcome::{AttemptOutcome, CostToken, Fields, OutcomeStatus, TransportKind};
pub use record::{FailureReason, MergedRecord, Pass, RecordStatus, TargetRecord};
pub use target::Target;
