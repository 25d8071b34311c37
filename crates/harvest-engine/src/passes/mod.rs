//! The three passes over the target queue.
//!
//! Pass 1 runs concurrent sessions over every target. Pass 2 and Pass 3 run
//! one target at a time over whatever is still unresolved.

pub mod deep;
pub mod rescue;
pub mod sessions;

pub use deep::{DeepRescuePass, Strategy};
pub use rescue::RescuePass;
pub use sessions::SessionScheduler;

use harvest_common::{Target, TargetRecord};
use std::collections::HashSet;

/// Targets with no `OK` record in any of the `prior` passes, in queue order.
pub fn unresolved(targets: &[Target], prior: &[&[TargetRecord]]) -> Vec<Target> {
    let resolved: HashSet<u32> = prior
        .iter()
        .flat_map(|records| records.iter())
        .filter(|r| r.is_ok())
        .map(|r| r.index)
        .collect();

    targets
        .iter()
        .filter(|t| !resolved.contains(&t.index))
        .cloned()
        .collect()
}
