//! Sequential Rescue Pass (Pass 2).
//!
//! One heavy attempt per target, one target at a time, a fixed gap between
//! targets, and a single sticky session for the whole pass.

use crate::escalation::{EscalationController, EscalationPolicy};
use crate::executor::AttemptExecutor;
use crate::pacing::{self, Pacer, Pause};
use crate::progress::ProgressCounter;
use harvest_common::{EffortConfig, Pass, Target, TargetRecord};
use tracing::info;
use uuid::Uuid;

/// Attempt number recorded for rescue attempts: the target already went
/// through inline escalation once.
pub const RESCUE_ATTEMPT: u32 = 3;

pub struct RescuePass<'a> {
    executor: &'a AttemptExecutor,
    pacer: &'a dyn Pacer,
    policy: EscalationPolicy,
}

impl<'a> RescuePass<'a> {
    pub fn new(executor: &'a AttemptExecutor, pacer: &'a dyn Pacer, heavy: EffortConfig) -> Self {
        Self {
            executor,
            pacer,
            policy: EscalationPolicy::single_shot(heavy, RESCUE_ATTEMPT),
        }
    }

    pub async fn run(&self, targets: &[Target]) -> Vec<TargetRecord> {
        if targets.is_empty() {
            return Vec::new();
        }

        let session_id = format!("RESCUE-{}", Uuid::new_v4().simple());
        info!("Pass 2: retrying {} target(s) sequentially", targets.len());

        let controller = EscalationController::new(self.executor, self.pacer);
        let progress = ProgressCounter::new("pass 2", targets.len());
        let mut records = Vec::with_capacity(targets.len());
        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                pacing::pause(self.pacer, Pause::RescueGap).await;
            }
            let record = controller
                .resolve(target, &self.policy, Some(&session_id), Pass::Rescue)
                .await;
            progress.item_done(&target.address);
            records.push(record);
        }
        records
    }
}
