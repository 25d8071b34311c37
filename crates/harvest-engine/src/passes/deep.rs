//! Deep Rescue Pass (Pass 3).
//!
//! Two strategy branches per target, each preceded by a best-effort warm-up
//! fetch of a neutral page under a fresh session id. Branch B only runs when
//! branch A did not produce `OK`, and then its record is the one kept.

use crate::backend::FetchRequest;
use crate::escalation::{EscalationController, EscalationPolicy};
use crate::executor::AttemptExecutor;
use crate::pacing::{self, Pacer, Pause};
use crate::progress::ProgressCounter;
use harvest_common::{EffortConfig, Pass, Target, TargetRecord};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Highest tier, waiting for the expected selector.
    SelectorWait,
    /// Highest tier, no selector requirement, longer fixed render wait.
    FallbackWait,
}

impl Strategy {
    pub fn requires_selector(&self) -> bool {
        matches!(self, Strategy::SelectorWait)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::SelectorWait => "A/selector-wait",
            Strategy::FallbackWait => "B/fallback-wait",
        }
    }

    /// Effort for this branch. The selector-wait branch always carries a
    /// selector: the deep tier's own, else `selector`.
    pub fn effort(
        &self,
        deep: &EffortConfig,
        selector: &str,
        fallback_wait: Duration,
    ) -> EffortConfig {
        if self.requires_selector() {
            let selector = deep
                .wait_for_selector
                .clone()
                .unwrap_or_else(|| selector.to_string());
            deep.clone().with_selector(Some(selector))
        } else {
            deep.clone()
                .without_selector()
                .with_render_wait(fallback_wait.max(deep.render_wait))
        }
    }
}

pub struct DeepRescuePass<'a> {
    executor: &'a AttemptExecutor,
    pacer: &'a dyn Pacer,
    deep: EffortConfig,
    selector: String,
    fallback_wait: Duration,
    warmup: EffortConfig,
    warmup_address: String,
}

impl<'a> DeepRescuePass<'a> {
    pub fn new(
        executor: &'a AttemptExecutor,
        pacer: &'a dyn Pacer,
        deep: EffortConfig,
        selector: impl Into<String>,
        fallback_wait: Duration,
        warmup: EffortConfig,
        warmup_address: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            pacer,
            deep,
            selector: selector.into(),
            fallback_wait,
            warmup,
            warmup_address: warmup_address.into(),
        }
    }

    pub async fn run(&self, targets: &[Target]) -> Vec<TargetRecord> {
        if targets.is_empty() {
            return Vec::new();
        }

        info!("Pass 3: deep rescue of {} target(s)", targets.len());
        let progress = ProgressCounter::new("pass 3", targets.len());
        let mut records = Vec::with_capacity(targets.len());
        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                pacing::pause(self.pacer, Pause::DeepGap).await;
            }
            records.push(self.rescue(target).await);
            progress.item_done(&target.address);
        }
        records
    }

    async fn rescue(&self, target: &Target) -> TargetRecord {
        let (first, first_cost) = self.run_branch(target, Strategy::SelectorWait).await;
        if first.is_ok() {
            return Self::finish(first, 1, first_cost);
        }

        pacing::pause(self.pacer, Pause::DeepGap).await;
        let (second, second_cost) = self.run_branch(target, Strategy::FallbackWait).await;
        Self::finish(second, 2, first_cost + second_cost)
    }

    async fn run_branch(&self, target: &Target, strategy: Strategy) -> (TargetRecord, f64) {
        let session_id = format!("DEEP-{}", Uuid::new_v4().simple());
        let warmup_cost = self.warm_up(&session_id).await;

        let effort = strategy.effort(&self.deep, &self.selector, self.fallback_wait);
        let policy = EscalationPolicy::single_shot(effort, 1);
        let controller = EscalationController::new(self.executor, self.pacer);
        let record = controller
            .resolve(target, &policy, Some(&session_id), Pass::Deep)
            .await;
        debug!(
            "#{} branch {} -> {}",
            target.index,
            strategy.label(),
            record.status
        );

        let cost = warmup_cost + record.cost;
        (record, cost)
    }

    /// Best-effort: a failed warm-up is logged and ignored.
    async fn warm_up(&self, session_id: &str) -> f64 {
        let request = FetchRequest::new(
            self.warmup_address.clone(),
            self.warmup.clone().with_session(session_id),
        );
        match self.executor.backend().fetch(&request).await {
            Ok(response) => response.cost.credits(),
            Err(failure) => {
                debug!("warm-up for {} failed (ignored): {}", session_id, failure);
                failure.cost.credits()
            }
        }
    }

    fn finish(record: TargetRecord, branches: u32, cost: f64) -> TargetRecord {
        TargetRecord {
            attempt_count: branches,
            ..record
        }
        .with_cost(cost)
    }
}
