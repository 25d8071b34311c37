//! End-to-end run: Pass 1 -> Pass 2 -> Pass 3 -> merge.
//!
//! Passes never overlap. Each later pass receives only the targets that have no
//! `OK` record in any earlier pass.

use crate::backend::FetchBackend;
use crate::config::{ConfigError, HarvestConfig};
use crate::escalation::EscalationPolicy;
use crate::executor::AttemptExecutor;
use crate::extract::PatternExtractor;
use crate::merge::{self, MergeOutcome};
use crate::pacing::{JitterPacer, Pacer};
use crate::passes::{self, DeepRescuePass, RescuePass, SessionScheduler};
use crate::queue::TargetQueue;
use crate::store::{RecordStore, StoreError};
use harvest_common::{EffortConfig, RecordStatus, TargetRecord, Tier};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Scheduling and effort settings for the three passes.
#[derive(Debug, Clone)]
pub struct PassPlan {
    pub session_size: usize,
    pub max_concurrent_sessions: usize,
    pub max_attempts: u32,
    pub ladder: Vec<EffortConfig>,
    pub heavy: EffortConfig,
    pub deep: EffortConfig,
    pub deep_selector: String,
    pub fallback_wait: Duration,
    pub warmup: EffortConfig,
    pub warmup_address: String,
}

impl PassPlan {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            session_size: config.scheduler.session_size,
            max_concurrent_sessions: config.scheduler.max_concurrent_sessions,
            max_attempts: config.escalation.max_attempts,
            ladder: config.effort.ladder(),
            heavy: config.effort.effort(Tier::Heavy),
            deep: config.effort.effort(Tier::Deep),
            deep_selector: config.deep.selector.clone(),
            fallback_wait: Duration::from_millis(config.deep.fallback_wait_ms),
            warmup: config.effort.effort(Tier::Warmup),
            warmup_address: config.deep.warmup_address.clone(),
        }
    }
}

pub struct Pipeline {
    executor: AttemptExecutor,
    pacer: Arc<dyn Pacer>,
    plan: PassPlan,
}

impl Pipeline {
    pub fn new(executor: AttemptExecutor, pacer: Arc<dyn Pacer>, plan: PassPlan) -> Self {
        Self {
            executor,
            pacer,
            plan,
        }
    }

    /// Wires the regex extractor, blocked markers and jittered pacing from config.
    pub fn from_config(
        config: &HarvestConfig,
        backend: Arc<dyn FetchBackend>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let extractor = PatternExtractor::from_config(&config.extraction)?;
        let executor = AttemptExecutor::new(backend, Arc::new(extractor))
            .with_blocked_markers(config.extraction.blocked_markers.clone());
        let pacer = Arc::new(JitterPacer::new(config.pacing.clone()));
        Ok(Self::new(executor, pacer, PassPlan::from_config(config)))
    }

    pub fn executor(&self) -> &AttemptExecutor {
        &self.executor
    }

    /// Runs every pass and writes the artifacts to `store`.
    pub async fn run_to_store(
        &self,
        queue: &TargetQueue,
        store: &RecordStore,
        audit: bool,
    ) -> Result<PipelineReport, PipelineError> {
        let report = self.run(queue).await;
        store.save_report(&report, audit).await?;
        Ok(report)
    }

    pub async fn run(&self, queue: &TargetQueue) -> PipelineReport {
        let targets = queue.targets();
        let pacer = self.pacer.as_ref();

        let policy = EscalationPolicy::inline(self.plan.ladder.clone(), self.plan.max_attempts);
        let pass1 = SessionScheduler::new(
            &self.executor,
            pacer,
            &policy,
            self.plan.session_size,
            self.plan.max_concurrent_sessions,
        )
        .run(targets)
        .await;
        info!(
            "Pass 1 done: {}/{} OK",
            pass1.iter().filter(|r| r.is_ok()).count(),
            pass1.len()
        );

        let pending = passes::unresolved(targets, &[&pass1]);
        let pass2 = RescuePass::new(&self.executor, pacer, self.plan.heavy.clone())
            .run(&pending)
            .await;
        if !pending.is_empty() {
            info!(
                "Pass 2 done: rescued {}/{}",
                pass2.iter().filter(|r| r.is_ok()).count(),
                pending.len()
            );
        }

        let pending = passes::unresolved(targets, &[&pass1, &pass2]);
        let pass3 = DeepRescuePass::new(
            &self.executor,
            pacer,
            self.plan.deep.clone(),
            self.plan.deep_selector.clone(),
            self.plan.fallback_wait,
            self.plan.warmup.clone(),
            self.plan.warmup_address.clone(),
        )
        .run(&pending)
        .await;
        if !pending.is_empty() {
            info!(
                "Pass 3 done: rescued {}/{}",
                pass3.iter().filter(|r| r.is_ok()).count(),
                pending.len()
            );
        }

        let merged = merge::merge(&pass1, &pass2, &pass3, queue.total());
        PipelineReport {
            pass1,
            pass2,
            pass3,
            merged,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub pass1: Vec<TargetRecord>,
    pub pass2: Vec<TargetRecord>,
    pub pass3: Vec<TargetRecord>,
    pub merged: MergeOutcome,
}

impl PipelineReport {
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_merge(&self.merged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub ok: usize,
    pub failed: usize,
    pub error: usize,
    pub cost: f64,
}

impl RunSummary {
    pub fn from_merge(merged: &MergeOutcome) -> Self {
        Self {
            total: merged.records.len(),
            ok: merged.count(RecordStatus::Ok),
            failed: merged.count(RecordStatus::Failed),
            error: merged.count(RecordStatus::Error),
            cost: merged.total_cost(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} target(s): {} OK, {} failed, {} error, {} credit(s) spent",
            self.total, self.ok, self.failed, self.error, self.cost
        )
    }
}
