//! Session Scheduler (Pass 1).
//!
//! The queue is cut into contiguous sessions of `session_size` targets. Up to
//! `max_concurrent` sessions run at once; inside a session targets run strictly
//! one after another under a single session-affinity id, each preceded by a
//! think-time pause.

use crate::escalation::{EscalationController, EscalationPolicy};
use crate::executor::AttemptExecutor;
use crate::pacing::{self, Pacer, Pause};
use crate::progress::ProgressCounter;
use futures::stream::{self, StreamExt};
use harvest_common::{Pass, Target, TargetRecord};
use tracing::{debug, info};
use uuid::Uuid;

pub struct SessionScheduler<'a> {
    executor: &'a AttemptExecutor,
    pacer: &'a dyn Pacer,
    policy: &'a EscalationPolicy,
    session_size: usize,
    max_concurrent: usize,
}

impl<'a> SessionScheduler<'a> {
    pub fn new(
        executor: &'a AttemptExecutor,
        pacer: &'a dyn Pacer,
        policy: &'a EscalationPolicy,
        session_size: usize,
        max_concurrent: usize,
    ) -> Self {
        Self {
            executor,
            pacer,
            policy,
            session_size: session_size.max(1),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Runs every target once. Records come back in session completion order.
    pub async fn run(&self, targets: &[Target]) -> Vec<TargetRecord> {
        let sessions: Vec<&[Target]> = targets.chunks(self.session_size).collect();
        info!(
            "Pass 1: {} target(s) in {} session(s), {} at a time",
            targets.len(),
            sessions.len(),
            self.max_concurrent
        );

        let progress = ProgressCounter::new("pass 1", targets.len());
        let per_session: Vec<Vec<TargetRecord>> = stream::iter(sessions.into_iter().enumerate())
            .map(|(n, chunk)| self.run_session(n + 1, chunk, &progress))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        per_session.into_iter().flatten().collect()
    }

    async fn run_session(
        &self,
        number: usize,
        targets: &[Target],
        progress: &ProgressCounter,
    ) -> Vec<TargetRecord> {
        let session_id = format!("S{}-{}", number, Uuid::new_v4().simple());
        debug!("session {} started with {} target(s)", session_id, targets.len());

        let controller = EscalationController::new(self.executor, self.pacer);
        let mut records = Vec::with_capacity(targets.len());
        for target in targets {
            pacing::pause(self.pacer, Pause::ThinkTime).await;
            let record = controller
                .resolve(target, self.policy, Some(&session_id), Pass::Sessions)
                .await;
            progress.item_done(&target.address);
            records.push(record);
        }

        debug!("session {} finished", session_id);
        records
    }
}
