//! Escalation Controller.
//!
//! Per-target state machine that owns all retry policy:
//!
//! ```text
//! Pending -> Attempting(first) -> Attempting(n + 1) -> ... -> Resolved(..)
//! ```
//!
//! `Incomplete` and transient transport errors move to the next attempt while
//! `n < max`; `Success` and `Blocked` resolve immediately; a permanent transport
//! error or an exhausted cap resolves to `Error` with the last failure reason.

use crate::executor::AttemptExecutor;
use crate::pacing::{self, Pacer, Pause};
use harvest_common::{
    AttemptOutcome, EffortConfig, FailureReason, OutcomeStatus, Pass, Target, TargetRecord,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Success,
    Blocked,
    Error(FailureReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    Pending,
    Attempting(u32),
    Resolved(Resolution),
}

impl EscalationState {
    pub fn start(self, first_attempt: u32) -> Self {
        match self {
            EscalationState::Pending => EscalationState::Attempting(first_attempt.max(1)),
            other => other,
        }
    }

    /// Advance after observing the outcome of the current attempt.
    pub fn advance(self, status: &OutcomeStatus, max_attempts: u32) -> Self {
        let EscalationState::Attempting(n) = self else {
            return self;
        };

        let retry_or = |reason: FailureReason| {
            if n < max_attempts {
                EscalationState::Attempting(n + 1)
            } else {
                EscalationState::Resolved(Resolution::Error(reason))
            }
        };

        match status {
            OutcomeStatus::Success => EscalationState::Resolved(Resolution::Success),
            OutcomeStatus::Blocked => EscalationState::Resolved(Resolution::Blocked),
            OutcomeStatus::Incomplete => retry_or(FailureReason::Incomplete),
            OutcomeStatus::TransportError(kind) if kind.is_transient() => {
                retry_or(FailureReason::Transport(*kind))
            }
            OutcomeStatus::TransportError(kind) => {
                EscalationState::Resolved(Resolution::Error(FailureReason::Transport(*kind)))
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, EscalationState::Resolved(_))
    }
}

/// Which efforts to use for which attempt numbers.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    ladder: Vec<EffortConfig>,
    first_attempt: u32,
    max_attempts: u32,
}

impl EscalationPolicy {
    /// Inline escalation from attempt 1 up to `max_attempts`, walking `ladder`.
    /// Attempts past the end of the ladder reuse its last tier.
    pub fn inline(ladder: Vec<EffortConfig>, max_attempts: u32) -> Self {
        Self {
            ladder,
            first_attempt: 1,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Exactly one attempt, recorded as attempt number `attempt`.
    pub fn single_shot(effort: EffortConfig, attempt: u32) -> Self {
        let attempt = attempt.max(1);
        Self {
            ladder: vec![effort],
            first_attempt: attempt,
            max_attempts: attempt,
        }
    }

    pub fn first_attempt(&self) -> u32 {
        self.first_attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn effort_for(&self, attempt: u32) -> Option<&EffortConfig> {
        let offset = attempt.saturating_sub(self.first_attempt) as usize;
        self.ladder
            .get(offset)
            .or_else(|| self.ladder.last())
    }
}

pub struct EscalationController<'a> {
    executor: &'a AttemptExecutor,
    pacer: &'a dyn Pacer,
}

impl<'a> EscalationController<'a> {
    pub fn new(executor: &'a AttemptExecutor, pacer: &'a dyn Pacer) -> Self {
        Self { executor, pacer }
    }

    /// Drive `target` to a terminal state and produce its record for `pass`.
    ///
    /// `session` is attached to every attempt so the fetch service can reuse a
    /// warmed identity.
    pub async fn resolve(
        &self,
        target: &Target,
        policy: &EscalationPolicy,
        session: Option<&str>,
        pass: Pass,
    ) -> TargetRecord {
        let mut n = policy.first_attempt().max(1);
        let mut state = EscalationState::Pending.start(n);
        let mut cost = 0.0;

        loop {
            let Some(effort) = policy.effort_for(n) else {
                warn!("#{} has no effort configured for attempt {}", target.index, n);
                return TargetRecord::unresolved(
                    target,
                    pass,
                    FailureReason::Incomplete,
                    n.saturating_sub(1),
                    chrono::Utc::now(),
                );
            };
            let mut effort = effort.clone();
            if let Some(session) = session {
                effort.session = Some(session.to_string());
            }

            let outcome = self.executor.execute(target, &effort).await;
            cost += outcome.cost.credits();

            match state.advance(&outcome.status, policy.max_attempts()) {
                EscalationState::Resolved(resolution) => {
                    return Self::record(target, pass, resolution, outcome, n).with_cost(cost);
                }
                next => {
                    debug!(
                        "#{} attempt {}/{} ({}) gave {:?}; escalating",
                        target.index,
                        n,
                        policy.max_attempts(),
                        effort.tier,
                        outcome.status
                    );
                    pacing::pause(self.pacer, Pause::Backoff { attempt: n }).await;
                    if let EscalationState::Attempting(next_attempt) = next {
                        n = next_attempt;
                    }
                    state = next;
                }
            }
        }
    }

    fn record(
        target: &Target,
        pass: Pass,
        resolution: Resolution,
        outcome: AttemptOutcome,
        attempts: u32,
    ) -> TargetRecord {
        match resolution {
            Resolution::Success => {
                TargetRecord::ok(target, pass, outcome.fields, attempts, outcome.timestamp)
            }
            Resolution::Blocked => TargetRecord::unresolved(
                target,
                pass,
                FailureReason::Blocked,
                attempts,
                outcome.timestamp,
            ),
            Resolution::Error(reason) => {
                warn!(
                    "#{} gave up after {} attempt(s) in {}: {}",
                    target.index, attempts, pass, reason
                );
                TargetRecord::unresolved(target, pass, reason, attempts, outcome.timestamp)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_common::{Tier, TransportKind};
    use std::time::Duration;

    #[test]
    fn test_success_and_blocked_are_terminal() {
        let s = EscalationState::Pending.start(1);
        assert_eq!(
            s.advance(&OutcomeStatus::Success, 3),
            EscalationState::Resolved(Resolution::Success)
        );
        assert_eq!(
            s.advance(&OutcomeStatus::Blocked, 3),
            EscalationState::Resolved(Resolution::Blocked)
        );
    }

    #[test]
    fn test_incomplete_retries_until_cap() {
        let s = EscalationState::Attempting(2);
        assert_eq!(
            s.advance(&OutcomeStatus::Incomplete, 3),
            EscalationState::Attempting(3)
        );
        assert_eq!(
            EscalationState::Attempting(3).advance(&OutcomeStatus::Incomplete, 3),
            EscalationState::Resolved(Resolution::Error(FailureReason::Incomplete))
        );
    }

    #[test]
    fn test_transient_vs_permanent_transport_errors() {
        let s = EscalationState::Attempting(1);
        assert_eq!(
            s.advance(&OutcomeStatus::TransportError(TransportKind::Proxy), 3),
            EscalationState::Attempting(2)
        );
        assert_eq!(
            s.advance(&OutcomeStatus::TransportError(TransportKind::Unknown), 3),
            EscalationState::Resolved(Resolution::Error(FailureReason::Transport(
                TransportKind::Unknown
            )))
        );
    }

    #[test]
    fn test_resolved_state_does_not_move() {
        let s = EscalationState::Resolved(Resolution::Blocked);
        assert_eq!(s.advance(&OutcomeStatus::Success, 3), s);
        assert_eq!(s.start(1), s);
        assert!(s.is_resolved());
    }

    #[test]
    fn test_policy_effort_lookup() {
        let ladder = vec![
            EffortConfig::new(Tier::Plain, Duration::from_secs(1)),
            EffortConfig::new(Tier::Patient, Duration::from_secs(2)),
        ];
        let policy = EscalationPolicy::inline(ladder, 3);
        assert_eq!(policy.effort_for(1).map(|e| e.tier), Some(Tier::Plain));
        assert_eq!(policy.effort_for(2).map(|e| e.tier), Some(Tier::Patient));
        assert_eq!(policy.effort_for(3).map(|e| e.tier), Some(Tier::Patient));

        let shot =
            EscalationPolicy::single_shot(EffortConfig::new(Tier::Heavy, Duration::from_secs(3)), 3);
        assert_eq!(shot.first_attempt(), 3);
        assert_eq!(shot.max_attempts(), 3);
        assert_eq!(shot.effort_for(3).map(|e| e.tier), Some(Tier::Heavy));
    }
}
