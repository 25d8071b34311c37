//! Attempt Executor: one fetch, one classified outcome.
//!
//! The executor is policy-free. It never retries and never sleeps; the
//! escalation controller decides what happens next.

use crate::backend::{FetchBackend, FetchRequest, FetchResponse};
use crate::extract::Extractor;
use harvest_common::error_mapping::hint_for_kind;
use harvest_common::{AttemptOutcome, EffortConfig, Fields, OutcomeStatus, Target};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct AttemptExecutor {
    backend: Arc<dyn FetchBackend>,
    extractor: Arc<dyn Extractor>,
    blocked_markers: Vec<String>,
}

impl AttemptExecutor {
    pub fn new(backend: Arc<dyn FetchBackend>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            backend,
            extractor,
            blocked_markers: Vec::new(),
        }
    }

    pub fn with_blocked_markers(mut self, markers: Vec<String>) -> Self {
        self.blocked_markers = markers.into_iter().filter(|m| !m.is_empty()).collect();
        self
    }

    pub fn backend(&self) -> &dyn FetchBackend {
        self.backend.as_ref()
    }

    /// Issue one fetch attempt for `target` with `effort`.
    pub async fn execute(&self, target: &Target, effort: &EffortConfig) -> AttemptOutcome {
        let request = FetchRequest::new(target.address.clone(), effort.clone());
        debug!(
            "#{} fetching {} (tier={}, session={:?})",
            target.index, target.address, effort.tier, effort.session
        );

        match self.backend.fetch(&request).await {
            Ok(response) => self.classify(target, response),
            Err(failure) => {
                let kind = failure.error.kind();
                warn!(
                    "#{} transport error ({}) on {}: {}. {}",
                    target.index,
                    kind,
                    target.address,
                    failure.error,
                    hint_for_kind(kind)
                );
                AttemptOutcome::transport_error(kind, failure.cost)
            }
        }
    }

    /// Classify fetched content. Blocked markers take precedence over extraction.
    pub fn classify(&self, target: &Target, response: FetchResponse) -> AttemptOutcome {
        if let Some(marker) = self
            .blocked_markers
            .iter()
            .find(|m| response.content.contains(m.as_str()))
        {
            warn!(
                "#{} blocked/unavailable ({:?}): {}",
                target.index, marker, target.address
            );
            return AttemptOutcome::new(OutcomeStatus::Blocked, Fields::new(), response.cost);
        }

        let extraction = self.extractor.extract(&response.content);
        if extraction.primary_present {
            info!("#{} success: {}", target.index, target.address);
            AttemptOutcome::new(OutcomeStatus::Success, extraction.fields, response.cost)
        } else {
            error!(
                "#{} primary field missing (upstream status {}): {}",
                target.index, response.status, target.address
            );
            AttemptOutcome::new(OutcomeStatus::Incomplete, extraction.fields, response.cost)
        }
    }
}
