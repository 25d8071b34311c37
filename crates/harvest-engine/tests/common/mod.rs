#![allow(dead_code)]

use async_trait::async_trait;
use harvest_engine::backend::{FetchBackend, FetchFailure, FetchRequest, FetchResponse};
use harvest_engine::config::{EffortTiers, ExtractionConfig};
use harvest_engine::executor::AttemptExecutor;
use harvest_engine::extract::PatternExtractor;
use harvest_engine::pacing::{Pacer, Pause};
use harvest_engine::{CostToken, FetchError, Target, Tier};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BLOCKED_PAGE: &str =
    "<html><p>Este producto no está disponible. Elige otra variante.</p></html>";

/// Page whose primary field is present.
pub fn product_page(title: &str, price: &str) -> String {
    format!(
        r#"<html><h1 class="ui-pdp-title">{title}</h1><span class="andes-money-amount__fraction">{price}</span></html>"#
    )
}

/// Page without the primary field.
pub fn empty_page() -> String {
    "<html><div>loading...</div></html>".to_string()
}

pub fn ok(content: impl Into<String>, cost: &str) -> Result<FetchResponse, FetchFailure> {
    Ok(FetchResponse {
        content: content.into(),
        status: 200,
        cost: CostToken::new(cost),
    })
}

pub fn service_error(code: &str) -> Result<FetchResponse, FetchFailure> {
    Err(FetchError::Service {
        code: code.to_string(),
        message: "scripted failure".to_string(),
    }
    .into())
}

/// Service error the service still billed for.
pub fn charged_error(code: &str, cost: &str) -> Result<FetchResponse, FetchFailure> {
    Err(FetchFailure::charged(
        FetchError::Service {
            code: code.to_string(),
            message: "scripted failure".to_string(),
        },
        CostToken::new(cost),
    ))
}

/// What the backend saw for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub address: String,
    pub tier: Tier,
    pub session: Option<String>,
    pub selector: Option<String>,
}

/// Backend answering from a per-address script. Unscripted calls get an
/// incomplete page.
#[derive(Default)]
pub struct MockBackend {
    scripts: Mutex<HashMap<String, VecDeque<Result<FetchResponse, FetchFailure>>>>,
    seen: Mutex<Vec<Seen>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(
        self,
        address: &str,
        responses: Vec<Result<FetchResponse, FetchFailure>>,
    ) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), responses.into());
        self
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_for(&self, address: &str) -> Vec<Seen> {
        self.seen()
            .into_iter()
            .filter(|s| s.address == address)
            .collect()
    }
}

#[async_trait]
impl FetchBackend for MockBackend {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchFailure> {
        self.seen.lock().unwrap().push(Seen {
            address: request.address.clone(),
            tier: request.effort.tier,
            session: request.effort.session.clone(),
            selector: request.effort.wait_for_selector.clone(),
        });
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.address)
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| ok(empty_page(), "1"))
    }

    async fn remaining_credits(&self) -> Result<u64, FetchError> {
        Ok(1000)
    }
}

pub fn executor(backend: Arc<MockBackend>) -> AttemptExecutor {
    let config = ExtractionConfig::default();
    let extractor = PatternExtractor::from_config(&config).unwrap();
    AttemptExecutor::new(backend, Arc::new(extractor))
        .with_blocked_markers(config.blocked_markers.clone())
}

pub fn tiers() -> EffortTiers {
    EffortTiers::default()
}

pub fn targets(n: u32) -> Vec<Target> {
    (1..=n).map(|i| Target::new(i, address(i))).collect()
}

pub fn address(i: u32) -> String {
    format!("https://shop.example/item/{i}")
}

/// Pacer that never sleeps and records every pause it was asked for.
#[derive(Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Pause>>,
}

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Pause> {
        self.pauses.lock().unwrap().clone()
    }
}

impl Pacer for RecordingPacer {
    fn delay(&self, pause: Pause) -> Duration {
        self.pauses.lock().unwrap().push(pause);
        Duration::ZERO
    }
}
