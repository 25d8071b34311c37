mod common;

use async_trait::async_trait;
use common::*;
use harvest_engine::backend::{FetchBackend, FetchFailure, FetchRequest, FetchResponse};
use harvest_engine::escalation::EscalationPolicy;
use harvest_engine::pacing::NoDelay;
use harvest_engine::passes::{DeepRescuePass, RescuePass, SessionScheduler};
use harvest_engine::{Pass, RecordStatus, Tier};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const WARMUP: &str = "https://warm.example/";

fn deep_pass<'a>(
    executor: &'a harvest_engine::executor::AttemptExecutor,
) -> DeepRescuePass<'a> {
    let tiers = tiers();
    DeepRescuePass::new(
        executor,
        &NoDelay,
        tiers.effort(Tier::Deep),
        "h1.ui-pdp-title",
        Duration::from_secs(30),
        tiers.effort(Tier::Warmup),
        WARMUP,
    )
}

#[tokio::test]
async fn test_sessions_cover_every_target_once() {
    let targets = targets(7);
    let backend = Arc::new(targets.iter().fold(MockBackend::new(), |mock, t| {
        mock.script(&t.address, vec![ok(product_page("Producto", "1"), "1")])
    }));
    let executor = executor(backend.clone());
    let policy = EscalationPolicy::inline(tiers().ladder(), 3);

    let records = SessionScheduler::new(&executor, &NoDelay, &policy, 3, 2)
        .run(&targets)
        .await;

    let mut indices: Vec<u32> = records.iter().map(|r| r.index).collect();
    indices.sort();
    assert_eq!(indices, (1..=7).collect::<Vec<_>>());
    assert!(records.iter().all(|r| r.pass == Pass::Sessions && r.is_ok()));
}

#[tokio::test]
async fn test_session_ids_shared_within_and_distinct_across_sessions() {
    let targets = targets(4);
    let backend = Arc::new(MockBackend::new());
    let executor = executor(backend.clone());
    let policy = EscalationPolicy::inline(tiers().ladder(), 3);

    SessionScheduler::new(&executor, &NoDelay, &policy, 2, 2)
        .run(&targets)
        .await;

    let session_of = |i: u32| -> HashSet<Option<String>> {
        backend
            .seen_for(&address(i))
            .into_iter()
            .map(|s| s.session)
            .collect()
    };
    for i in 1..=4 {
        assert_eq!(session_of(i).len(), 1, "target {i} switched sessions");
    }
    assert_eq!(session_of(1), session_of(2));
    assert_eq!(session_of(3), session_of(4));
    assert_ne!(session_of(1), session_of(3));

    let ids: Vec<String> = backend.seen().into_iter().filter_map(|s| s.session).collect();
    assert!(ids.iter().all(|id| id.starts_with('S')));
}

#[tokio::test]
async fn test_targets_run_in_order_inside_a_session() {
    let targets = targets(3);
    let backend = Arc::new(
        MockBackend::new()
            .script(&address(1), vec![ok(product_page("Uno", "1"), "1")])
            .script(&address(2), vec![ok(product_page("Dos", "2"), "1")])
            .script(&address(3), vec![ok(product_page("Tres", "3"), "1")]),
    );
    let executor = executor(backend.clone());
    let policy = EscalationPolicy::inline(tiers().ladder(), 3);

    let records = SessionScheduler::new(&executor, &NoDelay, &policy, 10, 5)
        .run(&targets)
        .await;

    let order: Vec<String> = backend.seen().into_iter().map(|s| s.address).collect();
    assert_eq!(order, vec![address(1), address(2), address(3)]);
    assert_eq!(
        records.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

/// Backend that holds each request for a moment and tracks how many are in flight.
#[derive(Default)]
struct GaugeBackend {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl FetchBackend for GaugeBackend {
    async fn fetch(&self, _request: &FetchRequest) -> Result<FetchResponse, FetchFailure> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(FetchResponse {
            content: product_page("Ok", "1"),
            status: 200,
            cost: harvest_engine::CostToken::none(),
        })
    }
}

#[tokio::test]
async fn test_concurrent_sessions_are_capped() {
    let backend = Arc::new(GaugeBackend::default());
    let config = harvest_engine::config::ExtractionConfig::default();
    let extractor = harvest_engine::extract::PatternExtractor::from_config(&config).unwrap();
    let executor =
        harvest_engine::executor::AttemptExecutor::new(backend.clone(), Arc::new(extractor));
    let policy = EscalationPolicy::inline(tiers().ladder(), 3);

    let records = SessionScheduler::new(&executor, &NoDelay, &policy, 2, 3)
        .run(&targets(12))
        .await;

    assert_eq!(records.len(), 12);
    assert_eq!(backend.peak.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rescue_pass_single_heavy_attempt_per_target() {
    let targets = targets(3);
    let backend = Arc::new(
        MockBackend::new()
            .script(&address(1), vec![ok(product_page("Rescatado", "5"), "4")])
            .script(&address(2), vec![ok(BLOCKED_PAGE, "1")]),
    );
    let executor = executor(backend.clone());

    let records = RescuePass::new(&executor, &NoDelay, tiers().effort(Tier::Heavy))
        .run(&targets)
        .await;

    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.attempt_count == 3 && r.pass == Pass::Rescue));
    assert_eq!(records[0].status, RecordStatus::Ok);
    assert_eq!(records[0].cost, 4.0);
    assert_eq!(records[1].status, RecordStatus::Failed);
    assert_eq!(records[2].status, RecordStatus::Error);

    let seen = backend.seen();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|s| s.tier == Tier::Heavy));
    let sessions: HashSet<Option<String>> = seen.into_iter().map(|s| s.session).collect();
    assert_eq!(sessions.len(), 1);
    let session = sessions.into_iter().next().flatten().unwrap();
    assert!(session.starts_with("RESCUE-"));
}

#[tokio::test]
async fn test_rescue_pass_with_nothing_to_do() {
    let backend = Arc::new(MockBackend::new());
    let executor = executor(backend.clone());
    let records = RescuePass::new(&executor, &NoDelay, tiers().effort(Tier::Heavy))
        .run(&[])
        .await;
    assert!(records.is_empty());
    assert!(backend.seen().is_empty());
}

#[tokio::test]
async fn test_deep_branch_a_success_skips_branch_b() {
    let targets = targets(1);
    let backend = Arc::new(
        MockBackend::new().script(&address(1), vec![ok(product_page("Profundo", "9"), "10")]),
    );
    let executor = executor(backend.clone());

    let records = deep_pass(&executor).run(&targets).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Ok);
    assert_eq!(records[0].attempt_count, 1);
    assert_eq!(records[0].pass, Pass::Deep);
    // Warm-up page costs 1, the target fetch 10.
    assert_eq!(records[0].cost, 11.0);

    let target_calls = backend.seen_for(&address(1));
    assert_eq!(target_calls.len(), 1);
    assert_eq!(target_calls[0].tier, Tier::Deep);
    assert!(target_calls[0].selector.is_some());

    let warmups = backend.seen_for(WARMUP);
    assert_eq!(warmups.len(), 1);
    assert_eq!(warmups[0].tier, Tier::Warmup);
    assert_eq!(warmups[0].session, target_calls[0].session);
}

#[tokio::test]
async fn test_deep_runs_branch_b_after_branch_a_fails() {
    let targets = targets(1);
    let backend = Arc::new(MockBackend::new().script(
        &address(1),
        vec![ok(empty_page(), "1"), ok(product_page("Segundo", "3"), "1")],
    ));
    let executor = executor(backend.clone());

    let records = deep_pass(&executor).run(&targets).await;

    assert_eq!(records[0].status, RecordStatus::Ok);
    assert_eq!(records[0].attempt_count, 2);

    let calls = backend.seen_for(&address(1));
    assert_eq!(calls.len(), 2);
    assert!(calls[0].selector.is_some());
    assert!(calls[1].selector.is_none());
    assert_ne!(calls[0].session, calls[1].session);
    assert!(
        calls
            .iter()
            .all(|c| c.session.as_deref().is_some_and(|s| s.starts_with("DEEP-")))
    );
    assert_eq!(backend.seen_for(WARMUP).len(), 2);
}

#[tokio::test]
async fn test_failed_warm_up_is_ignored() {
    let targets = targets(1);
    let backend = Arc::new(
        MockBackend::new()
            .script(WARMUP, vec![service_error("ERR::PROXY::POOL_UNAVAILABLE")])
            .script(&address(1), vec![ok(product_page("Igual", "1"), "2")]),
    );
    let executor = executor(backend);

    let records = deep_pass(&executor).run(&targets).await;
    assert_eq!(records[0].status, RecordStatus::Ok);
    assert_eq!(records[0].cost, 2.0);
}

#[tokio::test]
async fn test_deep_keeps_branch_b_failure() {
    let targets = targets(1);
    let backend = Arc::new(MockBackend::new().script(
        &address(1),
        vec![ok(empty_page(), "1"), service_error("ERR::SCRAPE::DRIVER_CRASHED")],
    ));
    let executor = executor(backend);

    let records = deep_pass(&executor).run(&targets).await;
    assert_eq!(records[0].status, RecordStatus::Error);
    assert_eq!(records[0].attempt_count, 2);
    assert_eq!(
        records[0].error_detail.map(|d| d.as_str()),
        Some("driver")
    );
}
