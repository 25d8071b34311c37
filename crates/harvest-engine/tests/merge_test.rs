use chrono::Utc;
use harvest_engine::merge::merge;
use harvest_engine::{
    FailureReason, Fields, Pass, RecordStatus, Target, TargetRecord, TransportKind,
};

fn target(i: u32) -> Target {
    Target::new(i, format!("https://shop.example/item/{i}"))
}

fn ok(i: u32, pass: Pass, title: &str, cost: f64) -> TargetRecord {
    let mut fields = Fields::new();
    fields.insert("title".into(), Some(title.into()));
    TargetRecord::ok(&target(i), pass, fields, 1, Utc::now()).with_cost(cost)
}

fn failed(i: u32, pass: Pass, reason: FailureReason, cost: f64) -> TargetRecord {
    TargetRecord::unresolved(&target(i), pass, reason, 3, Utc::now()).with_cost(cost)
}

#[test]
fn test_ok_beats_failure_from_any_pass() {
    let pass1 = vec![
        failed(1, Pass::Sessions, FailureReason::Blocked, 1.0),
        ok(2, Pass::Sessions, "early", 1.0),
    ];
    let pass2 = vec![ok(1, Pass::Rescue, "rescued", 5.0)];
    let pass3 = vec![failed(2, Pass::Deep, FailureReason::Incomplete, 9.0)];

    let merged = merge(&pass1, &pass2, &pass3, 2);

    assert_eq!(merged.records.len(), 2);
    assert_eq!(merged.records[0].status, RecordStatus::Ok);
    assert_eq!(merged.records[0].source_pass, Pass::Rescue);
    assert_eq!(merged.records[0].fields["title"].as_deref(), Some("rescued"));
    assert_eq!(merged.records[1].status, RecordStatus::Ok);
    assert_eq!(merged.records[1].source_pass, Pass::Sessions);
    assert!(merged.residual.is_empty());
}

#[test]
fn test_later_pass_wins_between_equals() {
    let pass1 = vec![
        ok(1, Pass::Sessions, "first", 1.0),
        failed(2, Pass::Sessions, FailureReason::Blocked, 1.0),
    ];
    let pass2 = vec![failed(2, Pass::Rescue, FailureReason::Incomplete, 1.0)];
    let pass3 = vec![
        ok(1, Pass::Deep, "last", 1.0),
        failed(2, Pass::Deep, FailureReason::Transport(TransportKind::Render), 1.0),
    ];

    let merged = merge(&pass1, &pass2, &pass3, 2);

    assert_eq!(merged.records[0].fields["title"].as_deref(), Some("last"));
    assert_eq!(merged.records[1].status, RecordStatus::Error);
    assert_eq!(
        merged.records[1].error_detail,
        Some(FailureReason::Transport(TransportKind::Render))
    );
    assert_eq!(merged.records[1].source_pass, Pass::Deep);
}

#[test]
fn test_records_ordered_by_index_and_residual_listed() {
    let pass1 = vec![
        failed(3, Pass::Sessions, FailureReason::Blocked, 1.0),
        ok(1, Pass::Sessions, "a", 1.0),
        failed(2, Pass::Sessions, FailureReason::Incomplete, 1.0),
    ];

    let merged = merge(&pass1, &[], &[], 3);

    let indices: Vec<u32> = merged.records.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    let residual: Vec<(u32, RecordStatus)> =
        merged.residual.iter().map(|r| (r.index, r.status)).collect();
    assert_eq!(
        residual,
        vec![(2, RecordStatus::Error), (3, RecordStatus::Failed)]
    );
    assert_eq!(merged.residual[1].error_detail, Some(FailureReason::Blocked));
    assert_eq!(merged.count(RecordStatus::Ok), 1);
}

#[test]
fn test_costs_are_summed_per_index() {
    let pass1 = vec![failed(1, Pass::Sessions, FailureReason::Incomplete, 3.0)];
    let pass2 = vec![failed(1, Pass::Rescue, FailureReason::Incomplete, 1.5)];
    let pass3 = vec![ok(1, Pass::Deep, "x", 2.0)];

    let merged = merge(&pass1, &pass2, &pass3, 1);
    assert_eq!(merged.records[0].cost_total, 6.5);
    assert_eq!(merged.total_cost(), 6.5);
}

#[test]
fn test_missing_and_out_of_range_indices() {
    let pass1 = vec![
        ok(1, Pass::Sessions, "a", 1.0),
        ok(9, Pass::Sessions, "stray", 1.0),
    ];

    let merged = merge(&pass1, &[], &[], 3);

    assert_eq!(merged.records.len(), 1);
    assert_eq!(merged.missing, vec![2, 3]);
}

#[test]
fn test_merge_is_idempotent() {
    let pass1 = vec![
        ok(1, Pass::Sessions, "a", 1.0),
        failed(2, Pass::Sessions, FailureReason::Blocked, 1.0),
    ];
    let pass2 = vec![failed(2, Pass::Rescue, FailureReason::Incomplete, 1.0)];

    let first = merge(&pass1, &pass2, &[], 2);
    let second = merge(&pass1, &pass2, &[], 2);
    assert_eq!(first, second);
}
