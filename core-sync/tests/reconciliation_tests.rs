//! Classification properties over realistic mixed scans.

mod common;

use chrono::Duration;
use common::{media_item, remote_file};
use core_sync::{
    index, reconcile, ConflictDecision, ItemDescriptor, MatchOutcome, Reconciliation,
};
use std::collections::HashMap;

fn left_scan() -> Vec<ItemDescriptor> {
    [
        ("d1", "IMG_0001.jpg", Some("2024-03-01T08:00:00Z")),
        ("d2", "img_0002.JPG", Some("2024-03-01T09:00:00Z")),
        ("d3", "holiday.mp4", None),
        ("d4", "dup.jpg", Some("2024-03-02T00:00:00Z")),
        ("d5", "DUP.jpg", Some("2024-03-02T01:00:00Z")),
        ("d6", "only-left.png", Some("2024-03-05T00:00:00Z")),
        ("d7", "late.jpg", Some("2024-03-01T00:00:00Z")),
    ]
    .iter()
    .map(|(id, name, created)| ItemDescriptor::from_remote_file(&remote_file(id, name, *created)))
    .collect()
}

fn right_scan() -> Vec<ItemDescriptor> {
    [
        ("p1", "img_0001.jpg", Some("2024-03-01T20:00:00Z")),
        ("p2", "IMG_0002.jpg", Some("2024-03-01T09:30:00Z")),
        ("p3", "holiday.mp4", Some("2024-03-01T09:30:00Z")),
        ("p4", "dup.jpg", Some("2024-03-02T00:30:00Z")),
        ("p5", "only-right.heic", None),
        ("p6", "late.jpg", Some("2024-03-04T00:00:00Z")),
        ("p7", "only-right.heic", Some("2024-03-06T00:00:00Z")),
    ]
    .iter()
    .map(|(id, name, created)| ItemDescriptor::from_media_item(&media_item(id, name, *created)))
    .collect()
}

fn run() -> Reconciliation {
    reconcile(&index(left_scan()), &index(right_scan()), Duration::hours(24))
}

/// How many outcomes reference each item id
fn appearances(reconciliation: &Reconciliation) -> HashMap<String, usize> {
    let mut seen = HashMap::new();
    for outcome in reconciliation.outcomes() {
        let ids: Vec<&str> = match outcome {
            MatchOutcome::Matched { left, right } | MatchOutcome::Conflict { left, right } => {
                vec![left.id.as_str(), right.id.as_str()]
            }
            MatchOutcome::LeftOnly { left } => vec![left.id.as_str()],
            MatchOutcome::RightOnly { right } => vec![right.id.as_str()],
        };
        for id in ids {
            *seen.entry(id.to_string()).or_insert(0) += 1;
        }
    }
    seen
}

#[test]
fn test_every_scanned_item_lands_in_exactly_one_category() {
    let reconciliation = run();
    let seen = appearances(&reconciliation);

    for item in left_scan().iter().chain(right_scan().iter()) {
        assert_eq!(seen.get(&item.id), Some(&1), "item {} not partitioned", item.id);
    }
    assert_eq!(seen.len(), left_scan().len() + right_scan().len());
}

#[test]
fn test_categories_of_mixed_scan() {
    let reconciliation = run();
    let counts = reconciliation.counts();

    // IMG_0001 (12h), IMG_0002 (30m), dup.jpg (DUP.jpg wins, 30m)
    assert_eq!(counts.matched, 3);
    // holiday.mp4 (unknown time), late.jpg (3 days)
    assert_eq!(counts.conflicts, 2);
    // only-left.png, shadowed dup.jpg
    assert_eq!(counts.left_only, 2);
    // both only-right.heic entries
    assert_eq!(counts.right_only, 2);

    let left_only: Vec<&str> = reconciliation.left_only().map(|i| i.id.as_str()).collect();
    assert_eq!(left_only, vec!["d6", "d4"]);
    let right_only: Vec<&str> = reconciliation.right_only().map(|i| i.id.as_str()).collect();
    assert_eq!(right_only, vec!["p5", "p7"]);
}

#[test]
fn test_folding_every_conflict_leaves_a_partition() {
    let mut reconciliation = run();
    let conflicts = reconciliation.take_conflicts();
    assert_eq!(conflicts.len(), 2);

    let mut decisions = [ConflictDecision::Same, ConflictDecision::Different].into_iter();
    for pair in conflicts {
        reconciliation.fold(pair, decisions.next().unwrap());
    }

    assert!(!reconciliation.has_conflicts());
    let counts = reconciliation.counts();
    assert_eq!(counts.matched, 4);
    assert_eq!(counts.left_only, 3);
    assert_eq!(counts.right_only, 3);
    assert!(appearances(&reconciliation).values().all(|n| *n == 1));

    let plan = reconciliation.transfer_plan();
    assert_eq!(plan.left_to_right.len(), 3);
    assert_eq!(plan.right_to_left.len(), 3);
}

#[test]
fn test_reconcile_is_repeatable() {
    assert_eq!(run(), run());
}
