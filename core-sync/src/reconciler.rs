//! # Reconciler
//!
//! Classifies every scanned item into exactly one [`MatchOutcome`].
//!
//! ## Algorithm
//!
//! 1. For each left key (first-seen order): absent on the right gives
//!    `LeftOnly`; present with similar creation times gives `Matched`;
//!    anything else gives `Conflict`. The right key is consumed.
//! 2. Left items shadowed by a later same-named item give `LeftOnly`.
//! 3. Every right item that is not a consumed representative gives
//!    `RightOnly`, in scan order.
//!
//! Two timestamps are similar only when both are known and at most the
//! tolerance apart. Sizes never take part in matching.
//!
//! The result is one tagged outcome per item rather than four parallel
//! lists, so folding a conflict decision back in is a single match.

use crate::conflict_resolver::ConflictDecision;
use crate::descriptor::ItemDescriptor;
use crate::index::NameIndex;
use crate::transfer::TransferPlan;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Classification of one item (or one same-named pair)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched {
        left: ItemDescriptor,
        right: ItemDescriptor,
    },
    LeftOnly {
        left: ItemDescriptor,
    },
    RightOnly {
        right: ItemDescriptor,
    },
    Conflict {
        left: ItemDescriptor,
        right: ItemDescriptor,
    },
}

/// A same-named pair awaiting adjudication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictPair {
    pub left: ItemDescriptor,
    pub right: ItemDescriptor,
}

/// Size of each category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationCounts {
    pub matched: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub conflicts: usize,
}

impl ReconciliationCounts {
    /// Number of transfers the current classification implies
    pub fn pending_transfers(&self) -> usize {
        self.left_only + self.right_only
    }
}

/// Ordered classification produced for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    outcomes: Vec<MatchOutcome>,
}

impl Reconciliation {
    pub fn outcomes(&self) -> &[MatchOutcome] {
        &self.outcomes
    }

    pub fn matched(&self) -> impl Iterator<Item = (&ItemDescriptor, &ItemDescriptor)> + '_ {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            MatchOutcome::Matched { left, right } => Some((left, right)),
            _ => None,
        })
    }

    pub fn left_only(&self) -> impl Iterator<Item = &ItemDescriptor> + '_ {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            MatchOutcome::LeftOnly { left } => Some(left),
            _ => None,
        })
    }

    pub fn right_only(&self) -> impl Iterator<Item = &ItemDescriptor> + '_ {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            MatchOutcome::RightOnly { right } => Some(right),
            _ => None,
        })
    }

    pub fn conflicts(&self) -> impl Iterator<Item = (&ItemDescriptor, &ItemDescriptor)> + '_ {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            MatchOutcome::Conflict { left, right } => Some((left, right)),
            _ => None,
        })
    }

    pub fn counts(&self) -> ReconciliationCounts {
        self.outcomes
            .iter()
            .fold(ReconciliationCounts::default(), |mut counts, outcome| {
                match outcome {
                    MatchOutcome::Matched { .. } => counts.matched += 1,
                    MatchOutcome::LeftOnly { .. } => counts.left_only += 1,
                    MatchOutcome::RightOnly { .. } => counts.right_only += 1,
                    MatchOutcome::Conflict { .. } => counts.conflicts += 1,
                }
                counts
            })
    }

    pub fn has_conflicts(&self) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| matches!(outcome, MatchOutcome::Conflict { .. }))
    }

    /// Remove every conflict, returning them in order
    pub fn take_conflicts(&mut self) -> Vec<ConflictPair> {
        let (conflicts, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.outcomes)
            .into_iter()
            .partition(|outcome| matches!(outcome, MatchOutcome::Conflict { .. }));
        self.outcomes = rest;

        conflicts
            .into_iter()
            .filter_map(|outcome| match outcome {
                MatchOutcome::Conflict { left, right } => Some(ConflictPair { left, right }),
                _ => None,
            })
            .collect()
    }

    /// Fold an adjudicated conflict back into the classification.
    ///
    /// `Same` adds one `Matched`, `Different` adds one `LeftOnly` and one
    /// `RightOnly`, `Cancel` drops the pair.
    pub fn fold(&mut self, pair: ConflictPair, decision: ConflictDecision) {
        let ConflictPair { left, right } = pair;
        match decision {
            ConflictDecision::Same => self.outcomes.push(MatchOutcome::Matched { left, right }),
            ConflictDecision::Different => {
                self.outcomes.push(MatchOutcome::LeftOnly { left });
                self.outcomes.push(MatchOutcome::RightOnly { right });
            }
            ConflictDecision::Cancel => {}
        }
    }

    /// Items to copy in each direction, in classification order
    pub fn transfer_plan(&self) -> TransferPlan {
        TransferPlan {
            left_to_right: self.left_only().cloned().collect(),
            right_to_left: self.right_only().cloned().collect(),
        }
    }
}

/// Whether two creation times describe the same moment within `tolerance`.
///
/// An unknown time on either side is never similar.
pub fn timestamps_similar(
    left: Option<DateTime<Utc>>,
    right: Option<DateTime<Utc>>,
    tolerance: Duration,
) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => (left - right).abs() <= tolerance,
        _ => false,
    }
}

/// Classify both indexes. Pure; cannot fail.
pub fn reconcile(left: &NameIndex, right: &NameIndex, tolerance: Duration) -> Reconciliation {
    let mut outcomes = Vec::with_capacity(left.item_count() + right.item_count());
    let mut consumed = HashSet::new();

    for (key, left_item) in left.iter() {
        match right.get(key) {
            None => outcomes.push(MatchOutcome::LeftOnly {
                left: left_item.clone(),
            }),
            Some(right_item) => {
                consumed.insert(key.clone());
                let outcome =
                    if timestamps_similar(left_item.created_at, right_item.created_at, tolerance) {
                        MatchOutcome::Matched {
                            left: left_item.clone(),
                            right: right_item.clone(),
                        }
                    } else {
                        MatchOutcome::Conflict {
                            left: left_item.clone(),
                            right: right_item.clone(),
                        }
                    };
                outcomes.push(outcome);
            }
        }
    }

    outcomes.extend(
        left.shadowed()
            .map(|left_item| MatchOutcome::LeftOnly {
                left: left_item.clone(),
            }),
    );

    outcomes.extend(
        right
            .unconsumed(&consumed)
            .map(|right_item| MatchOutcome::RightOnly {
                right: right_item.clone(),
            }),
    );

    Reconciliation { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{parse_timestamp, ItemDetails, StoreSide};
    use crate::index::index;

    fn item(store: StoreSide, id: &str, name: &str, created: Option<&str>) -> ItemDescriptor {
        ItemDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            size: match store {
                StoreSide::Left => Some(100),
                StoreSide::Right => None,
            },
            created_at: created.and_then(parse_timestamp),
            mime_type: "image/jpeg".to_string(),
            store,
            details: ItemDetails::default(),
        }
    }

    fn left(id: &str, name: &str, created: Option<&str>) -> ItemDescriptor {
        item(StoreSide::Left, id, name, created)
    }

    fn right(id: &str, name: &str, created: Option<&str>) -> ItemDescriptor {
        item(StoreSide::Right, id, name, created)
    }

    fn day() -> Duration {
        Duration::hours(24)
    }

    #[test]
    fn test_within_tolerance_matches() {
        let result = reconcile(
            &index(vec![left("l1", "a.jpg", Some("2024-01-01T00:00:00Z"))]),
            &index(vec![right("r1", "a.jpg", Some("2024-01-01T10:00:00Z"))]),
            day(),
        );

        assert_eq!(
            result.counts(),
            ReconciliationCounts {
                matched: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_beyond_tolerance_conflicts() {
        let result = reconcile(
            &index(vec![left("l1", "a.jpg", Some("2024-01-01T00:00:00Z"))]),
            &index(vec![right("r1", "a.jpg", Some("2024-01-03T00:00:00Z"))]),
            day(),
        );

        assert_eq!(result.counts().conflicts, 1);
        assert!(result.has_conflicts());
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let at = parse_timestamp("2024-01-01T00:00:00Z");
        let exactly = parse_timestamp("2024-01-02T00:00:00Z");
        let past = parse_timestamp("2024-01-02T00:00:00.001Z");

        assert!(timestamps_similar(at, exactly, day()));
        assert!(timestamps_similar(exactly, at, day()));
        assert!(!timestamps_similar(at, past, day()));
    }

    #[test]
    fn test_missing_timestamp_conflicts() {
        let result = reconcile(
            &index(vec![left("l1", "a.jpg", None)]),
            &index(vec![right("r1", "A.JPG", Some("2024-01-01T00:00:00Z"))]),
            day(),
        );
        assert_eq!(result.counts().conflicts, 1);

        assert!(!timestamps_similar(None, None, day()));
    }

    #[test]
    fn test_one_sided_items() {
        let result = reconcile(
            &index(vec![
                left("l1", "only-left.jpg", None),
                left("l2", "both.jpg", Some("2024-01-01T00:00:00Z")),
            ]),
            &index(vec![
                right("r1", "both.jpg", Some("2024-01-01T00:00:00Z")),
                right("r2", "only-right.jpg", None),
            ]),
            day(),
        );

        let left_only: Vec<_> = result.left_only().map(|d| d.id.as_str()).collect();
        let right_only: Vec<_> = result.right_only().map(|d| d.id.as_str()).collect();
        assert_eq!(left_only, vec!["l1"]);
        assert_eq!(right_only, vec!["r2"]);
        assert_eq!(result.counts().matched, 1);
    }

    #[test]
    fn test_shadowed_duplicates_are_not_lost() {
        let result = reconcile(
            &index(vec![
                left("l1", "a.jpg", Some("2020-01-01T00:00:00Z")),
                left("l2", "a.jpg", Some("2024-01-01T00:00:00Z")),
            ]),
            &index(vec![
                right("r1", "a.jpg", Some("2018-01-01T00:00:00Z")),
                right("r2", "a.jpg", Some("2024-01-01T05:00:00Z")),
            ]),
            day(),
        );

        let matched: Vec<_> = result
            .matched()
            .map(|(l, r)| (l.id.as_str(), r.id.as_str()))
            .collect();
        assert_eq!(matched, vec![("l2", "r2")]);
        assert_eq!(result.left_only().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["l1"]);
        assert_eq!(result.right_only().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["r1"]);
    }

    #[test]
    fn test_fold_same_and_different() {
        let mut result = reconcile(
            &index(vec![
                left("l1", "a.jpg", None),
                left("l2", "b.jpg", None),
            ]),
            &index(vec![right("r1", "a.jpg", None), right("r2", "b.jpg", None)]),
            day(),
        );
        assert_eq!(result.counts().conflicts, 2);

        let mut conflicts = result.take_conflicts().into_iter();
        assert_eq!(result.counts(), ReconciliationCounts::default());

        result.fold(conflicts.next().unwrap(), ConflictDecision::Same);
        result.fold(conflicts.next().unwrap(), ConflictDecision::Different);

        assert_eq!(
            result.counts(),
            ReconciliationCounts {
                matched: 1,
                left_only: 1,
                right_only: 1,
                conflicts: 0,
            }
        );
    }

    #[test]
    fn test_fold_cancel_drops_pair() {
        let mut result = reconcile(
            &index(vec![left("l1", "a.jpg", None)]),
            &index(vec![right("r1", "a.jpg", None)]),
            day(),
        );
        let pair = result.take_conflicts().remove(0);
        result.fold(pair, ConflictDecision::Cancel);

        assert!(result.outcomes().is_empty());
    }

    #[test]
    fn test_transfer_plan_follows_classification() {
        let result = reconcile(
            &index(vec![left("l1", "x.jpg", None), left("l2", "y.jpg", None)]),
            &index(vec![right("r1", "z.jpg", None)]),
            day(),
        );

        let plan = result.transfer_plan();
        assert_eq!(plan.left_to_right.len(), 2);
        assert_eq!(plan.right_to_left.len(), 1);
        assert_eq!(plan.total(), 3);
    }

    #[test]
    fn test_reconcile_is_repeatable() {
        let left_index = index(vec![
            left("l1", "a.jpg", Some("2024-01-01T00:00:00Z")),
            left("l2", "b.jpg", None),
        ]);
        let right_index = index(vec![
            right("r1", "b.jpg", Some("2024-01-01T00:00:00Z")),
            right("r2", "c.jpg", None),
        ]);

        assert_eq!(
            reconcile(&left_index, &right_index, day()),
            reconcile(&left_index, &right_index, day())
        );
    }
}
