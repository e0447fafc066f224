//! Conflict Resolution Orchestration
//!
//! Presents each conflicting pair to the adjudicator, in order and one at a
//! time, and folds every decision back into the reconciliation:
//!
//! - `Same` turns the pair into one `Matched` outcome
//! - `Different` turns it into one `LeftOnly` and one `RightOnly`
//! - `Cancel` stops immediately; conflicts not yet presented are dropped,
//!   neither resolved nor defaulted
//!
//! Every presented conflict counts as resolved, the cancelling one included.
//! A stop request observed before presenting a conflict halts the loop the
//! same way a `Cancel` decision does.

use crate::{
    conflict_resolver::{ConflictAdjudicator, ConflictDecision},
    reconciler::Reconciliation,
    reporter::RunReporter,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Why conflict resolution ended before presenting every conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionHalt {
    /// The adjudicator answered `Cancel`
    CancelDecision,
    /// A stop was requested between conflicts
    StopRequested,
}

/// Statistics from the conflict resolution phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictResolutionStats {
    /// Conflicts found by the reconciler
    pub detected: u64,

    /// Conflicts presented to the adjudicator
    pub adjudicated: u64,

    /// Pairs folded into `Matched`
    pub same: u64,

    /// Pairs folded into `LeftOnly` + `RightOnly`
    pub different: u64,

    /// Conflicts never presented because the phase halted
    pub dropped: u64,

    pub halted: Option<ResolutionHalt>,
}

impl ConflictResolutionStats {
    /// Whether the run must stop after this phase
    pub fn is_cancelled(&self) -> bool {
        self.halted.is_some()
    }
}

/// Drives adjudication of every conflict in a reconciliation
pub struct ConflictResolutionOrchestrator {
    adjudicator: Arc<dyn ConflictAdjudicator>,
}

impl ConflictResolutionOrchestrator {
    pub fn new(adjudicator: Arc<dyn ConflictAdjudicator>) -> Self {
        Self { adjudicator }
    }

    /// Resolve every conflict in `reconciliation` in place.
    ///
    /// Afterwards `reconciliation` holds no `Conflict` outcomes.
    #[instrument(skip_all, fields(job_id = %reporter.job_id()))]
    pub async fn resolve(
        &self,
        reconciliation: &mut Reconciliation,
        reporter: &RunReporter,
        cancellation_token: &CancellationToken,
    ) -> ConflictResolutionStats {
        let conflicts = reconciliation.take_conflicts();
        let total = conflicts.len() as u64;
        let mut stats = ConflictResolutionStats {
            detected: total,
            ..Default::default()
        };

        if conflicts.is_empty() {
            return stats;
        }

        info!(count = total, "Resolving conflicts");
        reporter.conflicts_detected(conflicts.len());
        reporter.status(format!("Found {} conflicts, waiting for decisions", total));

        for (position, pair) in conflicts.into_iter().enumerate() {
            let position = position as u64;

            if cancellation_token.is_cancelled() {
                stats.halted = Some(ResolutionHalt::StopRequested);
                stats.dropped = total - position;
                break;
            }

            let decision = self.adjudicator.adjudicate(&pair.left, &pair.right).await;
            stats.adjudicated += 1;

            debug!(name = %pair.left.name, %decision, "Conflict adjudicated");
            reporter.conflict_resolved(&pair.left.name, decision.as_str());
            reporter.log(format!("Conflict {}: {}", pair.left.name, decision));

            match decision {
                ConflictDecision::Same => stats.same += 1,
                ConflictDecision::Different => stats.different += 1,
                ConflictDecision::Cancel => {
                    stats.halted = Some(ResolutionHalt::CancelDecision);
                    stats.dropped = total - position - 1;
                    break;
                }
            }

            reconciliation.fold(pair, decision);
        }

        if let Some(halt) = stats.halted {
            info!(
                adjudicated = stats.adjudicated,
                dropped = stats.dropped,
                ?halt,
                "Conflict resolution halted"
            );
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict_resolver::ConflictPolicy;
    use crate::descriptor::{ItemDescriptor, ItemDetails, StoreSide};
    use crate::index::index;
    use crate::job::SyncJobId;
    use crate::reconciler::{reconcile, ReconciliationCounts};
    use async_trait::async_trait;
    use chrono::Duration;
    use core_runtime::events::EventBus;
    use std::sync::Mutex;

    /// Replays a fixed list of decisions and records who was asked
    struct ScriptedAdjudicator {
        decisions: Mutex<Vec<ConflictDecision>>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedAdjudicator {
        fn new(decisions: Vec<ConflictDecision>) -> Self {
            Self {
                decisions: Mutex::new(decisions.into_iter().rev().collect()),
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ConflictAdjudicator for ScriptedAdjudicator {
        async fn adjudicate(
            &self,
            left: &ItemDescriptor,
            _right: &ItemDescriptor,
        ) -> ConflictDecision {
            self.asked.lock().unwrap().push(left.name.clone());
            self.decisions
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(ConflictDecision::Cancel)
        }
    }

    fn item(store: StoreSide, name: &str) -> ItemDescriptor {
        ItemDescriptor {
            id: format!("{}-{}", store, name),
            name: name.to_string(),
            size: None,
            created_at: None,
            mime_type: "image/jpeg".to_string(),
            store,
            details: ItemDetails::default(),
        }
    }

    fn three_conflicts() -> Reconciliation {
        let names = ["a.jpg", "b.jpg", "c.jpg"];
        reconcile(
            &index(names.iter().map(|n| item(StoreSide::Left, n))),
            &index(names.iter().map(|n| item(StoreSide::Right, n))),
            Duration::hours(24),
        )
    }

    fn reporter() -> RunReporter {
        RunReporter::new(EventBus::new(16), SyncJobId::new())
    }

    #[tokio::test]
    async fn test_decisions_fold_in_order() {
        let adjudicator = Arc::new(ScriptedAdjudicator::new(vec![
            ConflictDecision::Same,
            ConflictDecision::Different,
            ConflictDecision::Same,
        ]));
        let orchestrator = ConflictResolutionOrchestrator::new(adjudicator.clone());
        let mut reconciliation = three_conflicts();

        let stats = orchestrator
            .resolve(&mut reconciliation, &reporter(), &CancellationToken::new())
            .await;

        assert_eq!(stats.adjudicated, 3);
        assert_eq!(stats.same, 2);
        assert_eq!(stats.different, 1);
        assert!(!stats.is_cancelled());
        assert_eq!(
            reconciliation.counts(),
            ReconciliationCounts {
                matched: 2,
                left_only: 1,
                right_only: 1,
                conflicts: 0,
            }
        );
        assert_eq!(
            *adjudicator.asked.lock().unwrap(),
            vec!["a.jpg", "b.jpg", "c.jpg"]
        );
    }

    #[tokio::test]
    async fn test_cancel_counts_itself_and_drops_the_rest() {
        let adjudicator = Arc::new(ScriptedAdjudicator::new(vec![
            ConflictDecision::Same,
            ConflictDecision::Cancel,
        ]));
        let orchestrator = ConflictResolutionOrchestrator::new(adjudicator.clone());
        let mut reconciliation = three_conflicts();

        let stats = orchestrator
            .resolve(&mut reconciliation, &reporter(), &CancellationToken::new())
            .await;

        assert_eq!(stats.adjudicated, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.halted, Some(ResolutionHalt::CancelDecision));
        assert_eq!(
            reconciliation.counts(),
            ReconciliationCounts {
                matched: 1,
                ..Default::default()
            }
        );
        assert_eq!(adjudicator.asked.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_before_first_conflict() {
        let adjudicator = Arc::new(ScriptedAdjudicator::new(vec![]));
        let orchestrator = ConflictResolutionOrchestrator::new(adjudicator.clone());
        let mut reconciliation = three_conflicts();
        let token = CancellationToken::new();
        token.cancel();

        let stats = orchestrator
            .resolve(&mut reconciliation, &reporter(), &token)
            .await;

        assert_eq!(stats.adjudicated, 0);
        assert_eq!(stats.dropped, 3);
        assert_eq!(stats.halted, Some(ResolutionHalt::StopRequested));
        assert!(reconciliation.outcomes().is_empty());
        assert!(adjudicator.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_conflicts_is_a_no_op() {
        let orchestrator = ConflictResolutionOrchestrator::new(Arc::new(ConflictPolicy::Abort));
        let mut reconciliation = Reconciliation::default();

        let stats = orchestrator
            .resolve(&mut reconciliation, &reporter(), &CancellationToken::new())
            .await;

        assert_eq!(stats, ConflictResolutionStats::default());
    }
}
