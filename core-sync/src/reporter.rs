//! Run-scoped event publishing.
//!
//! Wraps the event bus with the run's job id so phases can report progress,
//! status and log lines without repeating it. Emission never fails: with no
//! subscriber the event is simply dropped.

use crate::job::{RunState, SyncJobId};
use core_runtime::events::{
    ConflictEvent, CoreEvent, EventBus, SyncEvent, TransferDirection, TransferEvent,
};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RunReporter {
    event_bus: EventBus,
    job_id: String,
}

impl RunReporter {
    pub fn new(event_bus: EventBus, job_id: SyncJobId) -> Self {
        Self {
            event_bus,
            job_id: job_id.to_string(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn emit(&self, event: CoreEvent) {
        self.event_bus.emit(event).ok();
    }

    pub fn progress(&self, percent: u8) {
        self.emit(CoreEvent::Sync(SyncEvent::Progress {
            job_id: self.job_id.clone(),
            percent: percent.min(100),
        }));
    }

    pub fn phase(&self, state: RunState) {
        debug!(job_id = %self.job_id, phase = %state, "Run phase changed");
        self.emit(CoreEvent::Sync(SyncEvent::PhaseChanged {
            job_id: self.job_id.clone(),
            phase: state.as_str().to_string(),
        }));
    }

    /// Short status line, also logged at info
    pub fn status(&self, message: impl Into<String>) {
        let message = message.into();
        info!(job_id = %self.job_id, "{}", message);
        self.emit(CoreEvent::Sync(SyncEvent::Status {
            job_id: self.job_id.clone(),
            message,
        }));
    }

    /// Detailed log line for a log pane
    pub fn log(&self, message: impl Into<String>) {
        self.emit(CoreEvent::Sync(SyncEvent::Log {
            job_id: self.job_id.clone(),
            message: message.into(),
        }));
    }

    pub fn conflicts_detected(&self, count: usize) {
        self.emit(CoreEvent::Conflict(ConflictEvent::Detected {
            job_id: self.job_id.clone(),
            count: count as u64,
        }));
    }

    pub fn conflict_resolved(&self, name: &str, decision: &str) {
        self.emit(CoreEvent::Conflict(ConflictEvent::Resolved {
            job_id: self.job_id.clone(),
            name: name.to_string(),
            decision: decision.to_string(),
        }));
    }

    pub fn item_succeeded(&self, name: &str, direction: TransferDirection, new_id: &str) {
        self.emit(CoreEvent::Transfer(TransferEvent::ItemSucceeded {
            job_id: self.job_id.clone(),
            name: name.to_string(),
            direction,
            new_id: new_id.to_string(),
        }));
    }

    pub fn item_failed(&self, name: &str, direction: TransferDirection, message: &str) {
        self.emit(CoreEvent::Transfer(TransferEvent::ItemFailed {
            job_id: self.job_id.clone(),
            name: name.to_string(),
            direction,
            message: message.to_string(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_carry_job_id() {
        let bus = EventBus::new(10);
        let mut stream = bus.stream();
        let job_id = SyncJobId::new();
        let reporter = RunReporter::new(bus, job_id);

        reporter.progress(150);
        reporter.status("Scanning folder store");

        match stream.recv().await.unwrap() {
            CoreEvent::Sync(SyncEvent::Progress { job_id: id, percent }) => {
                assert_eq!(id, job_id.to_string());
                assert_eq!(percent, 100);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            stream.recv().await.unwrap(),
            CoreEvent::Sync(SyncEvent::Status { .. })
        ));
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let reporter = RunReporter::new(EventBus::new(1), SyncJobId::new());
        reporter.log("nobody listening");
    }
}
