use quiz_core::model::{Badge, ProfileStats, QuizId, StudentId, SubmissionId};
use tokio::sync::broadcast;

/// Notifications for dashboard and badge surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    SubmissionCreated {
        submission_id: SubmissionId,
        quiz_id: QuizId,
        student_id: StudentId,
        percent: u8,
    },
    ProgressApplied {
        submission_id: SubmissionId,
        stats: ProfileStats,
    },
    BadgesUnlocked {
        student_id: StudentId,
        badges: Vec<Badge>,
    },
}

/// Fan-out of [`ProgressEvent`]s. Publishing without subscribers is fine.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ProgressEvent) {
        // an error only means nobody is listening
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
