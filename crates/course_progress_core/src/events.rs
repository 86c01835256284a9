//! crates/course_progress_core/src/events.rs
//!
//! Domain events emitted by the core components. The core never delivers
//! notifications itself; an external subscriber (the mailer) listens to
//! whatever publisher the process wires in.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    EnrollmentCreated {
        user_id: Uuid,
        course_id: Uuid,
        at: DateTime<Utc>,
    },
    EnrollmentRemoved {
        user_id: Uuid,
        course_id: Uuid,
        at: DateTime<Utc>,
    },
    SubmissionReceived {
        submission_id: Uuid,
        user_id: Uuid,
        chapter_id: Uuid,
        at: DateTime<Utc>,
    },
    SubmissionReviewed {
        submission_id: Uuid,
        user_id: Uuid,
        reviewer_id: Uuid,
        status: String,
        at: DateTime<Utc>,
    },
    ChapterAccepted {
        submission_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::EnrollmentCreated { .. } => "EnrollmentCreated",
            DomainEvent::EnrollmentRemoved { .. } => "EnrollmentRemoved",
            DomainEvent::SubmissionReceived { .. } => "SubmissionReceived",
            DomainEvent::SubmissionReviewed { .. } => "SubmissionReviewed",
            DomainEvent::ChapterAccepted { .. } => "ChapterAccepted",
        }
    }
}

/// Fire-and-forget sink for domain events. Publishing never fails the
/// operation that produced the event.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventPublisher;

impl EventPublisher for NoopEventPublisher {
    fn publish(&self, _event: DomainEvent) {}
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct CollectingEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl CollectingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the events published so far, oldest first.
    pub fn events(&self) -> Vec<DomainEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::name).collect()
    }
}

impl EventPublisher for CollectingEventPublisher {
    fn publish(&self, event: DomainEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
