pub mod access;
pub mod components;
pub mod domain;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod memory;
pub mod ports;
pub mod progress;
pub mod submission;
pub mod validator;

pub use access::Actor;
pub use components::CoreComponents;
pub use domain::{
    Chapter, Course, Progress, ProgressReport, ReviewDecision, ReviewQueueFilter, Role,
    Submission, SubmissionState, SubmissionStatus, User, UserCredentials,
};
pub use enrollment::EnrollmentLedger;
pub use error::{CoreError, CoreResult};
pub use events::{CollectingEventPublisher, DomainEvent, EventPublisher, NoopEventPublisher};
pub use memory::InMemoryDatabase;
pub use ports::DatabaseService;
pub use progress::ProgressTracker;
pub use submission::SubmissionWorkflow;
pub use validator::{ChapterValidator, PASSING_SCORE};
