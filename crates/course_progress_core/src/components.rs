//! crates/course_progress_core/src/components.rs
//!
//! Builds the four core components around one storage client and one event
//! publisher. The process entry point owns both and passes them in.

use crate::enrollment::EnrollmentLedger;
use crate::events::EventPublisher;
use crate::ports::DatabaseService;
use crate::progress::ProgressTracker;
use crate::submission::SubmissionWorkflow;
use crate::validator::ChapterValidator;
use std::sync::Arc;

#[derive(Clone)]
pub struct CoreComponents {
    pub enrollment: EnrollmentLedger,
    pub progress: ProgressTracker,
    pub validator: ChapterValidator,
    pub submissions: SubmissionWorkflow,
}

impl CoreComponents {
    pub fn new(db: Arc<dyn DatabaseService>, events: Arc<dyn EventPublisher>) -> Self {
        let enrollment = EnrollmentLedger::new(db.clone(), events.clone());
        let progress = ProgressTracker::new(db.clone(), enrollment.clone());
        let validator = ChapterValidator::new(db.clone(), enrollment.clone(), progress.clone());
        let submissions =
            SubmissionWorkflow::new(db, enrollment.clone(), validator.clone(), events);
        Self {
            enrollment,
            progress,
            validator,
            submissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Actor;
    use crate::domain::{ReviewDecision, Role};
    use crate::error::CoreError;
    use crate::events::NoopEventPublisher;
    use crate::memory::InMemoryDatabase;

    /// Course with chapters [1, 2, 3]: two visits, a failed quiz, a passed
    /// quiz, and a repeated mentor acceptance on an already-completed chapter.
    #[tokio::test]
    async fn three_chapter_course_walkthrough() {
        let db = Arc::new(InMemoryDatabase::new());
        let core = CoreComponents::new(db.clone(), Arc::new(NoopEventPublisher));

        let learner = db
            .create_user_with_email("eve@example.com", "Eve", "hash", Role::Learner)
            .await
            .unwrap();
        let me = Actor::new(learner.user_id, Role::Learner);
        let mentor = db
            .create_user_with_email("mo@example.com", "Mo", "hash", Role::Mentor)
            .await
            .unwrap();
        let mentor = Actor::new(mentor.user_id, Role::Mentor);

        let course = db.create_course("Systems", "").await.unwrap();
        let mut ch = Vec::new();
        for position in 1..=3 {
            ch.push(db.add_chapter(course.id, "ch", position).await.unwrap().id);
        }

        let enrolled = core
            .enrollment
            .enroll(&me, me.user_id, course.id)
            .await
            .unwrap();
        assert_eq!(enrolled.enrolled_count, 1);

        let p = core
            .progress
            .record_chapter_progress(&me, me.user_id, course.id, ch[0], true)
            .await
            .unwrap();
        assert_eq!((p.current_chapter_id, p.percentage), (Some(ch[0]), 33));

        let p = core
            .progress
            .record_chapter_progress(&me, me.user_id, course.id, ch[1], true)
            .await
            .unwrap();
        assert_eq!(p.completed_chapters, vec![ch[0], ch[1]]);
        assert_eq!(p.percentage, 67);

        let err = core
            .validator
            .validate_by_score(&me, me.user_id, course.id, ch[2], 60)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ScoreTooLow { .. }));

        let p = core
            .validator
            .validate_by_score(&me, me.user_id, course.id, ch[2], 85)
            .await
            .unwrap();
        assert_eq!(p.completed_chapters, ch);
        assert_eq!(p.percentage, 100);

        let submission = core
            .submissions
            .submit_link(&me, me.user_id, course.id, ch[1], "https://github.com/eve/ch2")
            .await
            .unwrap();
        core.submissions
            .assign(&mentor, submission.id, mentor.user_id)
            .await
            .unwrap();
        core.submissions
            .review(&mentor, submission.id, ReviewDecision::Accepted, None)
            .await
            .unwrap();

        let p = core
            .progress
            .get_progress(&me, me.user_id, course.id)
            .await
            .unwrap();
        assert_eq!(p.percentage, 100);
        assert_eq!(p.completed_chapters.len(), 3);
        assert_eq!(p.current_chapter_id, Some(ch[1]));
    }
}
