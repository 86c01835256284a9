//! crates/course_progress_core/src/validator.rs
//!
//! The Chapter Validator promotes a chapter to completed. Two paths lead
//! there: a passing quiz score, or a mentor accepting a submission. Both end
//! in the same idempotent write to the Progress Tracker.

use crate::access::Actor;
use crate::domain::{ProgressReport, ReviewDecision, Submission, SubmissionStatus};
use crate::enrollment::EnrollmentLedger;
use crate::error::{CoreError, CoreResult};
use crate::ports::DatabaseService;
use crate::progress::{chapter_of_course, ProgressTracker};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Minimum quiz score that completes a chapter.
pub const PASSING_SCORE: i32 = 80;

#[derive(Clone)]
pub struct ChapterValidator {
    db: Arc<dyn DatabaseService>,
    ledger: EnrollmentLedger,
    tracker: ProgressTracker,
}

impl ChapterValidator {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        ledger: EnrollmentLedger,
        tracker: ProgressTracker,
    ) -> Self {
        Self {
            db,
            ledger,
            tracker,
        }
    }

    /// Quiz path. Scores must lie in `[0, 100]`; anything under
    /// [`PASSING_SCORE`] leaves progress untouched.
    pub async fn validate_by_score(
        &self,
        actor: &Actor,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        score: i32,
    ) -> CoreResult<ProgressReport> {
        actor.ensure_self_or_admin(user_id)?;
        if !(0..=100).contains(&score) {
            return Err(CoreError::Validation(format!(
                "score must be between 0 and 100, got {}",
                score
            )));
        }
        self.ledger.ensure_enrolled(user_id, course_id).await?;
        chapter_of_course(self.db.as_ref(), course_id, chapter_id).await?;

        if score < PASSING_SCORE {
            warn!(%user_id, %chapter_id, score, "Quiz score below passing threshold");
            return Err(CoreError::ScoreTooLow {
                score,
                threshold: PASSING_SCORE,
            });
        }

        info!(%user_id, %chapter_id, score, "Chapter validated by quiz score");
        self.tracker.apply(user_id, course_id, chapter_id, true).await
    }

    /// Review path, taken when a mentor accepts. The ACCEPTED status and the
    /// author's completed chapter are one storage write, so a failure leaves
    /// the submission reviewable and progress untouched.
    pub(crate) async fn accept_submission(
        &self,
        submission_id: Uuid,
        expected_mentor: Option<Uuid>,
        reviewer_id: Uuid,
        comment: Option<&str>,
    ) -> CoreResult<Submission> {
        let submission = self
            .db
            .record_review(
                submission_id,
                expected_mentor,
                reviewer_id,
                ReviewDecision::Accepted,
                comment,
            )
            .await?;
        info!(
            %submission_id,
            user_id = %submission.user_id,
            chapter_id = %submission.chapter_id,
            "Chapter validated by accepted submission"
        );
        Ok(submission)
    }

    /// Marks the chapter complete for an ACCEPTED submission's author, never
    /// for the reviewer. Idempotent, so it can be replayed for any accepted
    /// submission.
    pub async fn validate_by_submission(&self, submission: &Submission) -> CoreResult<ProgressReport> {
        if submission.status != SubmissionStatus::Accepted {
            return Err(CoreError::Conflict(format!(
                "submission {} is {}, not ACCEPTED",
                submission.id, submission.status
            )));
        }

        info!(
            submission_id = %submission.id,
            user_id = %submission.user_id,
            chapter_id = %submission.chapter_id,
            "Chapter completion applied for accepted submission"
        );
        self.tracker
            .apply(
                submission.user_id,
                submission.course_id,
                submission.chapter_id,
                true,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReviewDecision, Role};
    use crate::events::NoopEventPublisher;
    use crate::memory::InMemoryDatabase;

    struct Fixture {
        db: Arc<InMemoryDatabase>,
        validator: ChapterValidator,
        learner: Actor,
        course_id: Uuid,
        chapters: Vec<Uuid>,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(InMemoryDatabase::new());
        let ledger = EnrollmentLedger::new(db.clone(), Arc::new(NoopEventPublisher));
        let tracker = ProgressTracker::new(db.clone(), ledger.clone());
        let validator = ChapterValidator::new(db.clone(), ledger.clone(), tracker);
        let user = db
            .create_user_with_email("sam@example.com", "Sam", "hash", Role::Learner)
            .await
            .unwrap();
        let learner = Actor::new(user.user_id, Role::Learner);
        let course = db.create_course("Networking", "").await.unwrap();
        let mut chapters = Vec::new();
        for position in 1..=3 {
            chapters.push(db.add_chapter(course.id, "ch", position).await.unwrap().id);
        }
        ledger
            .enroll(&learner, user.user_id, course.id)
            .await
            .unwrap();
        Fixture {
            db,
            validator,
            learner,
            course_id: course.id,
            chapters,
        }
    }

    #[tokio::test]
    async fn score_gate_is_inclusive_at_eighty() {
        let f = fixture().await;
        let me = f.learner.user_id;

        let err = f
            .validator
            .validate_by_score(&f.learner, me, f.course_id, f.chapters[0], 79)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ScoreTooLow {
                score: 79,
                threshold: 80
            }
        ));
        assert!(f.db.get_progress(me, f.course_id).await.unwrap().is_none());

        let report = f
            .validator
            .validate_by_score(&f.learner, me, f.course_id, f.chapters[0], 80)
            .await
            .unwrap();
        assert!(report.is_completed(f.chapters[0]));
    }

    #[tokio::test]
    async fn out_of_range_scores_are_validation_errors() {
        let f = fixture().await;
        for score in [-1, 101] {
            let err = f
                .validator
                .validate_by_score(&f.learner, f.learner.user_id, f.course_id, f.chapters[0], score)
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn revalidating_does_not_change_percentage() {
        let f = fixture().await;
        let me = f.learner.user_id;
        let first = f
            .validator
            .validate_by_score(&f.learner, me, f.course_id, f.chapters[1], 95)
            .await
            .unwrap();
        let second = f
            .validator
            .validate_by_score(&f.learner, me, f.course_id, f.chapters[1], 100)
            .await
            .unwrap();
        assert_eq!(first.percentage, 33);
        assert_eq!(second.percentage, first.percentage);
        assert_eq!(second.completed_chapters, first.completed_chapters);
    }

    #[tokio::test]
    async fn submission_path_requires_acceptance_and_credits_the_author() {
        let f = fixture().await;
        let me = f.learner.user_id;
        let submission = f
            .db
            .create_submission(me, f.course_id, f.chapters[2], "https://git.example/x")
            .await
            .unwrap();

        let err = f
            .validator
            .validate_by_submission(&submission)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        let mentor = Uuid::new_v4();
        let accepted = f
            .db
            .record_review(submission.id, None, mentor, ReviewDecision::Accepted, None)
            .await
            .unwrap();
        let report = f.validator.validate_by_submission(&accepted).await.unwrap();
        assert_eq!(report.user_id, me);
        assert!(report.is_completed(f.chapters[2]));
        assert!(f.db.get_progress(mentor, f.course_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn quiz_for_unenrolled_learner_is_forbidden() {
        let f = fixture().await;
        let outsider = Actor::new(Uuid::new_v4(), Role::Learner);
        let err = f
            .validator
            .validate_by_score(&outsider, outsider.user_id, f.course_id, f.chapters[0], 90)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }
}
