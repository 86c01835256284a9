//! crates/course_progress_core/src/submission.rs
//!
//! The Submission Workflow: the review lifecycle of learner work links.
//!
//! ```text
//! PENDING --assign--> REVIEWING --review--> ACCEPTED | REJECTED | NEEDS_REVISION
//!    \________________review (admin)_______/
//! REJECTED | NEEDS_REVISION | PENDING | REVIEWING --update--> PENDING
//! PENDING | REVIEWING --newer submission--> SUPERSEDED
//! ```
//!
//! Only the latest submission for a chapter can be updated. ACCEPTED is
//! terminal and completes the chapter through the Chapter Validator in the
//! same storage write.

use crate::access::Actor;
use crate::domain::{
    ReviewDecision, ReviewQueueFilter, Role, Submission, SubmissionState, SubmissionStatus,
};
use crate::enrollment::EnrollmentLedger;
use crate::error::{CoreError, CoreResult};
use crate::events::{DomainEvent, EventPublisher};
use crate::ports::DatabaseService;
use crate::progress::chapter_of_course;
use crate::validator::ChapterValidator;
use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::info;
use uuid::Uuid;

fn link_pattern() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"^https?://[^\s/?#]+\S*$").expect("link pattern compiles"))
}

/// Trims the link and checks it is an absolute http(s) URL.
pub fn validate_link(link: &str) -> CoreResult<&str> {
    let link = link.trim();
    if link.is_empty() {
        return Err(CoreError::Validation("link must not be empty".to_string()));
    }
    if !link_pattern().is_match(link) {
        return Err(CoreError::Validation(format!(
            "'{}' is not an http(s) link",
            link
        )));
    }
    Ok(link)
}

#[derive(Clone)]
pub struct SubmissionWorkflow {
    db: Arc<dyn DatabaseService>,
    ledger: EnrollmentLedger,
    validator: ChapterValidator,
    events: Arc<dyn EventPublisher>,
}

impl SubmissionWorkflow {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        ledger: EnrollmentLedger,
        validator: ChapterValidator,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            db,
            ledger,
            validator,
            events,
        }
    }

    /// Creates a PENDING submission. Any earlier submission for the chapter
    /// still waiting on review is superseded.
    pub async fn submit_link(
        &self,
        actor: &Actor,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        link: &str,
    ) -> CoreResult<Submission> {
        actor.ensure_self(user_id)?;
        let link = validate_link(link)?;
        self.ledger.ensure_enrolled(user_id, course_id).await?;
        chapter_of_course(self.db.as_ref(), course_id, chapter_id).await?;

        let submission = self
            .db
            .create_submission(user_id, course_id, chapter_id, link)
            .await?;
        info!(submission_id = %submission.id, %user_id, %chapter_id, "Submission received");

        self.events.publish(DomainEvent::SubmissionReceived {
            submission_id: submission.id,
            user_id,
            chapter_id,
            at: Utc::now(),
        });
        Ok(submission)
    }

    /// Replaces the link of one of the caller's own submissions and restarts
    /// the review cycle, discarding any earlier outcome.
    pub async fn update_submission(
        &self,
        actor: &Actor,
        submission_id: Uuid,
        link: &str,
    ) -> CoreResult<Submission> {
        let link = validate_link(link)?;
        let existing = self.db.get_submission(submission_id).await?;
        if existing.user_id != actor.user_id {
            return Err(CoreError::NotFound(format!(
                "Submission {} not found",
                submission_id
            )));
        }
        if !existing.status.allows_resubmission() {
            return Err(CoreError::Conflict(format!(
                "submission {} is {} and cannot be updated",
                submission_id, existing.status
            )));
        }
        self.ledger
            .ensure_enrolled(existing.user_id, existing.course_id)
            .await?;

        let submission = self.db.resubmit(submission_id, link).await?;
        info!(%submission_id, previous_status = %existing.status, "Submission updated and reset to PENDING");

        self.events.publish(DomainEvent::SubmissionReceived {
            submission_id,
            user_id: submission.user_id,
            chapter_id: submission.chapter_id,
            at: Utc::now(),
        });
        Ok(submission)
    }

    /// Claims the submission for `mentor_id`. Mentors can only claim for
    /// themselves; admins may hand it to any mentor or admin. The first claim
    /// wins and every later one fails with `Conflict`.
    pub async fn assign(
        &self,
        actor: &Actor,
        submission_id: Uuid,
        mentor_id: Uuid,
    ) -> CoreResult<Submission> {
        actor.ensure_staff()?;
        if mentor_id != actor.user_id {
            actor.ensure_admin()?;
            let mentor = self.db.get_user(mentor_id).await?;
            if !matches!(mentor.role, Role::Mentor | Role::Admin) {
                return Err(CoreError::Validation(format!(
                    "user {} is a {} and cannot review submissions",
                    mentor_id, mentor.role
                )));
            }
        }

        let submission = self.db.assign_mentor(submission_id, mentor_id).await?;
        info!(%submission_id, %mentor_id, "Submission assigned for review");
        Ok(submission)
    }

    /// Records the reviewer's decision. Only the assigned mentor or an admin
    /// may review. ACCEPTED promotes the chapter for the submission's author.
    pub async fn review(
        &self,
        actor: &Actor,
        submission_id: Uuid,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> CoreResult<Submission> {
        actor.ensure_staff()?;
        let existing = self.db.get_submission(submission_id).await?;
        let is_assigned_mentor = existing.mentor_id == Some(actor.user_id);
        if !is_assigned_mentor && !actor.is_admin() {
            return Err(CoreError::Forbidden(format!(
                "submission {} is not assigned to you",
                submission_id
            )));
        }
        if !existing.status.is_actionable() {
            return Err(CoreError::Conflict(format!(
                "submission {} is {} and cannot be reviewed",
                submission_id, existing.status
            )));
        }

        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        let submission = match decision {
            ReviewDecision::Accepted => {
                self.validator
                    .accept_submission(submission_id, existing.mentor_id, actor.user_id, comment)
                    .await?
            }
            other => {
                self.db
                    .record_review(submission_id, existing.mentor_id, actor.user_id, other, comment)
                    .await?
            }
        };
        info!(%submission_id, reviewer = %actor.user_id, status = %submission.status, "Submission reviewed");

        if submission.status == SubmissionStatus::Accepted {
            self.events.publish(DomainEvent::ChapterAccepted {
                submission_id,
                user_id: submission.user_id,
                course_id: submission.course_id,
                chapter_id: submission.chapter_id,
                at: Utc::now(),
            });
        }
        self.events.publish(DomainEvent::SubmissionReviewed {
            submission_id,
            user_id: submission.user_id,
            reviewer_id: actor.user_id,
            status: submission.status.to_string(),
            at: Utc::now(),
        });
        Ok(submission)
    }

    /// The latest submission for the chapter, or `NotSubmitted`.
    pub async fn get_status(
        &self,
        actor: &Actor,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
    ) -> CoreResult<SubmissionState> {
        actor.ensure_self_or_staff(user_id)?;
        chapter_of_course(self.db.as_ref(), course_id, chapter_id).await?;
        Ok(
            match self
                .db
                .latest_submission(user_id, course_id, chapter_id)
                .await?
            {
                Some(submission) => SubmissionState::Submitted(submission),
                None => SubmissionState::NotSubmitted,
            },
        )
    }

    pub async fn list_for_user(&self, actor: &Actor, user_id: Uuid) -> CoreResult<Vec<Submission>> {
        actor.ensure_self_or_staff(user_id)?;
        self.db.list_submissions_for_user(user_id).await
    }

    pub async fn review_queue(
        &self,
        actor: &Actor,
        filter: &ReviewQueueFilter,
    ) -> CoreResult<Vec<Submission>> {
        actor.ensure_staff()?;
        self.db.list_review_queue(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chapter, Course, Progress, User, UserCredentials};
    use crate::events::CollectingEventPublisher;
    use crate::memory::InMemoryDatabase;
    use crate::progress::ProgressTracker;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        db: Arc<InMemoryDatabase>,
        events: Arc<CollectingEventPublisher>,
        workflow: SubmissionWorkflow,
        tracker: ProgressTracker,
        learner: Actor,
        mentor: Actor,
        other_mentor: Actor,
        admin: Actor,
        course_id: Uuid,
        chapter_id: Uuid,
    }

    async fn user(db: &InMemoryDatabase, email: &str, role: Role) -> Actor {
        let user = db
            .create_user_with_email(email, email, "hash", role)
            .await
            .unwrap();
        Actor::new(user.user_id, role)
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(InMemoryDatabase::new());
        let events = Arc::new(CollectingEventPublisher::new());
        let ledger = EnrollmentLedger::new(db.clone(), events.clone());
        let tracker = ProgressTracker::new(db.clone(), ledger.clone());
        let validator = ChapterValidator::new(db.clone(), ledger.clone(), tracker.clone());
        let workflow =
            SubmissionWorkflow::new(db.clone(), ledger.clone(), validator, events.clone());

        let learner = user(&db, "learner@example.com", Role::Learner).await;
        let mentor = user(&db, "mentor@example.com", Role::Mentor).await;
        let other_mentor = user(&db, "mentor2@example.com", Role::Mentor).await;
        let admin = user(&db, "admin@example.com", Role::Admin).await;

        let course = db.create_course("Web", "").await.unwrap();
        let chapter = db.add_chapter(course.id, "Project", 1).await.unwrap();
        db.add_chapter(course.id, "Wrap-up", 2).await.unwrap();
        ledger
            .enroll(&learner, learner.user_id, course.id)
            .await
            .unwrap();

        Fixture {
            db,
            events,
            workflow,
            tracker,
            learner,
            mentor,
            other_mentor,
            admin,
            course_id: course.id,
            chapter_id: chapter.id,
        }
    }

    impl Fixture {
        async fn submit(&self, link: &str) -> CoreResult<Submission> {
            self.workflow
                .submit_link(
                    &self.learner,
                    self.learner.user_id,
                    self.course_id,
                    self.chapter_id,
                    link,
                )
                .await
        }
    }

    #[test]
    fn links_must_be_absolute_http_urls() {
        assert_eq!(
            validate_link("  https://github.com/me/repo ").unwrap(),
            "https://github.com/me/repo"
        );
        assert!(validate_link("http://localhost:8080/demo").is_ok());
        for bad in ["", "   ", "github.com/me/repo", "ftp://x.org/a", "https://", "https://a b"] {
            assert!(
                matches!(validate_link(bad), Err(CoreError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn full_lifecycle_accepts_and_completes_chapter() {
        let f = fixture().await;
        let submission = f.submit("https://github.com/me/project").await.unwrap();
        assert_eq!(submission.status, SubmissionStatus::Pending);

        let assigned = f
            .workflow
            .assign(&f.mentor, submission.id, f.mentor.user_id)
            .await
            .unwrap();
        assert_eq!(assigned.status, SubmissionStatus::Reviewing);

        let err = f
            .workflow
            .assign(&f.other_mentor, submission.id, f.other_mentor.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        let reviewed = f
            .workflow
            .review(
                &f.mentor,
                submission.id,
                ReviewDecision::Accepted,
                Some("Nice work"),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.status, SubmissionStatus::Accepted);
        assert_eq!(reviewed.mentor_comment.as_deref(), Some("Nice work"));

        match f
            .workflow
            .get_status(&f.learner, f.learner.user_id, f.course_id, f.chapter_id)
            .await
            .unwrap()
        {
            SubmissionState::Submitted(s) => assert_eq!(s.status, SubmissionStatus::Accepted),
            SubmissionState::NotSubmitted => panic!("expected a submission"),
        }

        let progress = f
            .tracker
            .get_progress(&f.learner, f.learner.user_id, f.course_id)
            .await
            .unwrap();
        assert!(progress.is_completed(f.chapter_id));
        assert_eq!(progress.percentage, 50);

        assert_eq!(
            f.events.names(),
            vec![
                "EnrollmentCreated",
                "SubmissionReceived",
                "ChapterAccepted",
                "SubmissionReviewed"
            ]
        );
    }

    #[tokio::test]
    async fn empty_link_is_rejected_before_storage() {
        let f = fixture().await;
        let err = f.submit("   ").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(f
            .db
            .list_submissions_for_user(f.learner.user_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn status_is_not_submitted_without_records() {
        let f = fixture().await;
        let state = f
            .workflow
            .get_status(&f.learner, f.learner.user_id, f.course_id, f.chapter_id)
            .await
            .unwrap();
        assert_eq!(state, SubmissionState::NotSubmitted);
    }

    #[tokio::test]
    async fn concurrent_assignments_have_exactly_one_winner() {
        let f = fixture().await;
        let submission = f.submit("https://github.com/me/race").await.unwrap();

        let mut mentors = Vec::new();
        for i in 0..8 {
            mentors.push(user(&f.db, &format!("m{}@example.com", i), Role::Mentor).await);
        }
        let handles: Vec<_> = mentors
            .into_iter()
            .map(|mentor| {
                let workflow = f.workflow.clone();
                let submission_id = submission.id;
                tokio::spawn(async move {
                    workflow
                        .assign(&mentor, submission_id, mentor.user_id)
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(CoreError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn only_assigned_mentor_or_admin_may_review() {
        let f = fixture().await;
        let submission = f.submit("https://github.com/me/p").await.unwrap();
        f.workflow
            .assign(&f.mentor, submission.id, f.mentor.user_id)
            .await
            .unwrap();

        let err = f
            .workflow
            .review(&f.other_mentor, submission.id, ReviewDecision::Rejected, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = f
            .workflow
            .review(&f.learner, submission.id, ReviewDecision::Accepted, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let reviewed = f
            .workflow
            .review(&f.admin, submission.id, ReviewDecision::NeedsRevision, Some("  "))
            .await
            .unwrap();
        assert_eq!(reviewed.status, SubmissionStatus::NeedsRevision);
        assert_eq!(reviewed.mentor_comment, None);
        assert_eq!(reviewed.mentor_id, Some(f.mentor.user_id));
    }

    #[tokio::test]
    async fn admin_can_review_unassigned_submission() {
        let f = fixture().await;
        let submission = f.submit("https://github.com/me/p").await.unwrap();
        let reviewed = f
            .workflow
            .review(&f.admin, submission.id, ReviewDecision::Rejected, Some("Missing tests"))
            .await
            .unwrap();
        assert_eq!(reviewed.status, SubmissionStatus::Rejected);
        assert_eq!(reviewed.mentor_id, Some(f.admin.user_id));
    }

    #[tokio::test]
    async fn mentor_cannot_assign_someone_else() {
        let f = fixture().await;
        let submission = f.submit("https://github.com/me/p").await.unwrap();
        let err = f
            .workflow
            .assign(&f.mentor, submission.id, f.other_mentor.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = f
            .workflow
            .assign(&f.admin, submission.id, f.learner.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let assigned = f
            .workflow
            .assign(&f.admin, submission.id, f.other_mentor.user_id)
            .await
            .unwrap();
        assert_eq!(assigned.mentor_id, Some(f.other_mentor.user_id));
    }

    #[tokio::test]
    async fn resubmitting_supersedes_the_pending_submission() {
        let f = fixture().await;
        let first = f.submit("https://github.com/me/v1").await.unwrap();
        let second = f.submit("https://github.com/me/v2").await.unwrap();

        let first = f.db.get_submission(first.id).await.unwrap();
        assert_eq!(first.status, SubmissionStatus::Superseded);

        let err = f
            .workflow
            .assign(&f.mentor, first.id, f.mentor.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        match f
            .workflow
            .get_status(&f.learner, f.learner.user_id, f.course_id, f.chapter_id)
            .await
            .unwrap()
        {
            SubmissionState::Submitted(latest) => assert_eq!(latest.id, second.id),
            SubmissionState::NotSubmitted => panic!("expected a submission"),
        }

        let actionable = f
            .workflow
            .review_queue(&f.mentor, &ReviewQueueFilter::default())
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.status.is_actionable())
            .count();
        assert_eq!(actionable, 1);
    }

    #[tokio::test]
    async fn update_after_rejection_restarts_review() {
        let f = fixture().await;
        let submission = f.submit("https://github.com/me/v1").await.unwrap();
        f.workflow
            .assign(&f.mentor, submission.id, f.mentor.user_id)
            .await
            .unwrap();
        f.workflow
            .review(&f.mentor, submission.id, ReviewDecision::Rejected, Some("Broken build"))
            .await
            .unwrap();

        let updated = f
            .workflow
            .update_submission(&f.learner, submission.id, "https://github.com/me/v2")
            .await
            .unwrap();
        assert_eq!(updated.status, SubmissionStatus::Pending);
        assert_eq!(updated.link, "https://github.com/me/v2");
        assert_eq!(updated.mentor_id, None);
        assert_eq!(updated.mentor_comment, None);

        f.workflow
            .assign(&f.other_mentor, submission.id, f.other_mentor.user_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_of_someone_elses_submission_is_not_found() {
        let f = fixture().await;
        let submission = f.submit("https://github.com/me/v1").await.unwrap();
        let err = f
            .workflow
            .update_submission(&f.mentor, submission.id, "https://github.com/x/y")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn accepted_submission_is_terminal() {
        let f = fixture().await;
        let submission = f.submit("https://github.com/me/v1").await.unwrap();
        f.workflow
            .review(&f.admin, submission.id, ReviewDecision::Accepted, None)
            .await
            .unwrap();

        let err = f
            .workflow
            .update_submission(&f.learner, submission.id, "https://github.com/me/v2")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        let err = f
            .workflow
            .review(&f.admin, submission.id, ReviewDecision::Rejected, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn submitting_requires_enrollment_and_a_chapter_of_the_course() {
        let f = fixture().await;
        let outsider = user(&f.db, "outsider@example.com", Role::Learner).await;
        let err = f
            .workflow
            .submit_link(
                &outsider,
                outsider.user_id,
                f.course_id,
                f.chapter_id,
                "https://github.com/o/p",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = f
            .workflow
            .submit_link(
                &f.learner,
                f.learner.user_id,
                f.course_id,
                Uuid::new_v4(),
                "https://github.com/me/p",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
    #[tokio::test]
    async fn only_the_latest_submission_can_be_updated() {
        let f = fixture().await;
        let v1 = f.submit("https://github.com/me/v1").await.unwrap();
        f.workflow
            .review(&f.admin, v1.id, ReviewDecision::Rejected, Some("Start over"))
            .await
            .unwrap();
        let v2 = f.submit("https://github.com/me/v2").await.unwrap();

        let err = f
            .workflow
            .update_submission(&f.learner, v1.id, "https://github.com/me/v1-fixed")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        assert_eq!(
            f.db.get_submission(v1.id).await.unwrap().status,
            SubmissionStatus::Rejected
        );
        match f
            .workflow
            .get_status(&f.learner, f.learner.user_id, f.course_id, f.chapter_id)
            .await
            .unwrap()
        {
            SubmissionState::Submitted(latest) => {
                assert_eq!(latest.id, v2.id);
                assert_eq!(latest.status, SubmissionStatus::Pending);
            }
            SubmissionState::NotSubmitted => panic!("expected a submission"),
        }
        let queue = f
            .workflow
            .review_queue(
                &f.mentor,
                &ReviewQueueFilter {
                    status: Some(SubmissionStatus::Pending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(queue.iter().map(|s| s.id).collect::<Vec<_>>(), vec![v2.id]);

        // An accepted newer submission closes the chapter for good.
        f.workflow
            .review(&f.admin, v2.id, ReviewDecision::Accepted, None)
            .await
            .unwrap();
        let err = f
            .workflow
            .update_submission(&f.learner, v1.id, "https://github.com/me/v1-again")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn history_lists_newest_first() {
        let f = fixture().await;
        let v1 = f.submit("https://github.com/me/v1").await.unwrap();
        let v2 = f.submit("https://github.com/me/v2").await.unwrap();
        let history = f
            .workflow
            .list_for_user(&f.learner, f.learner.user_id)
            .await
            .unwrap();
        assert_eq!(
            history.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![v2.id, v1.id]
        );
    }

    /// Delegates to `InMemoryDatabase`, failing chosen writes with `Storage`.
    #[derive(Default)]
    struct FlakyDatabase {
        inner: InMemoryDatabase,
        fail_progress_writes: AtomicBool,
        fail_reviews: AtomicBool,
    }

    fn storage_down() -> CoreError {
        CoreError::Storage("connection reset".to_string())
    }

    #[async_trait]
    impl DatabaseService for FlakyDatabase {
        async fn create_user_with_email(
            &self,
            email: &str,
            name: &str,
            hashed_password: &str,
            role: Role,
        ) -> CoreResult<User> {
            self.inner
                .create_user_with_email(email, name, hashed_password, role)
                .await
        }
        async fn get_user_by_email(&self, email: &str) -> CoreResult<UserCredentials> {
            self.inner.get_user_by_email(email).await
        }
        async fn get_user(&self, user_id: Uuid) -> CoreResult<User> {
            self.inner.get_user(user_id).await
        }
        async fn list_users(&self) -> CoreResult<Vec<User>> {
            self.inner.list_users().await
        }
        async fn set_user_role(&self, user_id: Uuid, role: Role) -> CoreResult<User> {
            self.inner.set_user_role(user_id, role).await
        }
        async fn set_user_suspended(&self, user_id: Uuid, suspended: bool) -> CoreResult<User> {
            self.inner.set_user_suspended(user_id, suspended).await
        }
        async fn create_auth_session(
            &self,
            session_id: &str,
            user_id: Uuid,
            expires_at: DateTime<Utc>,
        ) -> CoreResult<()> {
            self.inner
                .create_auth_session(session_id, user_id, expires_at)
                .await
        }
        async fn validate_auth_session(&self, session_id: &str) -> CoreResult<Uuid> {
            self.inner.validate_auth_session(session_id).await
        }
        async fn delete_auth_session(&self, session_id: &str) -> CoreResult<()> {
            self.inner.delete_auth_session(session_id).await
        }
        async fn create_course(&self, title: &str, description: &str) -> CoreResult<Course> {
            self.inner.create_course(title, description).await
        }
        async fn get_course(&self, course_id: Uuid) -> CoreResult<Course> {
            self.inner.get_course(course_id).await
        }
        async fn list_courses(&self) -> CoreResult<Vec<Course>> {
            self.inner.list_courses().await
        }
        async fn delete_course(&self, course_id: Uuid) -> CoreResult<()> {
            self.inner.delete_course(course_id).await
        }
        async fn add_chapter(
            &self,
            course_id: Uuid,
            title: &str,
            position: i32,
        ) -> CoreResult<Chapter> {
            self.inner.add_chapter(course_id, title, position).await
        }
        async fn get_chapter(&self, chapter_id: Uuid) -> CoreResult<Chapter> {
            self.inner.get_chapter(chapter_id).await
        }
        async fn list_chapters(&self, course_id: Uuid) -> CoreResult<Vec<Chapter>> {
            self.inner.list_chapters(course_id).await
        }
        async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<()> {
            self.inner.enroll(user_id, course_id).await
        }
        async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<bool> {
            self.inner.unenroll(user_id, course_id).await
        }
        async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<bool> {
            self.inner.is_enrolled(user_id, course_id).await
        }
        async fn list_enrolled_courses(&self, user_id: Uuid) -> CoreResult<Vec<Course>> {
            self.inner.list_enrolled_courses(user_id).await
        }
        async fn get_progress(
            &self,
            user_id: Uuid,
            course_id: Uuid,
        ) -> CoreResult<Option<Progress>> {
            self.inner.get_progress(user_id, course_id).await
        }
        async fn record_chapter_progress(
            &self,
            user_id: Uuid,
            course_id: Uuid,
            chapter_id: Uuid,
            is_completed: bool,
        ) -> CoreResult<Progress> {
            if self.fail_progress_writes.load(Ordering::SeqCst) {
                return Err(storage_down());
            }
            self.inner
                .record_chapter_progress(user_id, course_id, chapter_id, is_completed)
                .await
        }
        async fn create_submission(
            &self,
            user_id: Uuid,
            course_id: Uuid,
            chapter_id: Uuid,
            link: &str,
        ) -> CoreResult<Submission> {
            self.inner
                .create_submission(user_id, course_id, chapter_id, link)
                .await
        }
        async fn resubmit(&self, submission_id: Uuid, link: &str) -> CoreResult<Submission> {
            self.inner.resubmit(submission_id, link).await
        }
        async fn get_submission(&self, submission_id: Uuid) -> CoreResult<Submission> {
            self.inner.get_submission(submission_id).await
        }
        async fn latest_submission(
            &self,
            user_id: Uuid,
            course_id: Uuid,
            chapter_id: Uuid,
        ) -> CoreResult<Option<Submission>> {
            self.inner
                .latest_submission(user_id, course_id, chapter_id)
                .await
        }
        async fn assign_mentor(
            &self,
            submission_id: Uuid,
            mentor_id: Uuid,
        ) -> CoreResult<Submission> {
            self.inner.assign_mentor(submission_id, mentor_id).await
        }
        async fn record_review(
            &self,
            submission_id: Uuid,
            expected_mentor: Option<Uuid>,
            reviewer_id: Uuid,
            decision: ReviewDecision,
            comment: Option<&str>,
        ) -> CoreResult<Submission> {
            if self.fail_reviews.load(Ordering::SeqCst) {
                return Err(storage_down());
            }
            self.inner
                .record_review(submission_id, expected_mentor, reviewer_id, decision, comment)
                .await
        }
        async fn list_submissions_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Submission>> {
            self.inner.list_submissions_for_user(user_id).await
        }
        async fn list_review_queue(
            &self,
            filter: &ReviewQueueFilter,
        ) -> CoreResult<Vec<Submission>> {
            self.inner.list_review_queue(filter).await
        }
    }

    #[tokio::test]
    async fn failed_acceptance_leaves_submission_reviewable_and_progress_untouched() {
        let db = Arc::new(FlakyDatabase::default());
        let events = Arc::new(CollectingEventPublisher::new());
        let ledger = EnrollmentLedger::new(db.clone(), events.clone());
        let tracker = ProgressTracker::new(db.clone(), ledger.clone());
        let validator = ChapterValidator::new(db.clone(), ledger.clone(), tracker.clone());
        let workflow = SubmissionWorkflow::new(db.clone(), ledger.clone(), validator, events.clone());

        let learner = user(&db.inner, "learner@example.com", Role::Learner).await;
        let admin = user(&db.inner, "admin@example.com", Role::Admin).await;
        let course = db.create_course("Web", "").await.unwrap();
        let chapter = db.add_chapter(course.id, "Project", 1).await.unwrap();
        ledger
            .enroll(&learner, learner.user_id, course.id)
            .await
            .unwrap();
        let submission = workflow
            .submit_link(
                &learner,
                learner.user_id,
                course.id,
                chapter.id,
                "https://github.com/me/project",
            )
            .await
            .unwrap();

        // The accepting write fails as a whole.
        db.fail_reviews.store(true, Ordering::SeqCst);
        let err = workflow
            .review(&admin, submission.id, ReviewDecision::Accepted, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(
            db.get_submission(submission.id).await.unwrap().status,
            SubmissionStatus::Pending
        );
        assert_eq!(db.get_progress(learner.user_id, course.id).await.unwrap(), None);
        assert!(!events.names().contains(&"ChapterAccepted"));

        // Acceptance does not depend on a separate progress write.
        db.fail_reviews.store(false, Ordering::SeqCst);
        db.fail_progress_writes.store(true, Ordering::SeqCst);
        let accepted = workflow
            .review(&admin, submission.id, ReviewDecision::Accepted, None)
            .await
            .unwrap();
        assert_eq!(accepted.status, SubmissionStatus::Accepted);

        let report = tracker
            .get_progress(&learner, learner.user_id, course.id)
            .await
            .unwrap();
        assert!(report.is_completed(chapter.id));
        assert_eq!(report.current_chapter_id, Some(chapter.id));
        assert_eq!(report.percentage, 100);
    }
}
