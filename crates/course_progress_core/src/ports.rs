//! crates/course_progress_core/src/ports.rs
//!
//! Defines the storage contract for the application's core logic.
//! This trait forms the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete database.
//!
//! Implementations must make each write below atomic on its own. The
//! components never read-modify-write a record at the application layer.

use crate::domain::{
    Chapter, Course, Progress, ReviewDecision, ReviewQueueFilter, Role, Submission, User,
    UserCredentials,
};
use crate::error::CoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn create_user_with_email(
        &self,
        email: &str,
        name: &str,
        hashed_password: &str,
        role: Role,
    ) -> CoreResult<User>;

    async fn get_user_by_email(&self, email: &str) -> CoreResult<UserCredentials>;

    async fn get_user(&self, user_id: Uuid) -> CoreResult<User>;

    async fn list_users(&self) -> CoreResult<Vec<User>>;

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> CoreResult<User>;

    async fn set_user_suspended(&self, user_id: Uuid, suspended: bool) -> CoreResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> CoreResult<()>;

    /// Returns the owning user, or `Unauthorized` for unknown or expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> CoreResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> CoreResult<()>;

    // --- Catalog ---
    async fn create_course(&self, title: &str, description: &str) -> CoreResult<Course>;

    async fn get_course(&self, course_id: Uuid) -> CoreResult<Course>;

    async fn list_courses(&self) -> CoreResult<Vec<Course>>;

    /// Removes the course with its chapters, enrollments, progress and submissions.
    async fn delete_course(&self, course_id: Uuid) -> CoreResult<()>;

    /// Fails with `Conflict` when the position is already taken in the course.
    async fn add_chapter(&self, course_id: Uuid, title: &str, position: i32)
        -> CoreResult<Chapter>;

    async fn get_chapter(&self, chapter_id: Uuid) -> CoreResult<Chapter>;

    /// Chapters of the course ordered by position.
    async fn list_chapters(&self, course_id: Uuid) -> CoreResult<Vec<Chapter>>;

    // --- Enrollment ---
    /// Adds the membership and increments `enrolled_count` in one transaction.
    /// Fails with `NotFound` for an unknown course and `AlreadyEnrolled` for
    /// an existing membership.
    async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<()>;

    /// Removes the membership and decrements `enrolled_count` in one
    /// transaction. Returns `false` when the user was not enrolled.
    async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<bool>;

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<bool>;

    async fn list_enrolled_courses(&self, user_id: Uuid) -> CoreResult<Vec<Course>>;

    // --- Progress ---
    async fn get_progress(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<Option<Progress>>;

    /// Creates the record or moves its pointer to `chapter_id`, unioning the
    /// chapter into the completed set when `is_completed`. Must be a single
    /// atomic write so concurrent completions never clobber each other.
    async fn record_chapter_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        is_completed: bool,
    ) -> CoreResult<Progress>;

    // --- Submissions ---
    /// Inserts a PENDING submission and marks every other actionable
    /// submission for the same (user, course, chapter) as SUPERSEDED.
    async fn create_submission(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        link: &str,
    ) -> CoreResult<Submission>;

    /// Replaces the link, resets the status to PENDING and clears the
    /// reviewer and comment. Only the latest submission for its
    /// (user, course, chapter) may be resubmitted, checked in the same atomic
    /// step as the write; an older one, or one that is ACCEPTED or
    /// SUPERSEDED, is a `Conflict`.
    async fn resubmit(&self, submission_id: Uuid, link: &str) -> CoreResult<Submission>;

    async fn get_submission(&self, submission_id: Uuid) -> CoreResult<Submission>;

    async fn latest_submission(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
    ) -> CoreResult<Option<Submission>>;

    /// Compare-and-set: succeeds only while the submission is PENDING with
    /// no mentor, moving it to REVIEWING. Otherwise `Conflict` (or `NotFound`).
    async fn assign_mentor(&self, submission_id: Uuid, mentor_id: Uuid) -> CoreResult<Submission>;

    /// Records a decision while the submission is still PENDING or REVIEWING
    /// and its mentor is still `expected_mentor`. An unassigned submission
    /// takes `reviewer_id` as its mentor. Otherwise `Conflict`.
    ///
    /// An ACCEPTED decision also unions the chapter into the author's
    /// progress and moves their pointer to it, atomically with the status
    /// change.
    async fn record_review(
        &self,
        submission_id: Uuid,
        expected_mentor: Option<Uuid>,
        reviewer_id: Uuid,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> CoreResult<Submission>;

    /// Newest first.
    async fn list_submissions_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Submission>>;

    /// Oldest first.
    async fn list_review_queue(&self, filter: &ReviewQueueFilter) -> CoreResult<Vec<Submission>>;
}
