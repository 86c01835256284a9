//! crates/course_progress_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Users
//=========================================================================================

/// The closed set of roles a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Learner,
    Mentor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Learner => "LEARNER",
            Role::Mentor => "MENTOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a role regardless of case, so rows written as `admin` and `ADMIN`
/// both land on the same variant.
impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEARNER" => Ok(Role::Learner),
            "MENTOR" => Ok(Role::Mentor),
            "ADMIN" => Ok(Role::Admin),
            other => Err(CoreError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

/// A registered user, as seen by the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Catalog
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Number of users whose enrolled set contains this course.
    pub enrolled_count: i64,
    pub chapter_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A chapter belongs to exactly one course; `position` defines the ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

//=========================================================================================
// Progress
//=========================================================================================

/// The stored progress record for one (user, course) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub current_chapter_id: Uuid,
    pub completed_chapters: BTreeSet<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Progress as reported to callers, including the computed percentage.
/// Built from a stored record or, when none exists yet, from the course's
/// first chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub user_id: Uuid,
    pub course_id: Uuid,
    /// `None` only when the course has no chapters.
    pub current_chapter_id: Option<Uuid>,
    /// Completed chapters in course order.
    pub completed_chapters: Vec<Uuid>,
    pub total_chapters: usize,
    pub percentage: u8,
}

impl ProgressReport {
    pub fn is_completed(&self, chapter_id: Uuid) -> bool {
        self.completed_chapters.contains(&chapter_id)
    }
}

//=========================================================================================
// Submissions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionStatus {
    Pending,
    Reviewing,
    Accepted,
    Rejected,
    NeedsRevision,
    /// Replaced by a newer submission for the same chapter. Never reviewable.
    Superseded,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Reviewing => "REVIEWING",
            SubmissionStatus::Accepted => "ACCEPTED",
            SubmissionStatus::Rejected => "REJECTED",
            SubmissionStatus::NeedsRevision => "NEEDS_REVISION",
            SubmissionStatus::Superseded => "SUPERSEDED",
        }
    }

    /// Waiting on a reviewer: at most one per (user, course, chapter).
    pub fn is_actionable(&self) -> bool {
        matches!(self, SubmissionStatus::Pending | SubmissionStatus::Reviewing)
    }

    /// Whether the learner may update the link and restart the review cycle.
    pub fn allows_resubmission(&self) -> bool {
        !matches!(
            self,
            SubmissionStatus::Accepted | SubmissionStatus::Superseded
        )
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(SubmissionStatus::Pending),
            "REVIEWING" => Ok(SubmissionStatus::Reviewing),
            "ACCEPTED" => Ok(SubmissionStatus::Accepted),
            "REJECTED" => Ok(SubmissionStatus::Rejected),
            "NEEDS_REVISION" => Ok(SubmissionStatus::NeedsRevision),
            "SUPERSEDED" => Ok(SubmissionStatus::Superseded),
            other => Err(CoreError::Validation(format!(
                "unknown submission status '{}'",
                other
            ))),
        }
    }
}

/// The outcome a reviewer may record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Accepted,
    Rejected,
    NeedsRevision,
}

impl From<ReviewDecision> for SubmissionStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Accepted => SubmissionStatus::Accepted,
            ReviewDecision::Rejected => SubmissionStatus::Rejected,
            ReviewDecision::NeedsRevision => SubmissionStatus::NeedsRevision,
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<SubmissionStatus>()? {
            SubmissionStatus::Accepted => Ok(ReviewDecision::Accepted),
            SubmissionStatus::Rejected => Ok(ReviewDecision::Rejected),
            SubmissionStatus::NeedsRevision => Ok(ReviewDecision::NeedsRevision),
            other => Err(CoreError::Validation(format!(
                "'{}' is not a review decision",
                other
            ))),
        }
    }
}

/// A learner's work-link attempt for one chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub chapter_id: Uuid,
    pub link: String,
    pub status: SubmissionStatus,
    pub mentor_id: Option<Uuid>,
    pub mentor_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of looking up the latest submission for a chapter.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    NotSubmitted,
    Submitted(Submission),
}

/// Narrows the mentor review queue. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ReviewQueueFilter {
    pub status: Option<SubmissionStatus>,
    pub mentor_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
}

impl ReviewQueueFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.status.map_or(true, |s| submission.status == s)
            && self
                .mentor_id
                .map_or(true, |m| submission.mentor_id == Some(m))
            && self.course_id.map_or(true, |c| submission.course_id == c)
    }
}
