//! services/api/src/web/dto.rs
//!
//! Request and response payloads of the REST API. Domain types never cross
//! the wire directly.

use chrono::{DateTime, Utc};
use course_progress_core::domain::{
    Chapter, Course, ProgressReport, Submission, SubmissionState, User,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    /// One of `LEARNER`, `MENTOR`, `ADMIN`.
    pub role: String,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            name: user.name,
            role: user.role.to_string(),
            suspended: user.suspended,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CourseResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub enrolled_count: i64,
    pub chapter_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            enrolled_count: course.enrolled_count,
            chapter_count: course.chapter_count,
            created_at: course.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChapterResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

impl From<Chapter> for ChapterResponse {
    fn from(chapter: Chapter) -> Self {
        Self {
            id: chapter.id,
            course_id: chapter.course_id,
            title: chapter.title,
            position: chapter.position,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProgressResponse {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub current_chapter_id: Option<Uuid>,
    pub completed_chapters: Vec<Uuid>,
    pub total_chapters: usize,
    pub percentage: u8,
}

impl From<ProgressReport> for ProgressResponse {
    fn from(report: ProgressReport) -> Self {
        Self {
            user_id: report.user_id,
            course_id: report.course_id,
            current_chapter_id: report.current_chapter_id,
            completed_chapters: report.completed_chapters,
            total_chapters: report.total_chapters,
            percentage: report.percentage,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub chapter_id: Uuid,
    pub link: String,
    pub status: String,
    pub mentor_id: Option<Uuid>,
    pub mentor_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            course_id: s.course_id,
            chapter_id: s.chapter_id,
            link: s.link,
            status: s.status.to_string(),
            mentor_id: s.mentor_id,
            mentor_comment: s.mentor_comment,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// `status` is `NOT_SUBMITTED` when the chapter has no submission yet.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionStatusResponse {
    pub status: String,
    pub submission: Option<SubmissionResponse>,
}

impl From<SubmissionState> for SubmissionStatusResponse {
    fn from(state: SubmissionState) -> Self {
        match state {
            SubmissionState::NotSubmitted => Self {
                status: "NOT_SUBMITTED".to_string(),
                submission: None,
            },
            SubmissionState::Submitted(s) => Self {
                status: s.status.to_string(),
                submission: Some(s.into()),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnenrollResponse {
    pub course_id: Uuid,
    pub user_id: Uuid,
    /// `false` when the user was not enrolled in the first place.
    pub removed: bool,
}

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateChapterRequest {
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordProgressRequest {
    pub is_completed: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuizScoreRequest {
    pub score: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitLinkRequest {
    pub link: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AssignRequest {
    /// Defaults to the caller. Only admins may name someone else.
    #[serde(default)]
    pub mentor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    /// One of `ACCEPTED`, `REJECTED`, `NEEDS_REVISION`.
    pub decision: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetSuspensionRequest {
    pub suspended: bool,
}

/// Lets admins and mentors act on another user's records. Defaults to the caller.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TargetUserQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewQueueQuery {
    pub status: Option<String>,
    pub mentor_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
}
