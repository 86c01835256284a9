//! services/api/src/web/learning.rs
//!
//! Enrollment, progress and quiz endpoints. Each handler resolves the target
//! user (the caller unless `?user_id=` names someone else) and delegates to
//! the matching core component, which enforces access rules.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use course_progress_core::Actor;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::dto::{
    CourseResponse, ProgressResponse, QuizScoreRequest, RecordProgressRequest, TargetUserQuery,
    UnenrollResponse,
};
use crate::web::state::AppState;

pub(crate) fn target_user(actor: &Actor, query: &TargetUserQuery) -> Uuid {
    query.user_id.unwrap_or(actor.user_id)
}

/// Enroll in a course. Admins may enroll another user via `?user_id=`.
#[utoipa::path(
    post,
    path = "/courses/{course_id}/enroll",
    params(("course_id" = Uuid, Path, description = "Course ID"), TargetUserQuery),
    responses(
        (status = 201, description = "Enrolled; returns the course with its new count", body = CourseResponse),
        (status = 404, description = "Unknown course or user", body = ErrorBody),
        (status = 409, description = "Already enrolled", body = ErrorBody)
    )
)]
pub async fn enroll_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(course_id): Path<Uuid>,
    Query(query): Query<TargetUserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = target_user(&actor, &query);
    let course = state.core.enrollment.enroll(&actor, user_id, course_id).await?;
    Ok((StatusCode::CREATED, Json(CourseResponse::from(course))))
}

/// Leave a course. Progress and submissions are kept.
#[utoipa::path(
    delete,
    path = "/courses/{course_id}/enroll",
    params(("course_id" = Uuid, Path, description = "Course ID"), TargetUserQuery),
    responses(
        (status = 200, description = "Unenrolled (or was not enrolled)", body = UnenrollResponse),
        (status = 404, description = "Unknown course", body = ErrorBody)
    )
)]
pub async fn unenroll_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(course_id): Path<Uuid>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<UnenrollResponse>, ApiError> {
    let user_id = target_user(&actor, &query);
    let removed = state.core.enrollment.unenroll(&actor, user_id, course_id).await?;
    Ok(Json(UnenrollResponse {
        course_id,
        user_id,
        removed,
    }))
}

/// Courses the user is enrolled in.
#[utoipa::path(
    get,
    path = "/me/courses",
    params(TargetUserQuery),
    responses((status = 200, description = "Enrolled courses", body = [CourseResponse]))
)]
pub async fn my_courses_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let user_id = target_user(&actor, &query);
    let courses = state.core.enrollment.list_enrolled(&actor, user_id).await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// Progress through a course. Never 404s for a learner who has not started.
#[utoipa::path(
    get,
    path = "/courses/{course_id}/progress",
    params(("course_id" = Uuid, Path, description = "Course ID"), TargetUserQuery),
    responses(
        (status = 200, description = "Current progress", body = ProgressResponse),
        (status = 404, description = "Unknown course", body = ErrorBody)
    )
)]
pub async fn get_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(course_id): Path<Uuid>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let user_id = target_user(&actor, &query);
    let report = state
        .core
        .progress
        .get_progress(&actor, user_id, course_id)
        .await?;
    Ok(Json(report.into()))
}

/// Move to a chapter, optionally marking it completed.
#[utoipa::path(
    post,
    path = "/courses/{course_id}/chapters/{chapter_id}/progress",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("chapter_id" = Uuid, Path, description = "Chapter ID")
    ),
    request_body = RecordProgressRequest,
    responses(
        (status = 200, description = "Updated progress", body = ProgressResponse),
        (status = 403, description = "Not enrolled", body = ErrorBody),
        (status = 404, description = "Chapter not in course", body = ErrorBody)
    )
)]
pub async fn record_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<RecordProgressRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let report = state
        .core
        .progress
        .record_chapter_progress(&actor, actor.user_id, course_id, chapter_id, req.is_completed)
        .await?;
    Ok(Json(report.into()))
}

/// Submit a quiz score; 80 or more completes the chapter.
#[utoipa::path(
    post,
    path = "/courses/{course_id}/chapters/{chapter_id}/quiz",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("chapter_id" = Uuid, Path, description = "Chapter ID")
    ),
    request_body = QuizScoreRequest,
    responses(
        (status = 200, description = "Chapter completed", body = ProgressResponse),
        (status = 400, description = "Score outside 0..=100", body = ErrorBody),
        (status = 422, description = "Score below the passing threshold", body = ErrorBody)
    )
)]
pub async fn quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<QuizScoreRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let report = state
        .core
        .validator
        .validate_by_score(&actor, actor.user_id, course_id, chapter_id, req.score)
        .await?;
    Ok(Json(report.into()))
}
