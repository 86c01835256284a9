//! services/api/src/web/courses.rs
//!
//! Catalog endpoints. Reading is open to every authenticated user; changing
//! the catalog is reserved for admins.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use course_progress_core::{Actor, CoreError};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::dto::{ChapterResponse, CourseResponse, CreateChapterRequest, CreateCourseRequest};
use crate::web::state::AppState;

/// List every course in the catalog.
#[utoipa::path(
    get,
    path = "/courses",
    responses((status = 200, description = "All courses", body = [CourseResponse]))
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = state.db.list_courses().await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// Fetch a single course, including its enrolled count.
#[utoipa::path(
    get,
    path = "/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "The course", body = CourseResponse),
        (status = 404, description = "Unknown course", body = ErrorBody)
    )
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseResponse>, ApiError> {
    Ok(Json(state.db.get_course(course_id).await?.into()))
}

/// List a course's chapters in order.
#[utoipa::path(
    get,
    path = "/courses/{course_id}/chapters",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Chapters ordered by position", body = [ChapterResponse]),
        (status = 404, description = "Unknown course", body = ErrorBody)
    )
)]
pub async fn list_chapters_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<ChapterResponse>>, ApiError> {
    state.db.get_course(course_id).await?;
    let chapters = state.db.list_chapters(course_id).await?;
    Ok(Json(chapters.into_iter().map(Into::into).collect()))
}

/// Create a course (admin only).
#[utoipa::path(
    post,
    path = "/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Missing title", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    )
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    actor.ensure_admin()?;
    let title = req.title.trim();
    if title.is_empty() {
        return Err(CoreError::Validation("course title must not be empty".to_string()).into());
    }
    let course = state
        .db
        .create_course(title, req.description.trim())
        .await?;
    info!(course_id = %course.id, admin = %actor.user_id, "Course created");
    Ok((StatusCode::CREATED, Json(CourseResponse::from(course))))
}

/// Delete a course together with its chapters, enrollments, progress and submissions (admin only).
#[utoipa::path(
    delete,
    path = "/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "Unknown course", body = ErrorBody)
    )
)]
pub async fn delete_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(course_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    actor.ensure_admin()?;
    state.db.delete_course(course_id).await?;
    info!(%course_id, admin = %actor.user_id, "Course deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Append a chapter to a course (admin only).
#[utoipa::path(
    post,
    path = "/courses/{course_id}/chapters",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    request_body = CreateChapterRequest,
    responses(
        (status = 201, description = "Chapter created", body = ChapterResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "Unknown course", body = ErrorBody),
        (status = 409, description = "Position already taken", body = ErrorBody)
    )
)]
pub async fn add_chapter_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(course_id): Path<Uuid>,
    Json(req): Json<CreateChapterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    actor.ensure_admin()?;
    let title = req.title.trim();
    if title.is_empty() {
        return Err(CoreError::Validation("chapter title must not be empty".to_string()).into());
    }
    let chapter = state.db.add_chapter(course_id, title, req.position).await?;
    Ok((StatusCode::CREATED, Json(ChapterResponse::from(chapter))))
}
