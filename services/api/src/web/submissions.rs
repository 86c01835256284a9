//! services/api/src/web/submissions.rs
//!
//! Project submission endpoints: learners submit and revise links, mentors
//! claim and review them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use course_progress_core::{Actor, ReviewDecision, ReviewQueueFilter, SubmissionStatus};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::dto::{
    AssignRequest, ReviewQueueQuery, ReviewRequest, SubmissionResponse, SubmissionStatusResponse,
    SubmitLinkRequest, TargetUserQuery,
};
use crate::web::learning::target_user;
use crate::web::state::AppState;

/// Submit a project link for a chapter. Replaces any unreviewed submission.
#[utoipa::path(
    post,
    path = "/courses/{course_id}/chapters/{chapter_id}/submissions",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("chapter_id" = Uuid, Path, description = "Chapter ID")
    ),
    request_body = SubmitLinkRequest,
    responses(
        (status = 201, description = "Submission received", body = SubmissionResponse),
        (status = 400, description = "Link is not an http(s) URL", body = ErrorBody),
        (status = 403, description = "Not enrolled", body = ErrorBody),
        (status = 404, description = "Chapter not in course", body = ErrorBody)
    )
)]
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SubmitLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = state
        .core
        .submissions
        .submit_link(&actor, actor.user_id, course_id, chapter_id, &req.link)
        .await?;
    Ok((StatusCode::CREATED, Json(SubmissionResponse::from(submission))))
}

/// Latest submission for a chapter, or `NOT_SUBMITTED`.
#[utoipa::path(
    get,
    path = "/courses/{course_id}/chapters/{chapter_id}/submission",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("chapter_id" = Uuid, Path, description = "Chapter ID"),
        TargetUserQuery
    ),
    responses(
        (status = 200, description = "Submission status", body = SubmissionStatusResponse),
        (status = 404, description = "Chapter not in course", body = ErrorBody)
    )
)]
pub async fn submission_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<SubmissionStatusResponse>, ApiError> {
    let user_id = target_user(&actor, &query);
    let status = state
        .core
        .submissions
        .get_status(&actor, user_id, course_id, chapter_id)
        .await?;
    Ok(Json(status.into()))
}

/// Replace the link of one's own submission; it goes back to `PENDING`.
#[utoipa::path(
    put,
    path = "/submissions/{submission_id}",
    params(("submission_id" = Uuid, Path, description = "Submission ID")),
    request_body = SubmitLinkRequest,
    responses(
        (status = 200, description = "Submission updated", body = SubmissionResponse),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 409, description = "Already accepted or superseded", body = ErrorBody)
    )
)]
pub async fn update_submission_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(submission_id): Path<Uuid>,
    Json(req): Json<SubmitLinkRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission = state
        .core
        .submissions
        .update_submission(&actor, submission_id, &req.link)
        .await?;
    Ok(Json(submission.into()))
}

/// Every submission the user has made, newest first.
#[utoipa::path(
    get,
    path = "/me/submissions",
    params(TargetUserQuery),
    responses((status = 200, description = "Submissions", body = [SubmissionResponse]))
)]
pub async fn my_submissions_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<TargetUserQuery>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let user_id = target_user(&actor, &query);
    let submissions = state.core.submissions.list_for_user(&actor, user_id).await?;
    Ok(Json(submissions.into_iter().map(Into::into).collect()))
}

/// The mentor review queue, oldest first.
#[utoipa::path(
    get,
    path = "/submissions/queue",
    params(ReviewQueueQuery),
    responses(
        (status = 200, description = "Matching submissions", body = [SubmissionResponse]),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 403, description = "Caller is not a mentor or admin", body = ErrorBody)
    )
)]
pub async fn review_queue_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ReviewQueueQuery>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<SubmissionStatus>)
        .transpose()?;
    let filter = ReviewQueueFilter {
        status,
        mentor_id: query.mentor_id,
        course_id: query.course_id,
    };
    let submissions = state.core.submissions.review_queue(&actor, &filter).await?;
    Ok(Json(submissions.into_iter().map(Into::into).collect()))
}

/// Claim a pending submission. Admins may assign it to another mentor.
#[utoipa::path(
    post,
    path = "/submissions/{submission_id}/assign",
    params(("submission_id" = Uuid, Path, description = "Submission ID")),
    request_body = AssignRequest,
    responses(
        (status = 200, description = "Submission is now under review", body = SubmissionResponse),
        (status = 403, description = "Not allowed to assign", body = ErrorBody),
        (status = 409, description = "Already claimed or no longer pending", body = ErrorBody)
    )
)]
pub async fn assign_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(submission_id): Path<Uuid>,
    body: Option<Json<AssignRequest>>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let mentor_id = req.mentor_id.unwrap_or(actor.user_id);
    let submission = state
        .core
        .submissions
        .assign(&actor, submission_id, mentor_id)
        .await?;
    Ok(Json(submission.into()))
}

/// Record a review decision. Accepting completes the chapter.
#[utoipa::path(
    post,
    path = "/submissions/{submission_id}/review",
    params(("submission_id" = Uuid, Path, description = "Submission ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = SubmissionResponse),
        (status = 400, description = "Unknown decision", body = ErrorBody),
        (status = 403, description = "Not the assigned mentor", body = ErrorBody),
        (status = 409, description = "Already reviewed", body = ErrorBody)
    )
)]
pub async fn review_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(submission_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let decision: ReviewDecision = req.decision.parse()?;
    let submission = state
        .core
        .submissions
        .review(&actor, submission_id, decision, req.comment.as_deref())
        .await?;
    Ok(Json(submission.into()))
}
