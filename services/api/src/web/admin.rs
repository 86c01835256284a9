//! services/api/src/web/admin.rs
//!
//! User management for admins.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use course_progress_core::{Actor, CoreError, Role};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::dto::{SetRoleRequest, SetSuspensionRequest, UserResponse};
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    actor.ensure_admin()?;
    let users = state.db.list_users().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Change a user's role. Takes effect on their next request.
#[utoipa::path(
    put,
    path = "/admin/users/{user_id}/role",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserResponse),
        (status = 400, description = "Unknown role", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn set_role_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    actor.ensure_admin()?;
    let role: Role = req.role.parse()?;
    let user = state.db.set_user_role(user_id, role).await?;
    info!(%user_id, %role, admin = %actor.user_id, "User role changed");
    Ok(Json(user.into()))
}

/// Suspend or reinstate a user. Suspended users cannot log in or use existing sessions.
#[utoipa::path(
    put,
    path = "/admin/users/{user_id}/suspension",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = SetSuspensionRequest,
    responses(
        (status = 200, description = "Suspension updated", body = UserResponse),
        (status = 400, description = "Admins cannot suspend themselves", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn set_suspension_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetSuspensionRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    actor.ensure_admin()?;
    if req.suspended && user_id == actor.user_id {
        return Err(CoreError::Validation("admins cannot suspend themselves".to_string()).into());
    }
    let user = state.db.set_user_suspended(user_id, req.suspended).await?;
    info!(%user_id, suspended = req.suspended, admin = %actor.user_id, "User suspension changed");
    Ok(Json(user.into()))
}
