//! crates/course_progress_core/src/access.rs
//!
//! The authenticated caller of a core operation and the role checks the
//! components run before touching storage. The identity itself is supplied
//! by the boundary layer and trusted as-is.

use crate::domain::Role;
use crate::error::{CoreError, CoreResult};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Mentors and admins.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Mentor | Role::Admin)
    }

    pub fn ensure_self(&self, user_id: Uuid) -> CoreResult<()> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(CoreError::Forbidden(
                "operation is only allowed on your own account".to_string(),
            ))
        }
    }

    pub fn ensure_self_or_admin(&self, user_id: Uuid) -> CoreResult<()> {
        if self.is_admin() {
            return Ok(());
        }
        self.ensure_self(user_id)
    }

    pub fn ensure_self_or_staff(&self, user_id: Uuid) -> CoreResult<()> {
        if self.is_staff() {
            return Ok(());
        }
        self.ensure_self(user_id)
    }

    pub fn ensure_staff(&self) -> CoreResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "role {} cannot review submissions",
                self.role
            )))
        }
    }

    pub fn ensure_admin(&self) -> CoreResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Forbidden("admin role required".to_string()))
        }
    }
}
