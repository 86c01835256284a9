//! crates/course_progress_core/src/enrollment.rs
//!
//! The Enrollment Ledger: which users are enrolled in which courses.
//! Enrollment is the precondition for every learner-driven progress or
//! submission operation.

use crate::access::Actor;
use crate::domain::Course;
use crate::error::{CoreError, CoreResult};
use crate::events::{DomainEvent, EventPublisher};
use crate::ports::DatabaseService;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct EnrollmentLedger {
    db: Arc<dyn DatabaseService>,
    events: Arc<dyn EventPublisher>,
}

impl EnrollmentLedger {
    pub fn new(db: Arc<dyn DatabaseService>, events: Arc<dyn EventPublisher>) -> Self {
        Self { db, events }
    }

    /// Enrolls `user_id` in the course and returns the course with its
    /// updated enrolled count.
    pub async fn enroll(&self, actor: &Actor, user_id: Uuid, course_id: Uuid) -> CoreResult<Course> {
        actor.ensure_self_or_admin(user_id)?;
        self.db.enroll(user_id, course_id).await?;
        info!(%user_id, %course_id, actor = %actor.user_id, "User enrolled in course");

        self.events.publish(DomainEvent::EnrollmentCreated {
            user_id,
            course_id,
            at: Utc::now(),
        });
        self.db.get_course(course_id).await
    }

    /// Returns `false` when the user was not enrolled. Progress and
    /// submissions are kept so a later re-enrollment resumes where it left off.
    pub async fn unenroll(&self, actor: &Actor, user_id: Uuid, course_id: Uuid) -> CoreResult<bool> {
        actor.ensure_self_or_admin(user_id)?;
        let removed = self.db.unenroll(user_id, course_id).await?;
        if removed {
            info!(%user_id, %course_id, actor = %actor.user_id, "User unenrolled from course");
            self.events.publish(DomainEvent::EnrollmentRemoved {
                user_id,
                course_id,
                at: Utc::now(),
            });
        } else {
            debug!(%user_id, %course_id, "Unenroll requested for a user who was not enrolled");
        }
        Ok(removed)
    }

    pub async fn list_enrolled(&self, actor: &Actor, user_id: Uuid) -> CoreResult<Vec<Course>> {
        actor.ensure_self_or_staff(user_id)?;
        self.db.list_enrolled_courses(user_id).await
    }

    pub async fn ensure_enrolled(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<()> {
        if self.db.is_enrolled(user_id, course_id).await? {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "user {} is not enrolled in course {}",
                user_id, course_id
            )))
        }
    }
}
