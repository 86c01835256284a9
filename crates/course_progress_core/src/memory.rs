//! crates/course_progress_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. All state sits
//! behind a single async mutex, so every port call is atomic with respect to
//! every other one. Used by the test suites and by the `memory` storage
//! backend of the API service.

use crate::domain::{
    Chapter, Course, Progress, ReviewDecision, ReviewQueueFilter, Role, Submission,
    SubmissionStatus, User, UserCredentials,
};
use crate::error::{CoreError, CoreResult};
use crate::ports::DatabaseService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    password_hashes: HashMap<Uuid, String>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    courses: HashMap<Uuid, Course>,
    chapters: HashMap<Uuid, Chapter>,
    enrollments: HashSet<(Uuid, Uuid)>,
    progress: HashMap<(Uuid, Uuid), Progress>,
    // Insertion order doubles as submission age.
    submissions: Vec<Submission>,
}

impl State {
    fn user(&self, user_id: Uuid) -> CoreResult<&User> {
        self.users
            .get(&user_id)
            .ok_or_else(|| CoreError::NotFound(format!("User {} not found", user_id)))
    }

    fn user_mut(&mut self, user_id: Uuid) -> CoreResult<&mut User> {
        self.users
            .get_mut(&user_id)
            .ok_or_else(|| CoreError::NotFound(format!("User {} not found", user_id)))
    }

    fn course(&self, course_id: Uuid) -> CoreResult<Course> {
        let mut course = self
            .courses
            .get(&course_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Course {} not found", course_id)))?;
        course.chapter_count = self
            .chapters
            .values()
            .filter(|c| c.course_id == course_id)
            .count();
        Ok(course)
    }

    fn submission_mut(&mut self, submission_id: Uuid) -> CoreResult<&mut Submission> {
        self.submissions
            .iter_mut()
            .find(|s| s.id == submission_id)
            .ok_or_else(|| CoreError::NotFound(format!("Submission {} not found", submission_id)))
    }

    /// Moves the progress pointer, unioning the chapter into the completed
    /// set when asked.
    fn upsert_progress(
        &mut self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        is_completed: bool,
        now: DateTime<Utc>,
    ) -> Progress {
        let record = self
            .progress
            .entry((user_id, course_id))
            .or_insert_with(|| Progress {
                user_id,
                course_id,
                current_chapter_id: chapter_id,
                completed_chapters: BTreeSet::new(),
                updated_at: now,
            });
        record.current_chapter_id = chapter_id;
        if is_completed {
            record.completed_chapters.insert(chapter_id);
        }
        record.updated_at = now;
        record.clone()
    }

    fn latest_submission_id(&self, user_id: Uuid, course_id: Uuid, chapter_id: Uuid) -> Option<Uuid> {
        self.submissions
            .iter()
            .rev()
            .find(|s| s.user_id == user_id && s.course_id == course_id && s.chapter_id == chapter_id)
            .map(|s| s.id)
    }

    fn supersede_siblings(&mut self, keep: &Submission, now: DateTime<Utc>) {
        for other in self.submissions.iter_mut().filter(|s| {
            s.id != keep.id
                && s.user_id == keep.user_id
                && s.course_id == keep.course_id
                && s.chapter_id == keep.chapter_id
                && s.status.is_actionable()
        }) {
            other.status = SubmissionStatus::Superseded;
            other.updated_at = now;
        }
    }
}

#[derive(Default)]
pub struct InMemoryDatabase {
    state: Mutex<State>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user_with_email(
        &self,
        email: &str,
        name: &str,
        hashed_password: &str,
        role: Role,
    ) -> CoreResult<User> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(CoreError::Conflict(format!(
                "Email {} is already registered",
                email
            )));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            suspended: false,
            created_at: Utc::now(),
        };
        state
            .password_hashes
            .insert(user.user_id, hashed_password.to_string());
        state.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> CoreResult<UserCredentials> {
        let state = self.state.lock().await;
        let user = state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| CoreError::NotFound(format!("User with email {} not found", email)))?;
        let hashed_password = state
            .password_hashes
            .get(&user.user_id)
            .cloned()
            .unwrap_or_default();
        Ok(UserCredentials {
            user_id: user.user_id,
            email: user.email.clone(),
            hashed_password,
        })
    }

    async fn get_user(&self, user_id: Uuid) -> CoreResult<User> {
        self.state.lock().await.user(user_id).cloned()
    }

    async fn list_users(&self) -> CoreResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| (a.created_at, &a.email).cmp(&(b.created_at, &b.email)));
        Ok(users)
    }

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> CoreResult<User> {
        let mut state = self.state.lock().await;
        let user = state.user_mut(user_id)?;
        user.role = role;
        Ok(user.clone())
    }

    async fn set_user_suspended(&self, user_id: Uuid, suspended: bool) -> CoreResult<User> {
        let mut state = self.state.lock().await;
        let user = state.user_mut(user_id)?;
        user.suspended = suspended;
        Ok(user.clone())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.user(user_id)?;
        state
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> CoreResult<Uuid> {
        let mut state = self.state.lock().await;
        match state.auth_sessions.get(session_id).copied() {
            Some((user_id, expires_at)) if expires_at > Utc::now() => Ok(user_id),
            Some(_) => {
                state.auth_sessions.remove(session_id);
                Err(CoreError::Unauthorized)
            }
            None => Err(CoreError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> CoreResult<()> {
        self.state.lock().await.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn create_course(&self, title: &str, description: &str) -> CoreResult<Course> {
        let course = Course {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            enrolled_count: 0,
            chapter_count: 0,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .await
            .courses
            .insert(course.id, course.clone());
        Ok(course)
    }

    async fn get_course(&self, course_id: Uuid) -> CoreResult<Course> {
        self.state.lock().await.course(course_id)
    }

    async fn list_courses(&self) -> CoreResult<Vec<Course>> {
        let state = self.state.lock().await;
        let mut courses = state
            .courses
            .keys()
            .map(|id| state.course(*id))
            .collect::<CoreResult<Vec<_>>>()?;
        courses.sort_by(|a, b| (a.created_at, &a.title).cmp(&(b.created_at, &b.title)));
        Ok(courses)
    }

    async fn delete_course(&self, course_id: Uuid) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state.courses.remove(&course_id).is_none() {
            return Err(CoreError::NotFound(format!("Course {} not found", course_id)));
        }
        state.chapters.retain(|_, c| c.course_id != course_id);
        state.enrollments.retain(|(_, c)| *c != course_id);
        state.progress.retain(|(_, c), _| *c != course_id);
        state.submissions.retain(|s| s.course_id != course_id);
        Ok(())
    }

    async fn add_chapter(
        &self,
        course_id: Uuid,
        title: &str,
        position: i32,
    ) -> CoreResult<Chapter> {
        let mut state = self.state.lock().await;
        state.course(course_id)?;
        if state
            .chapters
            .values()
            .any(|c| c.course_id == course_id && c.position == position)
        {
            return Err(CoreError::Conflict(format!(
                "Course {} already has a chapter at position {}",
                course_id, position
            )));
        }
        let chapter = Chapter {
            id: Uuid::new_v4(),
            course_id,
            title: title.to_string(),
            position,
        };
        state.chapters.insert(chapter.id, chapter.clone());
        Ok(chapter)
    }

    async fn get_chapter(&self, chapter_id: Uuid) -> CoreResult<Chapter> {
        self.state
            .lock()
            .await
            .chapters
            .get(&chapter_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Chapter {} not found", chapter_id)))
    }

    async fn list_chapters(&self, course_id: Uuid) -> CoreResult<Vec<Chapter>> {
        let state = self.state.lock().await;
        let mut chapters: Vec<Chapter> = state
            .chapters
            .values()
            .filter(|c| c.course_id == course_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| c.position);
        Ok(chapters)
    }

    async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.user(user_id)?;
        if !state.courses.contains_key(&course_id) {
            return Err(CoreError::NotFound(format!("Course {} not found", course_id)));
        }
        if !state.enrollments.insert((user_id, course_id)) {
            return Err(CoreError::AlreadyEnrolled { user_id, course_id });
        }
        if let Some(course) = state.courses.get_mut(&course_id) {
            course.enrolled_count += 1;
        }
        Ok(())
    }

    async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        if !state.courses.contains_key(&course_id) {
            return Err(CoreError::NotFound(format!("Course {} not found", course_id)));
        }
        if !state.enrollments.remove(&(user_id, course_id)) {
            return Ok(false);
        }
        if let Some(course) = state.courses.get_mut(&course_id) {
            course.enrolled_count = (course.enrolled_count - 1).max(0);
        }
        Ok(true)
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .enrollments
            .contains(&(user_id, course_id)))
    }

    async fn list_enrolled_courses(&self, user_id: Uuid) -> CoreResult<Vec<Course>> {
        let state = self.state.lock().await;
        let mut courses = state
            .enrollments
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, c)| state.course(*c))
            .collect::<CoreResult<Vec<_>>>()?;
        courses.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(courses)
    }

    async fn get_progress(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<Option<Progress>> {
        Ok(self
            .state
            .lock()
            .await
            .progress
            .get(&(user_id, course_id))
            .cloned())
    }

    async fn record_chapter_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        is_completed: bool,
    ) -> CoreResult<Progress> {
        let mut state = self.state.lock().await;
        state.course(course_id)?;
        Ok(state.upsert_progress(user_id, course_id, chapter_id, is_completed, Utc::now()))
    }

    async fn create_submission(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        link: &str,
    ) -> CoreResult<Submission> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let submission = Submission {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            chapter_id,
            link: link.to_string(),
            status: SubmissionStatus::Pending,
            mentor_id: None,
            mentor_comment: None,
            created_at: now,
            updated_at: now,
        };
        state.supersede_siblings(&submission, now);
        state.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn resubmit(&self, submission_id: Uuid, link: &str) -> CoreResult<Submission> {
        let mut state = self.state.lock().await;
        let target = state.submission_mut(submission_id)?.clone();
        if !target.status.allows_resubmission() {
            return Err(CoreError::Conflict(format!(
                "Submission {} is {} and cannot be resubmitted",
                submission_id, target.status
            )));
        }
        if state.latest_submission_id(target.user_id, target.course_id, target.chapter_id)
            != Some(submission_id)
        {
            return Err(CoreError::Conflict(format!(
                "Submission {} has been replaced by a newer submission",
                submission_id
            )));
        }

        let submission = state.submission_mut(submission_id)?;
        submission.link = link.to_string();
        submission.status = SubmissionStatus::Pending;
        submission.mentor_id = None;
        submission.mentor_comment = None;
        submission.updated_at = Utc::now();
        Ok(submission.clone())
    }

    async fn get_submission(&self, submission_id: Uuid) -> CoreResult<Submission> {
        self.state
            .lock()
            .await
            .submissions
            .iter()
            .find(|s| s.id == submission_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Submission {} not found", submission_id)))
    }

    async fn latest_submission(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
    ) -> CoreResult<Option<Submission>> {
        Ok(self
            .state
            .lock()
            .await
            .submissions
            .iter()
            .rev()
            .find(|s| s.user_id == user_id && s.course_id == course_id && s.chapter_id == chapter_id)
            .cloned())
    }

    async fn assign_mentor(&self, submission_id: Uuid, mentor_id: Uuid) -> CoreResult<Submission> {
        let mut state = self.state.lock().await;
        let submission = state.submission_mut(submission_id)?;
        if submission.mentor_id.is_some() || submission.status != SubmissionStatus::Pending {
            return Err(CoreError::Conflict(format!(
                "Submission {} is already assigned or no longer pending",
                submission_id
            )));
        }
        submission.mentor_id = Some(mentor_id);
        submission.status = SubmissionStatus::Reviewing;
        submission.updated_at = Utc::now();
        Ok(submission.clone())
    }

    async fn record_review(
        &self,
        submission_id: Uuid,
        expected_mentor: Option<Uuid>,
        reviewer_id: Uuid,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> CoreResult<Submission> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let submission = state.submission_mut(submission_id)?;
        if !submission.status.is_actionable() || submission.mentor_id != expected_mentor {
            return Err(CoreError::Conflict(format!(
                "Submission {} changed state before the review was recorded",
                submission_id
            )));
        }
        submission.status = decision.into();
        submission.mentor_comment = comment.map(str::to_string);
        submission.mentor_id = submission.mentor_id.or(Some(reviewer_id));
        submission.updated_at = now;
        let reviewed = submission.clone();

        // Same lock as the status change: an ACCEPTED row always has its chapter completed.
        if reviewed.status == SubmissionStatus::Accepted {
            state.upsert_progress(
                reviewed.user_id,
                reviewed.course_id,
                reviewed.chapter_id,
                true,
                now,
            );
        }
        Ok(reviewed)
    }

    async fn list_submissions_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Submission>> {
        Ok(self
            .state
            .lock()
            .await
            .submissions
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_review_queue(&self, filter: &ReviewQueueFilter) -> CoreResult<Vec<Submission>> {
        Ok(self
            .state
            .lock()
            .await
            .submissions
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}
