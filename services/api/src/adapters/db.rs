//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every mutation is a single statement or a single transaction: completed
//! chapters are unioned in SQL, enrolled counts move inside the same
//! transaction as the membership row, mentor assignment is a conditional
//! UPDATE, and an accepting review commits together with the chapter it
//! completes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_progress_core::domain::{
    Chapter, Course, Progress, ReviewDecision, ReviewQueueFilter, Role, Submission,
    SubmissionStatus, User, UserCredentials,
};
use course_progress_core::error::{CoreError, CoreResult};
use course_progress_core::ports::DatabaseService;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Closes every pooled connection. Called once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Maps constraint violations onto the core's error kinds. Anything else is
/// an unexpected storage failure.
fn db_error(e: sqlx::Error) -> CoreError {
    match &e {
        sqlx::Error::RowNotFound => CoreError::NotFound(e.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CoreError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            CoreError::NotFound(db.message().to_string())
        }
        _ => CoreError::Storage(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    name: String,
    role: String,
    suspended: bool,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> CoreResult<User> {
        Ok(User {
            user_id: self.user_id,
            email: self.email,
            name: self.name,
            role: self.role.parse::<Role>()?,
            suspended: self.suspended,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    description: String,
    enrolled_count: i64,
    chapter_count: i64,
    created_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            title: self.title,
            description: self.description,
            enrolled_count: self.enrolled_count,
            chapter_count: self.chapter_count.max(0) as usize,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ChapterRecord {
    id: Uuid,
    course_id: Uuid,
    title: String,
    position: i32,
}
impl ChapterRecord {
    fn to_domain(self) -> Chapter {
        Chapter {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            position: self.position,
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    user_id: Uuid,
    course_id: Uuid,
    current_chapter_id: Uuid,
    completed_chapters: Vec<Uuid>,
    updated_at: DateTime<Utc>,
}
impl ProgressRecord {
    fn to_domain(self) -> Progress {
        Progress {
            user_id: self.user_id,
            course_id: self.course_id,
            current_chapter_id: self.current_chapter_id,
            completed_chapters: self.completed_chapters.into_iter().collect(),
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SubmissionRecord {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    chapter_id: Uuid,
    link: String,
    status: String,
    mentor_id: Option<Uuid>,
    mentor_comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl SubmissionRecord {
    fn to_domain(self) -> CoreResult<Submission> {
        Ok(Submission {
            id: self.id,
            user_id: self.user_id,
            course_id: self.course_id,
            chapter_id: self.chapter_id,
            link: self.link,
            status: self.status.parse::<SubmissionStatus>()?,
            mentor_id: self.mentor_id,
            mentor_comment: self.mentor_comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "user_id, email, name, role, suspended, created_at";

const COURSE_SELECT: &str = "SELECT c.id, c.title, c.description, c.enrolled_count, c.created_at, \
     (SELECT COUNT(*) FROM chapters ch WHERE ch.course_id = c.id) AS chapter_count \
     FROM courses c";

// One upsert: the conflicting row is locked and the chapter is unioned into
// the stored array, never overwritten from a stale read.
// Binds: $1 user, $2 course, $3 chapter, $4 is_completed.
const PROGRESS_UPSERT: &str = "INSERT INTO progress (user_id, course_id, current_chapter_id, completed_chapters) \
     VALUES ($1, $2, $3, CASE WHEN $4 THEN ARRAY[$3]::UUID[] ELSE '{}'::UUID[] END) \
     ON CONFLICT (user_id, course_id) DO UPDATE SET \
         current_chapter_id = EXCLUDED.current_chapter_id, \
         completed_chapters = CASE \
             WHEN $4 AND NOT ($3 = ANY(progress.completed_chapters)) \
             THEN array_append(progress.completed_chapters, $3) \
             ELSE progress.completed_chapters END, \
         updated_at = NOW() \
     RETURNING user_id, course_id, current_chapter_id, completed_chapters, updated_at";

const SUBMISSION_COLUMNS: &str = "id, user_id, course_id, chapter_id, link, status, mentor_id, \
     mentor_comment, created_at, updated_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users ---

    async fn create_user_with_email(
        &self,
        email: &str,
        name: &str,
        hashed_password: &str,
        role: Role,
    ) -> CoreResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (user_id, email, name, hashed_password, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(hashed_password)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        record.to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> CoreResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| CoreError::NotFound(format!("User with email {} not found", email)))?;
        Ok(UserCredentials {
            user_id: record.user_id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn get_user(&self, user_id: Uuid) -> CoreResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| CoreError::NotFound(format!("User {} not found", user_id)))?
        .to_domain()
    }

    async fn list_users(&self) -> CoreResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users ORDER BY created_at ASC, email ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        records.into_iter().map(UserRecord::to_domain).collect()
    }

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> CoreResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET role = $2 WHERE user_id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| CoreError::NotFound(format!("User {} not found", user_id)))?
        .to_domain()
    }

    async fn set_user_suspended(&self, user_id: Uuid, suspended: bool) -> CoreResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET suspended = $2 WHERE user_id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(suspended)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| CoreError::NotFound(format!("User {} not found", user_id)))?
        .to_domain()
    }

    // --- Auth Sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> CoreResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> CoreResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(CoreError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1 OR expires_at <= NOW()")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    // --- Catalog ---

    async fn create_course(&self, title: &str, description: &str) -> CoreResult<Course> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO courses (id, title, description) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(title)
            .bind(description)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        self.get_course(id).await
    }

    async fn get_course(&self, course_id: Uuid) -> CoreResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!("{} WHERE c.id = $1", COURSE_SELECT))
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or_else(|| CoreError::NotFound(format!("Course {} not found", course_id)))?;
        Ok(record.to_domain())
    }

    async fn list_courses(&self) -> CoreResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "{} ORDER BY c.created_at ASC, c.title ASC",
            COURSE_SELECT
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_course(&self, course_id: Uuid) -> CoreResult<()> {
        // Chapters, enrollments, progress and submissions cascade in the schema.
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Course {} not found", course_id)));
        }
        Ok(())
    }

    async fn add_chapter(
        &self,
        course_id: Uuid,
        title: &str,
        position: i32,
    ) -> CoreResult<Chapter> {
        let record = sqlx::query_as::<_, ChapterRecord>(
            "INSERT INTO chapters (id, course_id, title, position) VALUES ($1, $2, $3, $4) \
             RETURNING id, course_id, title, position",
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(title)
        .bind(position)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_error(e) {
            CoreError::Conflict(_) => CoreError::Conflict(format!(
                "Course {} already has a chapter at position {}",
                course_id, position
            )),
            CoreError::NotFound(_) => {
                CoreError::NotFound(format!("Course {} not found", course_id))
            }
            other => other,
        })?;
        Ok(record.to_domain())
    }

    async fn get_chapter(&self, chapter_id: Uuid) -> CoreResult<Chapter> {
        let record = sqlx::query_as::<_, ChapterRecord>(
            "SELECT id, course_id, title, position FROM chapters WHERE id = $1",
        )
        .bind(chapter_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| CoreError::NotFound(format!("Chapter {} not found", chapter_id)))?;
        Ok(record.to_domain())
    }

    async fn list_chapters(&self, course_id: Uuid) -> CoreResult<Vec<Chapter>> {
        let records = sqlx::query_as::<_, ChapterRecord>(
            "SELECT id, course_id, title, position FROM chapters \
             WHERE course_id = $1 ORDER BY position ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Enrollment ---

    async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Locks the course row until commit, serialising concurrent enrollments.
        let bumped = sqlx::query("UPDATE courses SET enrolled_count = enrolled_count + 1 WHERE id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if bumped.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Course {} not found", course_id)));
        }

        let inserted = sqlx::query(
            "INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match db_error(e) {
            CoreError::NotFound(_) => CoreError::NotFound(format!("User {} not found", user_id)),
            other => other,
        })?;
        if inserted.rows_affected() == 0 {
            // Dropping the transaction rolls the increment back.
            return Err(CoreError::AlreadyEnrolled { user_id, course_id });
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let course = sqlx::query_scalar::<_, Uuid>("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(course_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        if course.is_none() {
            return Err(CoreError::NotFound(format!("Course {} not found", course_id)));
        }

        let removed = sqlx::query("DELETE FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if removed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE courses SET enrolled_count = enrolled_count - 1 \
             WHERE id = $1 AND enrolled_count > 0",
        )
        .bind(course_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(true)
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn list_enrolled_courses(&self, user_id: Uuid) -> CoreResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "{} JOIN enrollments e ON e.course_id = c.id WHERE e.user_id = $1 ORDER BY c.title ASC",
            COURSE_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Progress ---

    async fn get_progress(&self, user_id: Uuid, course_id: Uuid) -> CoreResult<Option<Progress>> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT user_id, course_id, current_chapter_id, completed_chapters, updated_at \
             FROM progress WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn record_chapter_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        is_completed: bool,
    ) -> CoreResult<Progress> {
        let record = sqlx::query_as::<_, ProgressRecord>(PROGRESS_UPSERT)
            .bind(user_id)
            .bind(course_id)
            .bind(chapter_id)
            .bind(is_completed)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(record.to_domain())
    }

    // --- Submissions ---

    async fn create_submission(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        link: &str,
    ) -> CoreResult<Submission> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            "UPDATE submissions SET status = 'SUPERSEDED', updated_at = NOW() \
             WHERE user_id = $1 AND course_id = $2 AND chapter_id = $3 \
               AND status IN ('PENDING', 'REVIEWING')",
        )
        .bind(user_id)
        .bind(course_id)
        .bind(chapter_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let record = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "INSERT INTO submissions (id, user_id, course_id, chapter_id, link, status) \
             VALUES ($1, $2, $3, $4, $5, 'PENDING') RETURNING {}",
            SUBMISSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(course_id)
        .bind(chapter_id)
        .bind(link)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        record.to_domain()
    }

    async fn resubmit(&self, submission_id: Uuid, link: &str) -> CoreResult<Submission> {
        // The "is it still the latest" check and the write are one statement.
        // A racing insert of a newer sibling is caught by the partial unique
        // index on actionable submissions.
        let record = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "UPDATE submissions s SET link = $2, status = 'PENDING', mentor_id = NULL, \
                 mentor_comment = NULL, updated_at = NOW() \
             WHERE s.id = $1 AND s.status NOT IN ('ACCEPTED', 'SUPERSEDED') \
               AND NOT EXISTS ( \
                   SELECT 1 FROM submissions n \
                   WHERE n.user_id = s.user_id AND n.course_id = s.course_id \
                     AND n.chapter_id = s.chapter_id \
                     AND (n.created_at, n.id) > (s.created_at, s.id)) \
             RETURNING {}",
            SUBMISSION_COLUMNS
        ))
        .bind(submission_id)
        .bind(link)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match record {
            Some(record) => record.to_domain(),
            None => {
                let current = self.get_submission(submission_id).await?;
                Err(CoreError::Conflict(if current.status.allows_resubmission() {
                    format!(
                        "Submission {} has been replaced by a newer submission",
                        submission_id
                    )
                } else {
                    format!(
                        "Submission {} is {} and cannot be resubmitted",
                        submission_id, current.status
                    )
                }))
            }
        }
    }

    async fn get_submission(&self, submission_id: Uuid) -> CoreResult<Submission> {
        sqlx::query_as::<_, SubmissionRecord>(&format!(
            "SELECT {} FROM submissions WHERE id = $1",
            SUBMISSION_COLUMNS
        ))
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| CoreError::NotFound(format!("Submission {} not found", submission_id)))?
        .to_domain()
    }

    async fn latest_submission(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
    ) -> CoreResult<Option<Submission>> {
        let record = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "SELECT {} FROM submissions \
             WHERE user_id = $1 AND course_id = $2 AND chapter_id = $3 \
             ORDER BY created_at DESC, id DESC LIMIT 1",
            SUBMISSION_COLUMNS
        ))
        .bind(user_id)
        .bind(course_id)
        .bind(chapter_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        record.map(SubmissionRecord::to_domain).transpose()
    }

    async fn assign_mentor(&self, submission_id: Uuid, mentor_id: Uuid) -> CoreResult<Submission> {
        // Compare-and-set on `mentor_id IS NULL`: of two racing mentors,
        // exactly one UPDATE matches the row.
        let record = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "UPDATE submissions SET mentor_id = $2, status = 'REVIEWING', updated_at = NOW() \
             WHERE id = $1 AND mentor_id IS NULL AND status = 'PENDING' RETURNING {}",
            SUBMISSION_COLUMNS
        ))
        .bind(submission_id)
        .bind(mentor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match record {
            Some(record) => record.to_domain(),
            None => {
                self.get_submission(submission_id).await?;
                Err(CoreError::Conflict(format!(
                    "Submission {} is already assigned or no longer pending",
                    submission_id
                )))
            }
        }
    }

    async fn record_review(
        &self,
        submission_id: Uuid,
        expected_mentor: Option<Uuid>,
        reviewer_id: Uuid,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> CoreResult<Submission> {
        let status = SubmissionStatus::from(decision);
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let record = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "UPDATE submissions SET status = $3, mentor_comment = $4, \
                 mentor_id = COALESCE(mentor_id, $5), updated_at = NOW() \
             WHERE id = $1 AND status IN ('PENDING', 'REVIEWING') \
               AND mentor_id IS NOT DISTINCT FROM $2 RETURNING {}",
            SUBMISSION_COLUMNS
        ))
        .bind(submission_id)
        .bind(expected_mentor)
        .bind(status.as_str())
        .bind(comment)
        .bind(reviewer_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let Some(record) = record else {
            tx.rollback().await.map_err(db_error)?;
            self.get_submission(submission_id).await?;
            return Err(CoreError::Conflict(format!(
                "Submission {} changed state before the review was recorded",
                submission_id
            )));
        };

        // Acceptance and the completed chapter commit together.
        if status == SubmissionStatus::Accepted {
            sqlx::query(PROGRESS_UPSERT)
                .bind(record.user_id)
                .bind(record.course_id)
                .bind(record.chapter_id)
                .bind(true)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        record.to_domain()
    }

    async fn list_submissions_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Submission>> {
        let records = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "SELECT {} FROM submissions WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            SUBMISSION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        records.into_iter().map(SubmissionRecord::to_domain).collect()
    }

    async fn list_review_queue(&self, filter: &ReviewQueueFilter) -> CoreResult<Vec<Submission>> {
        let records = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "SELECT {} FROM submissions \
             WHERE ($1::TEXT IS NULL OR status = $1) \
               AND ($2::UUID IS NULL OR mentor_id = $2) \
               AND ($3::UUID IS NULL OR course_id = $3) \
             ORDER BY created_at ASC",
            SUBMISSION_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.mentor_id)
        .bind(filter.course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        records.into_iter().map(SubmissionRecord::to_domain).collect()
    }
}
