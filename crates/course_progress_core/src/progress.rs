//! crates/course_progress_core/src/progress.rs
//!
//! The Progress Tracker owns the per-(user, course) progress record: the
//! chapter the learner is on and the set of chapters they have completed.
//! Completed chapters are only ever added, so the percentage for a fixed
//! course never decreases.

use crate::access::Actor;
use crate::domain::{Chapter, Progress, ProgressReport};
use crate::enrollment::EnrollmentLedger;
use crate::error::{CoreError, CoreResult};
use crate::ports::DatabaseService;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// `round(100 * completed / total)` with halves rounded up, 0 for an empty course.
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((200 * completed + total) / (2 * total)) as u8
}

/// Builds the caller-facing view of a progress record. Without a record the
/// learner is on the first chapter with nothing completed.
pub fn build_report(
    user_id: Uuid,
    course_id: Uuid,
    chapters: &[Chapter],
    progress: Option<&Progress>,
) -> ProgressReport {
    let completed_chapters: Vec<Uuid> = match progress {
        Some(p) => chapters
            .iter()
            .filter(|c| p.completed_chapters.contains(&c.id))
            .map(|c| c.id)
            .collect(),
        None => Vec::new(),
    };
    let current_chapter_id = progress
        .map(|p| p.current_chapter_id)
        .or_else(|| chapters.first().map(|c| c.id));

    ProgressReport {
        user_id,
        course_id,
        current_chapter_id,
        percentage: completion_percentage(completed_chapters.len(), chapters.len()),
        completed_chapters,
        total_chapters: chapters.len(),
    }
}

/// Loads the chapter and checks it belongs to the course.
pub(crate) async fn chapter_of_course(
    db: &dyn DatabaseService,
    course_id: Uuid,
    chapter_id: Uuid,
) -> CoreResult<Chapter> {
    let chapter = db.get_chapter(chapter_id).await?;
    if chapter.course_id != course_id {
        return Err(CoreError::NotFound(format!(
            "Chapter {} not found in course {}",
            chapter_id, course_id
        )));
    }
    Ok(chapter)
}

#[derive(Clone)]
pub struct ProgressTracker {
    db: Arc<dyn DatabaseService>,
    ledger: EnrollmentLedger,
}

impl ProgressTracker {
    pub fn new(db: Arc<dyn DatabaseService>, ledger: EnrollmentLedger) -> Self {
        Self { db, ledger }
    }

    /// Never fails for a missing record; an unknown course is `NotFound`.
    pub async fn get_progress(
        &self,
        actor: &Actor,
        user_id: Uuid,
        course_id: Uuid,
    ) -> CoreResult<ProgressReport> {
        actor.ensure_self_or_staff(user_id)?;
        self.db.get_course(course_id).await?;
        let chapters = self.db.list_chapters(course_id).await?;
        let progress = self.db.get_progress(user_id, course_id).await?;
        Ok(build_report(user_id, course_id, &chapters, progress.as_ref()))
    }

    /// Moves the learner to `chapter_id`, marking it completed when asked.
    pub async fn record_chapter_progress(
        &self,
        actor: &Actor,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        is_completed: bool,
    ) -> CoreResult<ProgressReport> {
        actor.ensure_self_or_admin(user_id)?;
        self.ledger.ensure_enrolled(user_id, course_id).await?;
        self.apply(user_id, course_id, chapter_id, is_completed)
            .await
    }

    /// The unchecked write shared with the chapter validator. Completing an
    /// already-completed chapter leaves the set unchanged.
    pub(crate) async fn apply(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        chapter_id: Uuid,
        is_completed: bool,
    ) -> CoreResult<ProgressReport> {
        chapter_of_course(self.db.as_ref(), course_id, chapter_id).await?;
        let progress = self
            .db
            .record_chapter_progress(user_id, course_id, chapter_id, is_completed)
            .await?;
        let chapters = self.db.list_chapters(course_id).await?;
        let report = build_report(user_id, course_id, &chapters, Some(&progress));

        info!(
            %user_id,
            %course_id,
            %chapter_id,
            is_completed,
            percentage = report.percentage,
            "Chapter progress recorded"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::events::NoopEventPublisher;
    use crate::memory::InMemoryDatabase;

    #[test]
    fn percentage_rounds_half_up_and_handles_empty_courses() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(0, 3), 0);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(3, 3), 100);
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(1, 200), 1);
        assert_eq!(completion_percentage(1, 201), 0);
    }

    #[test]
    fn percentage_stays_in_range_and_never_decreases() {
        for total in 0..50usize {
            let mut last = 0;
            for completed in 0..=total {
                let pct = completion_percentage(completed, total);
                assert!(pct <= 100);
                assert!(pct >= last);
                last = pct;
            }
        }
    }

    struct Fixture {
        db: Arc<InMemoryDatabase>,
        tracker: ProgressTracker,
        learner: Actor,
        course_id: Uuid,
        chapters: Vec<Uuid>,
    }

    async fn fixture(chapter_count: i32) -> Fixture {
        let db = Arc::new(InMemoryDatabase::new());
        let ledger = EnrollmentLedger::new(db.clone(), Arc::new(NoopEventPublisher));
        let tracker = ProgressTracker::new(db.clone(), ledger.clone());
        let user = db
            .create_user_with_email("kim@example.com", "Kim", "hash", Role::Learner)
            .await
            .unwrap();
        let learner = Actor::new(user.user_id, Role::Learner);
        let course = db.create_course("Compilers", "").await.unwrap();
        let mut chapters = Vec::new();
        for position in 1..=chapter_count {
            let chapter = db
                .add_chapter(course.id, &format!("Chapter {}", position), position)
                .await
                .unwrap();
            chapters.push(chapter.id);
        }
        ledger
            .enroll(&learner, user.user_id, course.id)
            .await
            .unwrap();
        Fixture {
            db,
            tracker,
            learner,
            course_id: course.id,
            chapters,
        }
    }

    #[tokio::test]
    async fn missing_record_reports_first_chapter() {
        let f = fixture(3).await;
        let report = f
            .tracker
            .get_progress(&f.learner, f.learner.user_id, f.course_id)
            .await
            .unwrap();
        assert_eq!(report.current_chapter_id, Some(f.chapters[0]));
        assert!(report.completed_chapters.is_empty());
        assert_eq!(report.percentage, 0);
        assert_eq!(report.total_chapters, 3);
    }

    #[tokio::test]
    async fn empty_course_reports_zero_without_current_chapter() {
        let f = fixture(0).await;
        let report = f
            .tracker
            .get_progress(&f.learner, f.learner.user_id, f.course_id)
            .await
            .unwrap();
        assert_eq!(report.current_chapter_id, None);
        assert_eq!(report.percentage, 0);
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let f = fixture(1).await;
        let err = f
            .tracker
            .get_progress(&f.learner, f.learner.user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn completing_chapters_advances_pointer_and_percentage() {
        let f = fixture(3).await;
        let me = f.learner.user_id;

        let report = f
            .tracker
            .record_chapter_progress(&f.learner, me, f.course_id, f.chapters[0], true)
            .await
            .unwrap();
        assert_eq!(report.current_chapter_id, Some(f.chapters[0]));
        assert_eq!(report.completed_chapters, vec![f.chapters[0]]);
        assert_eq!(report.percentage, 33);

        let report = f
            .tracker
            .record_chapter_progress(&f.learner, me, f.course_id, f.chapters[1], true)
            .await
            .unwrap();
        assert_eq!(report.completed_chapters, vec![f.chapters[0], f.chapters[1]]);
        assert_eq!(report.percentage, 67);
    }

    #[tokio::test]
    async fn visiting_without_completing_moves_only_the_pointer() {
        let f = fixture(3).await;
        let me = f.learner.user_id;

        let report = f
            .tracker
            .record_chapter_progress(&f.learner, me, f.course_id, f.chapters[2], false)
            .await
            .unwrap();
        assert_eq!(report.current_chapter_id, Some(f.chapters[2]));
        assert!(report.completed_chapters.is_empty());
        assert_eq!(report.percentage, 0);
    }

    #[tokio::test]
    async fn recording_the_same_completion_twice_is_idempotent() {
        let f = fixture(2).await;
        let me = f.learner.user_id;
        for _ in 0..2 {
            f.tracker
                .record_chapter_progress(&f.learner, me, f.course_id, f.chapters[1], true)
                .await
                .unwrap();
        }
        let stored = f.db.get_progress(me, f.course_id).await.unwrap().unwrap();
        assert_eq!(stored.completed_chapters.len(), 1);

        let report = f
            .tracker
            .record_chapter_progress(&f.learner, me, f.course_id, f.chapters[0], false)
            .await
            .unwrap();
        assert_eq!(report.completed_chapters, vec![f.chapters[1]]);
        assert_eq!(report.percentage, 50);
    }

    #[tokio::test]
    async fn chapter_from_another_course_is_not_found() {
        let f = fixture(1).await;
        let other = f.db.create_course("Other", "").await.unwrap();
        let foreign = f.db.add_chapter(other.id, "Elsewhere", 1).await.unwrap();

        let err = f
            .tracker
            .record_chapter_progress(&f.learner, f.learner.user_id, f.course_id, foreign.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(f
            .db
            .get_progress(f.learner.user_id, f.course_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn progress_requires_enrollment() {
        let f = fixture(1).await;
        let outsider = f
            .db
            .create_user_with_email("out@example.com", "Out", "hash", Role::Learner)
            .await
            .unwrap();
        let actor = Actor::new(outsider.user_id, Role::Learner);

        let err = f
            .tracker
            .record_chapter_progress(&actor, outsider.user_id, f.course_id, f.chapters[0], true)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn learners_cannot_read_each_others_progress() {
        let f = fixture(1).await;
        let stranger = Actor::new(Uuid::new_v4(), Role::Learner);
        let err = f
            .tracker
            .get_progress(&stranger, f.learner.user_id, f.course_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let mentor = Actor::new(Uuid::new_v4(), Role::Mentor);
        assert!(f
            .tracker
            .get_progress(&mentor, f.learner.user_id, f.course_id)
            .await
            .is_ok());
    }
}
