//! `DbAdapter` against a real PostgreSQL. Each test returns early when
//! `DATABASE_URL` is unset, and every test works on freshly created rows, so
//! they can share one database.

use api_lib::adapters::DbAdapter;
use course_progress_core::{
    Course, CoreError, DatabaseService, ReviewDecision, Role, SubmissionStatus, User,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use uuid::Uuid;

async fn adapter() -> Option<Arc<DbAdapter>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .unwrap();
    let adapter = DbAdapter::new(pool);
    adapter.run_migrations().await.unwrap();
    Some(Arc::new(adapter))
}

async fn user(db: &DbAdapter, role: Role) -> User {
    let email = format!("{}@example.com", Uuid::new_v4());
    db.create_user_with_email(&email, "Test", "hash", role)
        .await
        .unwrap()
}

async fn course_with_chapters(db: &DbAdapter, chapters: i32) -> (Course, Vec<Uuid>) {
    let course = db.create_course("Postgres", "").await.unwrap();
    let mut ids = Vec::new();
    for position in 1..=chapters {
        ids.push(db.add_chapter(course.id, "ch", position).await.unwrap().id);
    }
    (course, ids)
}

#[tokio::test]
async fn enroll_and_unenroll_keep_the_count_in_step() {
    let Some(db) = adapter().await else { return };
    let learner = user(&db, Role::Learner).await;
    let (course, _) = course_with_chapters(&db, 1).await;

    db.enroll(learner.user_id, course.id).await.unwrap();
    assert_eq!(db.get_course(course.id).await.unwrap().enrolled_count, 1);

    let err = db.enroll(learner.user_id, course.id).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyEnrolled { .. }));
    assert_eq!(db.get_course(course.id).await.unwrap().enrolled_count, 1);

    assert!(db.unenroll(learner.user_id, course.id).await.unwrap());
    assert!(!db.unenroll(learner.user_id, course.id).await.unwrap());
    assert_eq!(db.get_course(course.id).await.unwrap().enrolled_count, 0);

    let err = db.enroll(learner.user_id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_completions_are_unioned() {
    let Some(db) = adapter().await else { return };
    let learner = user(&db, Role::Learner).await;
    let (course, chapters) = course_with_chapters(&db, 6).await;

    let handles: Vec<_> = chapters
        .iter()
        .map(|&chapter_id| {
            let db = db.clone();
            let user_id = learner.user_id;
            let course_id = course.id;
            tokio::spawn(async move {
                db.record_chapter_progress(user_id, course_id, chapter_id, true)
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Visiting without completing keeps the set.
    let progress = db
        .record_chapter_progress(learner.user_id, course.id, chapters[0], false)
        .await
        .unwrap();
    assert_eq!(progress.current_chapter_id, chapters[0]);
    assert_eq!(progress.completed_chapters.len(), chapters.len());
    assert!(chapters.iter().all(|c| progress.completed_chapters.contains(c)));
}

#[tokio::test]
async fn mentor_assignment_has_one_winner() {
    let Some(db) = adapter().await else { return };
    let learner = user(&db, Role::Learner).await;
    let (course, chapters) = course_with_chapters(&db, 1).await;
    let submission = db
        .create_submission(learner.user_id, course.id, chapters[0], "https://github.com/a/b")
        .await
        .unwrap();

    let mut mentors = Vec::new();
    for _ in 0..6 {
        mentors.push(user(&db, Role::Mentor).await.user_id);
    }
    let handles: Vec<_> = mentors
        .into_iter()
        .map(|mentor_id| {
            let db = db.clone();
            let submission_id = submission.id;
            tokio::spawn(async move { db.assign_mentor(submission_id, mentor_id).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(assigned) => {
                winners += 1;
                assert_eq!(assigned.status, SubmissionStatus::Reviewing);
            }
            Err(CoreError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn accepting_a_review_completes_the_chapter_in_the_same_commit() {
    let Some(db) = adapter().await else { return };
    let learner = user(&db, Role::Learner).await;
    let admin = user(&db, Role::Admin).await;
    let (course, chapters) = course_with_chapters(&db, 2).await;
    let submission = db
        .create_submission(learner.user_id, course.id, chapters[1], "https://github.com/a/b")
        .await
        .unwrap();

    let accepted = db
        .record_review(submission.id, None, admin.user_id, ReviewDecision::Accepted, None)
        .await
        .unwrap();
    assert_eq!(accepted.status, SubmissionStatus::Accepted);
    assert_eq!(accepted.mentor_id, Some(admin.user_id));

    let progress = db
        .get_progress(learner.user_id, course.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.current_chapter_id, chapters[1]);
    assert!(progress.completed_chapters.contains(&chapters[1]));

    let err = db
        .record_review(submission.id, Some(admin.user_id), admin.user_id, ReviewDecision::Rejected, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn only_the_latest_submission_can_be_resubmitted() {
    let Some(db) = adapter().await else { return };
    let learner = user(&db, Role::Learner).await;
    let admin = user(&db, Role::Admin).await;
    let (course, chapters) = course_with_chapters(&db, 1).await;
    let chapter_id = chapters[0];

    let v1 = db
        .create_submission(learner.user_id, course.id, chapter_id, "https://github.com/a/v1")
        .await
        .unwrap();
    db.record_review(v1.id, None, admin.user_id, ReviewDecision::Rejected, None)
        .await
        .unwrap();
    let v2 = db
        .create_submission(learner.user_id, course.id, chapter_id, "https://github.com/a/v2")
        .await
        .unwrap();

    let err = db.resubmit(v1.id, "https://github.com/a/v1b").await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
    assert_eq!(
        db.get_submission(v2.id).await.unwrap().status,
        SubmissionStatus::Pending
    );

    let latest = db
        .latest_submission(learner.user_id, course.id, chapter_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, v2.id);

    let history = db.list_submissions_for_user(learner.user_id).await.unwrap();
    assert_eq!(
        history.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![v2.id, v1.id]
    );

    let updated = db.resubmit(v2.id, "https://github.com/a/v2b").await.unwrap();
    assert_eq!(updated.status, SubmissionStatus::Pending);
    assert_eq!(updated.link, "https://github.com/a/v2b");
}
