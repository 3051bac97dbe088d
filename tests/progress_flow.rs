//! End-to-end progress flow against a real on-disk store: assign a course,
//! open its items, and verify the derived rate survives a reload.

use chrono::Utc;
use serde_json::json;

use learnserver::learn::assignments::assign_course;
use learnserver::learn::delete_course_cascade;
use learnserver::progress::record_opened;
use learnserver::shared::errors::ApiError;
use learnserver::store::models::{
    Assessment, Assignment, Course, Lesson, LessonContent, UserRole,
};
use learnserver::store::{DocumentStore, StoreError};

fn course(id: i64, title: &str) -> Course {
    Course {
        id,
        title: title.into(),
        description: "desc".into(),
        image: None,
        created_at: Utc::now(),
        uploaded_by: "S1234".into(),
        status: "Active".into(),
    }
}

fn lesson(id: i64, course_id: i64) -> Lesson {
    Lesson {
        id,
        title: format!("lesson-{}", id),
        description: String::new(),
        course_id,
        content: LessonContent::default(),
        uploaded_by: "S1234".into(),
        uploaded_at: Utc::now(),
    }
}

fn assessment(id: i64, course_id: i64) -> Assessment {
    Assessment {
        id,
        title: format!("assessment-{}", id),
        assessment_type: "quiz".into(),
        difficulty: "easy".into(),
        course_id,
        lesson_id: 0,
        duration: None,
        deadline: None,
        questions: Vec::new(),
        created_at: Utc::now(),
    }
}

fn assignment(user_id: &str, course_id: i64, course_title: &str) -> Assignment {
    Assignment {
        id: 1,
        user_id: user_id.into(),
        full_name: "Jo".into(),
        user_type: UserRole::Trainee,
        email: "jo@x.io".into(),
        course_id: Some(course_id),
        course_title: course_title.into(),
        status: "Not Started".into(),
        progress: "0%".into(),
        assigned_date: Utc::now(),
    }
}

#[tokio::test]
async fn progress_accumulates_and_survives_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("database.json");

    {
        let store = DocumentStore::open(&path).await.expect("open");
        store
            .mutate(|doc| {
                doc.courses.push(course(5, "Rust"));
                doc.lessons.push(lesson(41, 5));
                doc.lessons.push(lesson(42, 5));
                doc.assessments.push(assessment(60, 5));
                doc.assessments.push(assessment(61, 5));
                assign_course(doc, assignment("T1001", 5, "Rust"))?;
                Ok::<_, ApiError>(())
            })
            .await
            .expect("seed");

        let progress = store
            .mutate(|doc| Ok::<_, StoreError>(record_opened(doc, "T1001", 5, Some(41), None)))
            .await
            .expect("open lesson");
        assert_eq!(progress.completion_rate, 25);

        let progress = store
            .mutate(|doc| {
                Ok::<_, StoreError>(record_opened(doc, "T1001", 5, Some(42), Some(60)))
            })
            .await
            .expect("open more");
        assert_eq!(progress.completion_rate, 75);
    }

    // A fresh process sees the persisted state.
    let store = DocumentStore::open(&path).await.expect("reopen");
    let progress = store
        .mutate(|doc| Ok::<_, StoreError>(record_opened(doc, "T1001", 5, None, Some(61))))
        .await
        .expect("finish");
    assert_eq!(progress.completion_rate, 100);
    assert_eq!(progress.opened_lessons.len(), 2);
    assert_eq!(progress.opened_assessments.len(), 2);
}

#[tokio::test]
async fn deleting_the_course_drops_its_progress_and_assignment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DocumentStore::open(dir.path().join("database.json"))
        .await
        .expect("open");
    store
        .mutate(|doc| {
            doc.courses.push(course(5, "Rust"));
            doc.lessons.push(lesson(41, 5));
            assign_course(doc, assignment("T1001", 5, "Rust"))?;
            record_opened(doc, "T1001", 5, Some(41), None);
            Ok::<_, ApiError>(())
        })
        .await
        .expect("seed");

    store
        .mutate(|doc| {
            delete_course_cascade(doc, 5)
                .map(|_| ())
                .ok_or_else(|| ApiError::NotFound("Course not found".into()))
        })
        .await
        .expect("cascade");

    let remaining = store
        .read(|doc| {
            json!({
                "courses": doc.courses.len(),
                "lessons": doc.lessons.len(),
                "progress": doc.progress.len(),
                "assigned": doc.assigned.len(),
            })
        })
        .await;
    assert_eq!(
        remaining,
        json!({ "courses": 0, "lessons": 0, "progress": 0, "assigned": 0 })
    );
}
