//! Course and lesson surface: catalog queries with lesson/assessment joins,
//! course creation and cascade deletion, multipart lesson uploads, and the
//! trainee dashboard.

pub mod assessments;
pub mod assignments;

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::collections::parse_record_id;
use crate::file::store_lesson_file;
use crate::shared::errors::ApiError;
use crate::shared::state::AppState;
use crate::shared::utils::next_record_id;
use crate::store::models::{Course, Lesson, LessonContent};
use crate::store::Document;

/// Titles of a course's lessons and assessments, joined for catalog views.
fn course_item_titles(doc: &Document, course_id: i64) -> (Vec<String>, Vec<String>) {
    let lessons = doc
        .lessons
        .iter()
        .filter(|l| l.course_id == course_id)
        .map(|l| l.title.clone())
        .collect();
    let assessments = doc
        .assessments
        .iter()
        .filter(|a| a.course_id == course_id)
        .map(|a| a.title.clone())
        .collect();
    (lessons, assessments)
}

/// Removes a course and everything hanging off it: lessons, assessments,
/// progress records, and assignments pointing at it. Returns the deleted
/// course and the references of files that should be cleaned up.
pub fn delete_course_cascade(doc: &mut Document, course_id: i64) -> Option<(Course, Vec<String>)> {
    let index = doc.courses.iter().position(|c| c.id == course_id)?;
    let course = doc.courses.remove(index);

    let mut file_refs: Vec<String> = Vec::new();
    if let Some(image) = &course.image {
        file_refs.push(image.clone());
    }
    for lesson in doc.lessons.iter().filter(|l| l.course_id == course_id) {
        if let Some(handout) = &lesson.content.handout {
            file_refs.push(handout.clone());
        }
        file_refs.extend(lesson.content.videos.iter().cloned());
        file_refs.extend(lesson.content.slide_decks.iter().cloned());
    }

    doc.lessons.retain(|l| l.course_id != course_id);
    doc.assessments.retain(|a| a.course_id != course_id);
    doc.progress.retain(|p| p.course_id != course_id);
    doc.assigned.retain(|a| a.course_id != Some(course_id));
    Some((course, file_refs))
}

async fn list_courses(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let courses = state
        .store
        .read(|doc| {
            doc.courses
                .iter()
                .map(|course| {
                    let (lessons, assessments) = course_item_titles(doc, course.id);
                    let mut value = serde_json::to_value(course)?;
                    if let Value::Object(map) = &mut value {
                        map.insert("lessons".into(), json!(lessons));
                        map.insert("assessments".into(), json!(assessments));
                    }
                    Ok(value)
                })
                .collect::<Result<Vec<Value>, serde_json::Error>>()
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(Value::Array(courses)))
}

async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_record_id(&id)?;
    let course = state
        .store
        .read(|doc| {
            let course = doc.courses.iter().find(|c| c.id == id)?;
            let lessons: Vec<Lesson> = doc
                .lessons
                .iter()
                .filter(|l| l.course_id == id)
                .cloned()
                .collect();
            let assessments: Vec<_> = doc
                .assessments
                .iter()
                .filter(|a| a.course_id == id)
                .cloned()
                .collect();
            let mut value = serde_json::to_value(course).ok()?;
            if let Value::Object(map) = &mut value {
                map.insert("lessons".into(), serde_json::to_value(lessons).ok()?);
                map.insert(
                    "assessments".into(),
                    serde_json::to_value(assessments).ok()?,
                );
            }
            Some(value)
        })
        .await
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;
    Ok(Json(course))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCourseRequest {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    uploaded_by: Option<String>,
}

async fn create_course(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (title, description) = match (req.title, req.description) {
        (Some(t), Some(d)) if !t.trim().is_empty() && !d.trim().is_empty() => (t, d),
        _ => {
            return Err(ApiError::Validation(
                "Title and description are required.".to_string(),
            ))
        }
    };
    let course = Course {
        id: next_record_id(),
        title,
        description,
        image: req.image,
        created_at: chrono::Utc::now(),
        uploaded_by: req.uploaded_by.unwrap_or_else(|| "S1234".to_string()),
        status: "Active".to_string(),
    };
    let created = state
        .store
        .mutate(|doc| {
            doc.courses.push(course.clone());
            Ok::<_, ApiError>(course.clone())
        })
        .await?;
    info!("course created: {} ({})", created.title, created.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "course": created })),
    ))
}

async fn update_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_record_id(&id)?;
    let updated = state
        .store
        .mutate(|doc| crate::collections::update_in(&mut doc.courses, id, patch))
        .await?;
    Ok(Json(json!({ "success": true, "course": updated })))
}

async fn delete_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_record_id(&id)?;
    let (course, file_refs) = state
        .store
        .mutate(|doc| {
            delete_course_cascade(doc, id)
                .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
        })
        .await?;

    // Upload cleanup is best-effort; a missing file is not an error.
    for reference in file_refs {
        if let Some(path) = state.config.storage.resolve_upload(&reference) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("could not remove {}: {}", path.display(), e);
            }
        }
    }
    info!("course deleted: {} ({})", course.title, course.id);
    Ok(Json(json!({
        "success": true,
        "message": "Course and related data deleted successfully."
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonFilter {
    course_id: Option<String>,
}

async fn list_lessons(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<LessonFilter>,
) -> Result<Json<Value>, ApiError> {
    let course_id = match filter.course_id {
        Some(raw) => Some(parse_record_id(&raw)?),
        None => None,
    };
    let lessons = state
        .store
        .read(|doc| {
            doc.lessons
                .iter()
                .filter(|l| course_id.map_or(true, |id| l.course_id == id))
                .cloned()
                .collect::<Vec<_>>()
        })
        .await;
    Ok(Json(json!(lessons)))
}

async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_record_id(&id)?;
    let lesson = state
        .store
        .read(|doc| doc.lessons.iter().find(|l| l.id == id).cloned())
        .await
        .ok_or_else(|| ApiError::NotFound("Lesson not found".to_string()))?;
    Ok(Json(json!(lesson)))
}

async fn update_lesson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_record_id(&id)?;
    let updated = state
        .store
        .mutate(|doc| crate::collections::update_in(&mut doc.lessons, id, patch))
        .await?;
    Ok(Json(json!({ "success": true, "lesson": updated })))
}

async fn delete_lesson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_record_id(&id)?;
    let lesson = state
        .store
        .mutate(|doc| {
            let index = doc
                .lessons
                .iter()
                .position(|l| l.id == id)
                .ok_or_else(|| ApiError::NotFound("Lesson not found".to_string()))?;
            Ok::<_, ApiError>(doc.lessons.remove(index))
        })
        .await?;

    let mut refs: Vec<String> = lesson.content.handout.into_iter().collect();
    refs.extend(lesson.content.videos);
    refs.extend(lesson.content.slide_decks);
    for reference in refs {
        if let Some(path) = state.config.storage.resolve_upload(&reference) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("could not remove {}: {}", path.display(), e);
            }
        }
    }
    Ok(Json(json!({
        "success": true,
        "message": "Lesson deleted successfully."
    })))
}

/// Multipart lesson upload: text fields describe the lesson, file parts are
/// classified into handout / slide decks / videos.
async fn upload_lesson(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut title: Option<String> = None;
    let mut course_id: Option<String> = None;
    let mut description = String::new();
    let mut uploaded_by = "S1234".to_string();
    let mut content = LessonContent::default();
    let mut file_count = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        if let Some(original) = field.file_name().map(|n| n.to_string()) {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            store_lesson_file(&state.config.storage, &original, &data, &mut content).await?;
            file_count += 1;
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            match field_name.as_str() {
                "lessonTitle" => title = Some(text),
                "lessonCourse" => course_id = Some(text),
                "lessonDesc" => description = text,
                "uploadedBy" => uploaded_by = text,
                _ => {}
            }
        }
    }

    if file_count == 0 {
        return Err(ApiError::Validation("No files uploaded.".to_string()));
    }
    let course_id = course_id
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| ApiError::Validation("Invalid or missing course ID.".to_string()))?;

    let lesson = Lesson {
        id: next_record_id(),
        title: title.unwrap_or_else(|| "Untitled Lesson".to_string()),
        description,
        course_id,
        content,
        uploaded_by,
        uploaded_at: chrono::Utc::now(),
    };
    let created = state
        .store
        .mutate(|doc| {
            if !doc.courses.iter().any(|c| c.id == course_id) {
                return Err(ApiError::Validation(
                    "Invalid or missing course ID.".to_string(),
                ));
            }
            doc.lessons.push(lesson.clone());
            Ok(lesson.clone())
        })
        .await?;
    info!(
        "lesson uploaded: {} ({} files) for course {}",
        created.title, file_count, course_id
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "lesson": created })),
    ))
}

/// Dashboard join for one trainee: each assigned course merged with its
/// progress record.
async fn trainee_courses(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let courses = state
        .store
        .read(|doc| {
            doc.assigned
                .iter()
                .filter(|a| a.user_id == user_id)
                .map(|assignment| {
                    let course = assignment
                        .course_id
                        .and_then(|id| doc.courses.iter().find(|c| c.id == id));
                    let instructor = course.and_then(|c| {
                        doc.users
                            .iter()
                            .find(|u| u.user_id == c.uploaded_by)
                            .map(|u| u.full_name.clone())
                    });
                    let progress = assignment.course_id.and_then(|id| {
                        doc.progress
                            .iter()
                            .find(|p| p.user_id == user_id && p.course_id == id)
                    });
                    json!({
                        "assignment": assignment,
                        "course": course,
                        "instructor": instructor,
                        "completionRate": progress.map_or(0, |p| p.completion_rate),
                    })
                })
                .collect::<Vec<_>>()
        })
        .await;
    Ok(Json(json!({ "success": true, "courses": courses })))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/courses", get(list_courses).post(create_course))
        .route(
            "/api/courses/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/api/lessons", get(list_lessons).post(upload_lesson))
        .route(
            "/api/lessons/:id",
            get(get_lesson).put(update_lesson).delete(delete_lesson),
        )
        .route("/api/trainee/:userId/courses", get(trainee_courses))
        .merge(assessments::configure())
        .merge(assignments::configure())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{Assessment, Assignment, ProgressRecord, UserRole};
    use chrono::Utc;

    fn course(id: i64, title: &str) -> Course {
        Course {
            id,
            title: title.into(),
            description: "desc".into(),
            image: Some(format!("/uploads/courses/{}.png", id)),
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
            content: LessonContent {
                handout: Some(format!("/uploads/lessons/handouts/{}.pdf", id)),
                videos: vec![format!("/uploads/lessons/videos/{}.mp4", id)],
                slide_decks: Vec::new(),
            },
            uploaded_by: "S1234".into(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn cascade_removes_every_dependent_record() {
        let mut doc = Document::default();
        doc.courses.push(course(1, "Rust"));
        doc.courses.push(course(2, "Go"));
        doc.lessons.push(lesson(10, 1));
        doc.lessons.push(lesson(11, 2));
        doc.assessments.push(Assessment {
            id: 20,
            title: "quiz".into(),
            assessment_type: "quiz".into(),
            difficulty: "easy".into(),
            course_id: 1,
            lesson_id: 10,
            duration: None,
            deadline: None,
            questions: Vec::new(),
            created_at: Utc::now(),
        });
        doc.progress.push(ProgressRecord {
            id: 30,
            user_id: "T1001".into(),
            course_id: 1,
            opened_lessons: vec![10],
            opened_assessments: Vec::new(),
            completion_rate: 50,
            last_updated: Utc::now(),
        });
        doc.assigned.push(Assignment {
            id: 40,
            user_id: "T1001".into(),
            full_name: "Jo".into(),
            user_type: UserRole::Trainee,
            email: "jo@x.io".into(),
            course_id: Some(1),
            course_title: "Rust".into(),
            status: "In Progress".into(),
            progress: "50%".into(),
            assigned_date: Utc::now(),
        });

        let (deleted, refs) = delete_course_cascade(&mut doc, 1).expect("cascade");
        assert_eq!(deleted.id, 1);
        assert_eq!(doc.courses.len(), 1);
        assert_eq!(doc.lessons.len(), 1);
        assert!(doc.assessments.is_empty());
        assert!(doc.progress.is_empty());
        assert!(doc.assigned.is_empty());
        // Image, handout, and video references are reported for cleanup.
        assert_eq!(refs.len(), 3);
    }

    #[test]
    fn cascade_on_missing_course_is_none() {
        let mut doc = Document::default();
        assert!(delete_course_cascade(&mut doc, 99).is_none());
    }

    #[test]
    fn item_titles_are_scoped_to_the_course() {
        let mut doc = Document::default();
        doc.courses.push(course(1, "Rust"));
        doc.lessons.push(lesson(10, 1));
        doc.lessons.push(lesson(11, 2));
        let (lessons, assessments) = course_item_titles(&doc, 1);
        assert_eq!(lessons, vec!["lesson-10".to_string()]);
        assert!(assessments.is_empty());
    }
}
