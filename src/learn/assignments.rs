//! Course assignments: which trainee is enrolled in which course, with the
//! coarse status/progress labels shown on the admin dashboard.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::shared::errors::ApiError;
use crate::shared::state::AppState;
use crate::shared::utils::next_record_id;
use crate::store::models::{Assignment, UserRole};
use crate::store::Document;

/// Appends an assignment unless the (trainee, course title) pair already
/// exists.
pub fn assign_course(doc: &mut Document, assignment: Assignment) -> Result<Assignment, ApiError> {
    let duplicate = doc
        .assigned
        .iter()
        .any(|a| a.user_id == assignment.user_id && a.course_title == assignment.course_title);
    if duplicate {
        return Err(ApiError::Conflict(
            "Course already assigned to this trainee.".to_string(),
        ));
    }
    doc.assigned.push(assignment.clone());
    Ok(assignment)
}

async fn list_assignments(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let assigned = state.store.read(|doc| doc.assigned.clone()).await;
    Ok(Json(json!(assigned)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignCourseRequest {
    user_id: Option<String>,
    full_name: Option<String>,
    user_type: Option<UserRole>,
    email: Option<String>,
    course_id: Option<i64>,
    course_title: Option<String>,
    status: Option<String>,
    progress: Option<String>,
}

async fn create_assignment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssignCourseRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (user_id, course_title) = match (req.user_id, req.course_title) {
        (Some(u), Some(c)) if !u.trim().is_empty() && !c.trim().is_empty() => (u, c),
        _ => {
            return Err(ApiError::Validation(
                "userId and courseTitle are required.".to_string(),
            ))
        }
    };
    let assignment = Assignment {
        id: next_record_id(),
        user_id,
        full_name: req.full_name.unwrap_or_default(),
        user_type: req.user_type.unwrap_or_default(),
        email: req.email.unwrap_or_default(),
        course_id: req.course_id,
        course_title,
        status: req.status.unwrap_or_else(|| "Not Started".to_string()),
        progress: req.progress.unwrap_or_else(|| "0%".to_string()),
        assigned_date: chrono::Utc::now(),
    };
    let created = state
        .store
        .mutate(|doc| assign_course(doc, assignment))
        .await?;
    info!(
        "course '{}' assigned to {}",
        created.course_title, created.user_id
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "assignment": created })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAssignmentRequest {
    course_id: Option<i64>,
    course_title: Option<String>,
    status: Option<String>,
    progress: Option<String>,
}

/// Updates one of the trainee's assignments, selected by courseId when given
/// and by courseTitle otherwise.
async fn update_assignment(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateAssignmentRequest>,
) -> Result<Json<Value>, ApiError> {
    let updated = state
        .store
        .mutate(|doc| {
            if !doc.assigned.iter().any(|a| a.user_id == user_id) {
                return Err(ApiError::NotFound("Trainee not found.".to_string()));
            }
            let assignment = doc
                .assigned
                .iter_mut()
                .find(|a| {
                    a.user_id == user_id
                        && match (req.course_id, &req.course_title) {
                            (Some(id), _) => a.course_id == Some(id),
                            (None, Some(title)) => &a.course_title == title,
                            (None, None) => true,
                        }
                })
                .ok_or_else(|| {
                    ApiError::NotFound("Course not assigned to this trainee.".to_string())
                })?;
            if let Some(course_id) = req.course_id {
                assignment.course_id = Some(course_id);
            }
            if let Some(course_title) = req.course_title {
                assignment.course_title = course_title;
            }
            if let Some(status) = req.status {
                assignment.status = status;
            }
            if let Some(progress) = req.progress {
                assignment.progress = progress;
            }
            Ok::<_, ApiError>(assignment.clone())
        })
        .await?;
    Ok(Json(json!({ "success": true, "assignment": updated })))
}

/// Unassigns by database id.
async fn delete_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = crate::collections::parse_record_id(&id)?;
    state
        .store
        .mutate(|doc| {
            if crate::collections::delete_in(&mut doc.assigned, id) == 0 {
                return Err(ApiError::NotFound("Assignment not found.".to_string()));
            }
            Ok(())
        })
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Assignment removed successfully."
    })))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/assigned", get(list_assignments).post(create_assignment))
        .route(
            "/api/assigned/:userId",
            put(update_assignment).delete(delete_assignment),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn assignment(user_id: &str, course_title: &str) -> Assignment {
        Assignment {
            id: next_record_id(),
            user_id: user_id.into(),
            full_name: "Jo".into(),
            user_type: UserRole::Trainee,
            email: "jo@x.io".into(),
            course_id: Some(1),
            course_title: course_title.into(),
            status: "Not Started".into(),
            progress: "0%".into(),
            assigned_date: Utc::now(),
        }
    }

    #[test]
    fn duplicate_assignment_is_a_conflict() {
        let mut doc = Document::default();
        assign_course(&mut doc, assignment("T1001", "Rust")).expect("first");
        let err = assign_course(&mut doc, assignment("T1001", "Rust")).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(doc.assigned.len(), 1);
    }

    #[test]
    fn same_course_for_another_trainee_is_fine() {
        let mut doc = Document::default();
        assign_course(&mut doc, assignment("T1001", "Rust")).expect("first");
        assign_course(&mut doc, assignment("T1002", "Rust")).expect("second");
        assign_course(&mut doc, assignment("T1001", "Go")).expect("third");
        assert_eq!(doc.assigned.len(), 3);
    }
}
