//! Progress engine: per-(trainee, course) completion state derived from
//! opened-item markers.
//!
//! The completion rate is always recomputed from the course's current lesson
//! and assessment counts rather than cached, so content added to or removed
//! from a course retroactively shifts every trainee's percentage.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::shared::errors::ApiError;
use crate::shared::state::AppState;
use crate::shared::utils::next_record_id;
use crate::store::models::ProgressRecord;
use crate::store::Document;

/// round(100 * opened / total), or 0 when the course has no items. Capped at
/// 100: opened markers can outlive their items when a lesson or assessment
/// is deleted from the course.
pub fn completion_rate(opened: usize, total: usize) -> i64 {
    if total == 0 {
        0
    } else {
        (((opened as f64 * 100.0) / total as f64).round() as i64).min(100)
    }
}

fn course_item_total(doc: &Document, course_id: i64) -> usize {
    let lessons = doc.lessons.iter().filter(|l| l.course_id == course_id).count();
    let assessments = doc
        .assessments
        .iter()
        .filter(|a| a.course_id == course_id)
        .count();
    lessons + assessments
}

/// Fetches the (userId, courseId) record, creating an empty one lazily.
fn get_or_init<'a>(doc: &'a mut Document, user_id: &str, course_id: i64) -> &'a mut ProgressRecord {
    let index = doc
        .progress
        .iter()
        .position(|p| p.user_id == user_id && p.course_id == course_id);
    let index = match index {
        Some(i) => i,
        None => {
            doc.progress.push(ProgressRecord {
                id: next_record_id(),
                user_id: user_id.to_string(),
                course_id,
                opened_lessons: Vec::new(),
                opened_assessments: Vec::new(),
                completion_rate: 0,
                last_updated: Utc::now(),
            });
            doc.progress.len() - 1
        }
    };
    &mut doc.progress[index]
}

/// Marks a lesson and/or assessment as opened (set semantics: re-opening is
/// a no-op) and recomputes the completion rate. Supplying neither id is a
/// valid call that still recomputes and bumps `lastUpdated`.
pub fn record_opened(
    doc: &mut Document,
    user_id: &str,
    course_id: i64,
    lesson_id: Option<i64>,
    assessment_id: Option<i64>,
) -> ProgressRecord {
    let total = course_item_total(doc, course_id);
    let record = get_or_init(doc, user_id, course_id);
    if let Some(id) = lesson_id {
        if !record.opened_lessons.contains(&id) {
            record.opened_lessons.push(id);
        }
    }
    if let Some(id) = assessment_id {
        if !record.opened_assessments.contains(&id) {
            record.opened_assessments.push(id);
        }
    }
    let opened = record.opened_lessons.len() + record.opened_assessments.len();
    record.completion_rate = completion_rate(opened, total);
    record.last_updated = Utc::now();
    record.clone()
}

async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, course_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let course_id = crate::collections::parse_record_id(&course_id)?;
    // Reading also initializes the record lazily and refreshes the derived
    // rate, so it persists like any other mutation.
    let progress = state
        .store
        .mutate(|doc| {
            Ok::<_, ApiError>(record_opened(doc, &user_id, course_id, None, None))
        })
        .await?;
    Ok(Json(json!({ "success": true, "progress": progress })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProgressRequest {
    user_id: Option<String>,
    course_id: Option<i64>,
    lesson_id: Option<i64>,
    assessment_id: Option<i64>,
}

async fn update_progress(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<Json<Value>, ApiError> {
    let (user_id, course_id) = match (req.user_id, req.course_id) {
        (Some(u), Some(c)) => (u, c),
        _ => {
            return Err(ApiError::Validation(
                "userId and courseId required.".to_string(),
            ))
        }
    };
    let progress = state
        .store
        .mutate(|doc| {
            Ok::<_, ApiError>(record_opened(
                doc,
                &user_id,
                course_id,
                req.lesson_id,
                req.assessment_id,
            ))
        })
        .await?;
    Ok(Json(json!({ "success": true, "progress": progress })))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/progress/update", post(update_progress))
        .route("/api/progress/:userId/:courseId", get(get_progress))
}
