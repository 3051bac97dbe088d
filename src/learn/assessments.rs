//! Assessment authoring: assessments are created empty, questions are
//! appended one at a time, and every change is mirrored into a JSON snapshot
//! under the uploads tree for download.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::shared::errors::ApiError;
use crate::shared::state::AppState;
use crate::shared::utils::{file_timestamp, next_record_id, sanitize_title};
use crate::store::models::{Assessment, Question, QuestionKind};
use crate::store::write_json_atomic;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAssessmentRequest {
    title: Option<String>,
    #[serde(rename = "type")]
    assessment_type: Option<String>,
    difficulty: Option<String>,
    course_id: Option<Value>,
    lesson_id: Option<Value>,
    duration: Option<String>,
    deadline: Option<String>,
}

/// Ids arrive as either numbers or strings depending on the client form.
fn value_as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

async fn write_snapshot(state: &AppState, file_name: &str, assessment: &Assessment) {
    let path = state.config.storage.assessments_dir().join(file_name);
    let body = json!({ "assessments": [assessment] });
    // The document itself is already persisted; a failed snapshot only
    // degrades the download copy.
    if let Err(e) = write_json_atomic(&path, &body).await {
        warn!("assessment snapshot failed for {}: {}", file_name, e);
    }
}

async fn create_assessment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAssessmentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (title, assessment_type, difficulty) = match (req.title, req.assessment_type, req.difficulty) {
        (Some(t), Some(ty), Some(d)) if !t.trim().is_empty() => (t, ty, d),
        _ => return Err(ApiError::Validation("Missing required fields.".to_string())),
    };
    let course_id = req
        .course_id
        .as_ref()
        .and_then(value_as_id)
        .ok_or_else(|| ApiError::Validation("Missing required fields.".to_string()))?;
    let lesson_id = req
        .lesson_id
        .as_ref()
        .and_then(value_as_id)
        .ok_or_else(|| ApiError::Validation("Missing required fields.".to_string()))?;

    let assessment = Assessment {
        id: next_record_id(),
        title,
        assessment_type,
        difficulty,
        course_id,
        lesson_id,
        duration: req.duration,
        deadline: req.deadline,
        questions: Vec::new(),
        created_at: chrono::Utc::now(),
    };
    let created = state
        .store
        .mutate(|doc| {
            doc.assessments.push(assessment.clone());
            Ok::<_, ApiError>(assessment.clone())
        })
        .await?;

    let file_name = format!("{}_{}.json", sanitize_title(&created.title), file_timestamp());
    write_snapshot(&state, &file_name, &created).await;
    info!("assessment created: {} ({})", created.title, created.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "assessment": created,
            "filePath": format!("/uploads/assessments/{}", file_name),
        })),
    ))
}

async fn list_assessments(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let assessments = state.store.read(|doc| doc.assessments.clone()).await;
    Ok(Json(json!(assessments)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendQuestionRequest {
    assessment_id: Option<Value>,
    question_number: Option<i64>,
    #[serde(default)]
    question_type: QuestionKind,
    question: Option<String>,
    /// MCQ options arrive JSON-encoded inside a string field.
    options: Option<String>,
    answer: Option<String>,
    expected_answer: Option<String>,
    points: Option<i64>,
}

async fn append_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AppendQuestionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let assessment_id = req
        .assessment_id
        .as_ref()
        .and_then(value_as_id)
        .ok_or_else(|| ApiError::Validation("Missing required fields.".to_string()))?;
    let question_text = req
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Missing required fields.".to_string()))?;

    let options = match (req.question_type, req.options) {
        (QuestionKind::Mcq, Some(raw)) => serde_json::from_str::<Vec<String>>(&raw)
            .map_err(|_| ApiError::Validation("Invalid options format.".to_string()))?,
        _ => Vec::new(),
    };
    let answer = match req.question_type {
        QuestionKind::Mcq => req.answer,
        _ => None,
    };
    let expected_answer = match req.question_type {
        QuestionKind::Textbox | QuestionKind::Code => req.expected_answer,
        QuestionKind::Mcq => None,
    };

    let updated = state
        .store
        .mutate(|doc| {
            let assessment = doc
                .assessments
                .iter_mut()
                .find(|a| a.id == assessment_id)
                .ok_or_else(|| ApiError::NotFound("Assessment not found.".to_string()))?;
            let question = Question {
                id: next_record_id(),
                question_number: req
                    .question_number
                    .unwrap_or(assessment.questions.len() as i64 + 1),
                question_type: req.question_type,
                question: question_text,
                options,
                answer,
                expected_answer,
                points: req.points.unwrap_or(0),
            };
            assessment.questions.push(question);
            Ok::<_, ApiError>(assessment.clone())
        })
        .await?;

    let file_name = format!("{}.json", sanitize_title(&updated.title));
    write_snapshot(&state, &file_name, &updated).await;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "assessment": updated })),
    ))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/assessments",
            get(list_assessments).post(create_assessment),
        )
        .route("/api/questions", post(append_question))
}
