//! AI tutor endpoints: a quiz helper with per-question-type instructions and
//! a free-form ask endpoint. Both keep their legacy response shapes, so
//! upstream failures answer with the endpoint's own error body rather than
//! the shared envelope.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use log::error;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::shared::state::AppState;

const QUIZBOT_MAX_TOKENS: u32 = 600;
const ASK_MAX_TOKENS: u32 = 300;

/// System instruction matched to the question type being worked on.
pub fn canned_instruction(question_type: &str) -> &'static str {
    match question_type {
        "mcq" => {
            "You are a tutoring assistant that writes multiple-choice \
             questions. Generate a question on the requested topic with \
             exactly four options labeled A-D, exactly one of them correct, \
             and state the correct answer at the end."
        }
        "essay" | "textbox" => {
            "You are a tutoring assistant reviewing a written answer. Give \
             constructive feedback on correctness, structure, and missing \
             points. Do not rewrite the answer for the trainee."
        }
        "code" => {
            "You are a tutoring assistant reviewing code submitted for a \
             coding exercise. Point out bugs, explain what the code actually \
             does, and suggest the smallest fix. Do not write the full \
             solution."
        }
        "logic" => {
            "You are a tutoring assistant for logic and reasoning questions. \
             Walk through the reasoning step by step without revealing the \
             final answer outright."
        }
        _ => {
            "You are a helpful tutoring assistant for an online learning \
             platform. Answer clearly and concisely."
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizbotRequest {
    #[serde(default)]
    question_type: String,
    message: Option<String>,
}

async fn quizbot(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuizbotRequest>,
) -> (StatusCode, Json<Value>) {
    let message = match req.message.filter(|m| !m.trim().is_empty()) {
        Some(m) => m,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "reply": "Message is required." })),
            )
        }
    };
    let instruction = canned_instruction(&req.question_type);
    match state
        .llm
        .complete(instruction, &message, QUIZBOT_MAX_TOKENS)
        .await
    {
        Ok(reply) => (StatusCode::OK, Json(json!({ "reply": reply }))),
        Err(e) => {
            error!("quizbot completion failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "reply": "Error processing quiz or question request." })),
            )
        }
    }
}

const CODE_ASSISTANT_INSTRUCTION: &str =
    "You are a coding assistant for an online learning platform. The trainee \
     shares a question and, when available, the output of their program run. \
     Explain what the output means and how to proceed. Be concise.";

#[derive(Debug, Deserialize)]
struct AskRequest {
    prompt: Option<String>,
    output: Option<String>,
}

/// Joins the prompt with the captured program output into one user message.
fn ask_message(prompt: &str, output: Option<&str>) -> String {
    match output.filter(|o| !o.trim().is_empty()) {
        Some(output) => format!("{}\n\nProgram output:\n{}", prompt, output),
        None => prompt.to_string(),
    }
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> (StatusCode, Json<Value>) {
    let prompt = match req.prompt.filter(|p| !p.trim().is_empty()) {
        Some(p) => p,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Prompt is required." })),
            )
        }
    };
    let message = ask_message(&prompt, req.output.as_deref());
    match state
        .llm
        .complete(CODE_ASSISTANT_INSTRUCTION, &message, ASK_MAX_TOKENS)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(json!({ "response": response }))),
        Err(e) => {
            error!("ask completion failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to get AI response." })),
            )
        }
    }
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/quizbot", post(quizbot))
        .route("/ask", post(ask))
}
