//! Code execution for coding questions: each request gets its own scratch
//! directory, the source is compiled and run through the shell, and the
//! whole run is bounded by a wall-clock timeout.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::shared::errors::ApiError;
use crate::shared::state::AppState;

const EXECUTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Javascript,
    Java,
    Cpp,
}

impl Language {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "python" => Some(Self::Python),
            "javascript" | "js" => Some(Self::Javascript),
            "java" => Some(Self::Java),
            "cpp" | "c++" => Some(Self::Cpp),
            _ => None,
        }
    }

    pub fn source_file(&self) -> &'static str {
        match self {
            Self::Python => "main.py",
            Self::Javascript => "main.js",
            Self::Java => "Main.java",
            Self::Cpp => "main.cpp",
        }
    }

    /// Compile-and-run line executed through `sh -c` inside the scratch
    /// directory.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Python => "python3 main.py",
            Self::Javascript => "node main.js",
            Self::Java => "javac Main.java && java Main",
            Self::Cpp => "g++ main.cpp -o main && ./main",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompileRequest {
    language: Option<String>,
    code: Option<String>,
}

async fn compile(
    State(_state): State<Arc<AppState>>,
    Json(req): Json<CompileRequest>,
) -> Result<Json<Value>, ApiError> {
    let language = req
        .language
        .as_deref()
        .ok_or_else(|| ApiError::Validation("Language and code are required.".to_string()))?;
    let code = req
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Language and code are required.".to_string()))?;
    // Rejected before any file I/O happens.
    let language = Language::parse(language)
        .ok_or_else(|| ApiError::Validation("Unsupported language.".to_string()))?;

    // Scratch directory is removed on drop, success or failure.
    let arena = tempfile::tempdir()
        .map_err(|e| ApiError::Internal(format!("could not create scratch dir: {}", e)))?;
    tokio::fs::write(arena.path().join(language.source_file()), &code)
        .await
        .map_err(|e| ApiError::Internal(format!("could not write source: {}", e)))?;

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(language.command())
        .current_dir(arena.path())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let run = tokio::time::timeout(EXECUTION_TIMEOUT, cmd.output()).await;
    let output = match run {
        Err(_) => {
            info!("execution timed out after {:?}", EXECUTION_TIMEOUT);
            return Ok(Json(json!({
                "success": false,
                "output": "Execution timed out.",
            })));
        }
        Ok(Err(e)) => {
            return Err(ApiError::Internal(format!("could not spawn runner: {}", e)))
        }
        Ok(Ok(output)) => output,
    };

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let text = if stdout.trim().is_empty() {
            "Program finished with exit code 0".to_string()
        } else {
            stdout
        };
        Ok(Json(json!({ "success": true, "output": text })))
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Ok(Json(json!({ "success": false, "output": stderr })))
    }
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route("/api/compile", post(compile))
}
