//! Typed schema for the persisted document.
//!
//! Every record carries an `i64` id generated from the current timestamp in
//! milliseconds. Wire format is camelCase JSON; fields the caller omits fall
//! back to their defaults so the generic collection accessor can build
//! records from partial bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_now() -> DateTime<Utc> {
    Utc::now()
}

fn default_active() -> String {
    "Active".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserRole {
    Admin,
    #[serde(rename = "SME")]
    Sme,
    #[default]
    Trainee,
}

impl UserRole {
    /// Prefix used when generating the human-readable user id.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            UserRole::Admin => "A",
            UserRole::Sme => "S",
            UserRole::Trainee => "T",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserStatus {
    #[default]
    Active,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub user_type: UserRole,
    #[serde(default)]
    pub email: String,
    /// Argon2 hash. Handlers strip this field before responding.
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub date_archived: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Course {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub uploaded_by: String,
    #[serde(default = "default_active")]
    pub status: String,
}

/// Categorized file references attached to a lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LessonContent {
    #[serde(default)]
    pub handout: Option<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub slide_decks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Lesson {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub course_id: i64,
    #[serde(default)]
    pub content: LessonContent,
    #[serde(default)]
    pub uploaded_by: String,
    #[serde(default = "default_now")]
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    #[default]
    Mcq,
    Textbox,
    Code,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Question {
    #[serde(default)]
    pub id: i64,
    /// 1-based position within the assessment.
    #[serde(default)]
    pub question_number: i64,
    #[serde(default)]
    pub question_type: QuestionKind,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub expected_answer: Option<String>,
    #[serde(default)]
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Assessment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub assessment_type: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub course_id: i64,
    #[serde(default)]
    pub lesson_id: i64,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default = "default_now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Assignment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub user_type: UserRole,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub course_title: String,
    #[serde(default)]
    pub status: String,
    /// Percentage string as shown on the dashboard, e.g. "25%".
    #[serde(default)]
    pub progress: String,
    #[serde(default = "default_now")]
    pub assigned_date: DateTime<Utc>,
}

/// Derived completion state for one (trainee, course) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProgressRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub course_id: i64,
    #[serde(default)]
    pub opened_lessons: Vec<i64>,
    #[serde(default)]
    pub opened_assessments: Vec<i64>,
    #[serde(default)]
    pub completion_rate: i64,
    #[serde(default = "default_now")]
    pub last_updated: DateTime<Utc>,
}
