//! Generic collection accessor: list/create/update/delete for any of the
//! document's collections, addressed by name. Specific routes (courses,
//! users, progress, ...) take priority over these; the generic surface keeps
//! the whole document reachable without per-collection boilerplate.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use crate::shared::errors::ApiError;
use crate::shared::state::AppState;
use crate::shared::utils::next_record_id;
use crate::store::{Document, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Users,
    Courses,
    Lessons,
    Assessments,
    Progress,
    Assigned,
}

impl CollectionKind {
    pub fn parse(name: &str) -> Result<Self, ApiError> {
        match name {
            "users" => Ok(Self::Users),
            "courses" => Ok(Self::Courses),
            "lessons" => Ok(Self::Lessons),
            "assessments" => Ok(Self::Assessments),
            "progress" => Ok(Self::Progress),
            "assigned" => Ok(Self::Assigned),
            other => Err(ApiError::NotFound(format!(
                "Unknown collection '{}'.",
                other
            ))),
        }
    }

    pub fn list(&self, doc: &Document) -> Result<Value, ApiError> {
        match self {
            Self::Users => to_json(&doc.users).map(strip_credentials),
            Self::Courses => to_json(&doc.courses),
            Self::Lessons => to_json(&doc.lessons),
            Self::Assessments => to_json(&doc.assessments),
            Self::Progress => to_json(&doc.progress),
            Self::Assigned => to_json(&doc.assigned),
        }
    }

    pub fn create(&self, doc: &mut Document, body: Map<String, Value>) -> Result<Value, ApiError> {
        match self {
            // Registration validates, hashes the credential, and enforces
            // email uniqueness; the schema alone cannot, so the generic
            // surface refuses raw user bodies.
            Self::Users => Err(ApiError::Validation(
                "Use /api/users/add to register users.".to_string(),
            )),
            Self::Courses => create_in(&mut doc.courses, body),
            Self::Lessons => create_in(&mut doc.lessons, body),
            Self::Assessments => create_in(&mut doc.assessments, body),
            Self::Progress => create_in(&mut doc.progress, body),
            Self::Assigned => create_in(&mut doc.assigned, body),
        }
    }

    pub fn update(
        &self,
        doc: &mut Document,
        id: i64,
        patch: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        match self {
            Self::Users => update_in(&mut doc.users, id, patch).map(strip_credentials),
            Self::Courses => update_in(&mut doc.courses, id, patch),
            Self::Lessons => update_in(&mut doc.lessons, id, patch),
            Self::Assessments => update_in(&mut doc.assessments, id, patch),
            Self::Progress => update_in(&mut doc.progress, id, patch),
            Self::Assigned => update_in(&mut doc.assigned, id, patch),
        }
    }

    pub fn delete(&self, doc: &mut Document, id: i64) -> usize {
        match self {
            Self::Users => delete_in(&mut doc.users, id),
            Self::Courses => delete_in(&mut doc.courses, id),
            Self::Lessons => delete_in(&mut doc.lessons, id),
            Self::Assessments => delete_in(&mut doc.assessments, id),
            Self::Progress => delete_in(&mut doc.progress, id),
            Self::Assigned => delete_in(&mut doc.assigned, id),
        }
    }
}

fn to_json<T: serde::Serialize>(items: &[T]) -> Result<Value, ApiError> {
    serde_json::to_value(items).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Removes the credential hash from a serialized user record or array of
/// them. No response surface may carry it.
fn strip_credentials(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            map.remove("password");
        }
        Value::Array(items) => {
            for item in items {
                if let Value::Object(map) = item {
                    map.remove("password");
                }
            }
        }
        _ => {}
    }
    value
}

/// Builds a record from the caller's fields plus a fresh id, validating it
/// through the typed schema. Fields outside the schema are rejected.
pub fn create_in<T: Record>(
    items: &mut Vec<T>,
    mut body: Map<String, Value>,
) -> Result<Value, ApiError> {
    body.insert("id".to_string(), json!(next_record_id()));
    let record: T = serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::Validation(format!("Invalid record body: {}", e)))?;
    let created = serde_json::to_value(&record).map_err(|e| ApiError::Internal(e.to_string()))?;
    items.push(record);
    Ok(created)
}

/// Shallow-merges the patch over the stored record (id is immutable) and
/// re-validates the result against the schema.
pub fn update_in<T: Record>(
    items: &mut Vec<T>,
    id: i64,
    patch: Map<String, Value>,
) -> Result<Value, ApiError> {
    let index = items
        .iter()
        .position(|r| r.id() == id)
        .ok_or_else(|| ApiError::NotFound(format!("Record {} not found.", id)))?;
    let mut merged =
        serde_json::to_value(&items[index]).map_err(|e| ApiError::Internal(e.to_string()))?;
    if let Value::Object(base) = &mut merged {
        for (key, value) in patch {
            if key != "id" {
                base.insert(key, value);
            }
        }
    }
    let record: T = serde_json::from_value(merged.clone())
        .map_err(|e| ApiError::Validation(format!("Invalid record body: {}", e)))?;
    items[index] = record;
    Ok(merged)
}

/// Removes every record matching the id (there should be at most one).
pub fn delete_in<T: Record>(items: &mut Vec<T>, id: i64) -> usize {
    let before = items.len();
    items.retain(|r| r.id() != id);
    before - items.len()
}

pub fn parse_record_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::Validation(format!("Invalid record id '{}'.", raw)))
}

async fn list_collection(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let kind = CollectionKind::parse(&collection)?;
    let data = state.store.read(|doc| kind.list(doc)).await?;
    Ok(Json(data))
}

async fn create_in_collection(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let kind = CollectionKind::parse(&collection)?;
    let created = state.store.mutate(|doc| kind.create(doc, body)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_in_collection(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    Json(patch): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let kind = CollectionKind::parse(&collection)?;
    let id = parse_record_id(&id)?;
    let updated = state
        .store
        .mutate(|doc| kind.update(doc, id, patch))
        .await?;
    Ok(Json(updated))
}

async fn delete_in_collection(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let kind = CollectionKind::parse(&collection)?;
    let id = parse_record_id(&id)?;
    state
        .store
        .mutate(|doc| Ok::<_, ApiError>(kind.delete(doc, id)))
        .await?;
    Ok(Json(json!({
        "message": format!("{} deleted successfully", collection)
    })))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/:collection",
            get(list_collection).post(create_in_collection),
        )
        .route(
            "/api/:collection/:id",
            axum::routing::put(update_in_collection).delete(delete_in_collection),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{Course, User, UserRole, UserStatus};

    fn course_body(title: &str) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("title".into(), json!(title));
        body.insert("description".into(), json!("desc"));
        body
    }

    #[test]
    fn create_assigns_id_and_appends() {
        let mut courses: Vec<Course> = Vec::new();
        let created = create_in(&mut courses, course_body("Intro")).expect("create");
        assert_eq!(courses.len(), 1);
        assert!(created["id"].as_i64().is_some());
        assert_eq!(created["title"], "Intro");
    }

    #[test]
    fn update_merges_and_preserves_id() {
        let mut courses: Vec<Course> = Vec::new();
        let created = create_in(&mut courses, course_body("Intro")).expect("create");
        let id = created["id"].as_i64().expect("id");

        let mut patch = Map::new();
        patch.insert("title".into(), json!("Renamed"));
        patch.insert("id".into(), json!(999));
        let updated = update_in(&mut courses, id, patch).expect("update");
        assert_eq!(updated["title"], "Renamed");
        assert_eq!(updated["description"], "desc");
        assert_eq!(courses[0].id, id);
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let mut courses: Vec<Course> = Vec::new();
        let err = update_in(&mut courses, 42, Map::new()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn delete_removes_all_matches_and_reports_count() {
        let mut courses: Vec<Course> = Vec::new();
        let created = create_in(&mut courses, course_body("Intro")).expect("create");
        let id = created["id"].as_i64().expect("id");
        assert_eq!(delete_in(&mut courses, id), 1);
        assert_eq!(delete_in(&mut courses, id), 0);
    }

    #[test]
    fn listed_users_never_carry_the_credential_hash() {
        let mut doc = Document::default();
        doc.users.push(User {
            id: 1,
            user_id: "T1001".into(),
            full_name: "Jo".into(),
            user_type: UserRole::Trainee,
            email: "jo@x.io".into(),
            password: "$argon2id$v=19$secret-hash".into(),
            created_at: chrono::Utc::now(),
            status: UserStatus::Active,
            date_archived: None,
        });

        let listed = CollectionKind::Users.list(&doc).expect("list");
        let first = listed.as_array().expect("array").first().expect("user");
        assert!(first.get("password").is_none());
        assert_eq!(first["userId"], "T1001");

        let mut patch = Map::new();
        patch.insert("fullName".into(), json!("Joan"));
        let updated = CollectionKind::Users
            .update(&mut doc, 1, patch)
            .expect("update");
        assert!(updated.get("password").is_none());
        // The stored record still holds the hash.
        assert!(!doc.users[0].password.is_empty());
    }

    #[test]
    fn generic_user_creation_is_refused() {
        let mut doc = Document::default();
        let mut body = Map::new();
        body.insert("email".into(), json!("jo@x.io"));
        body.insert("password".into(), json!("plaintext"));
        let err = CollectionKind::Users.create(&mut doc, body).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(doc.users.is_empty());
    }

    #[test]
    fn unknown_collection_is_rejected() {
        assert!(CollectionKind::parse("widgets").is_err());
        assert_eq!(
            CollectionKind::parse("courses").expect("parse"),
            CollectionKind::Courses
        );
    }

    #[test]
    fn create_with_unknown_field_fails_validation() {
        let mut courses: Vec<Course> = Vec::new();
        let mut body = course_body("Intro");
        body.insert("sneaky".into(), json!("field"));
        let err = create_in(&mut courses, body).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(courses.is_empty());
    }

    #[test]
    fn create_with_wrong_type_fails_validation() {
        let mut courses: Vec<Course> = Vec::new();
        let mut body = Map::new();
        body.insert("title".into(), json!(["not", "a", "string"]));
        let err = create_in(&mut courses, body).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(courses.is_empty());
    }
}
