//! Account registration and the archive lifecycle. Users are soft-deleted
//! into an archive first; permanent removal only applies to archived
//! accounts.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use log::info;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::shared::errors::ApiError;
use crate::shared::state::AppState;
use crate::shared::utils::next_record_id;
use crate::store::models::{User, UserRole, UserStatus};
use crate::store::Document;

/// Role prefix plus a four-digit number, re-rolled until unused.
pub fn generate_user_id(doc: &Document, role: UserRole) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let candidate = format!("{}{}", role.id_prefix(), rng.gen_range(1000..10000));
        if !doc.users.iter().any(|u| u.user_id == candidate) {
            return candidate;
        }
    }
}

/// Appends a new account unless the email is already taken
/// (case-insensitive).
pub fn register_user(
    doc: &mut Document,
    full_name: String,
    user_type: UserRole,
    email: String,
    password_hash: String,
) -> Result<User, ApiError> {
    if doc
        .users
        .iter()
        .any(|u| u.email.eq_ignore_ascii_case(&email))
    {
        return Err(ApiError::Conflict("Email already registered.".to_string()));
    }
    let user = User {
        id: next_record_id(),
        user_id: generate_user_id(doc, user_type),
        full_name,
        user_type,
        email,
        password: password_hash,
        created_at: Utc::now(),
        status: UserStatus::Active,
        date_archived: None,
    };
    doc.users.push(user.clone());
    Ok(user)
}

/// Soft-deletes an account. Archiving an already-archived user is rejected.
pub fn archive_account(doc: &mut Document, user_id: &str) -> Result<User, ApiError> {
    let user = doc
        .users
        .iter_mut()
        .find(|u| u.user_id == user_id)
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    if user.status == UserStatus::Archived {
        return Err(ApiError::Validation(
            "User is already archived.".to_string(),
        ));
    }
    user.status = UserStatus::Archived;
    user.date_archived = Some(Utc::now());
    Ok(user.clone())
}

/// Brings an archived account back. Restoring a non-archived user is
/// rejected.
pub fn restore_account(doc: &mut Document, user_id: &str) -> Result<User, ApiError> {
    let user = doc
        .users
        .iter_mut()
        .find(|u| u.user_id == user_id)
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    if user.status != UserStatus::Archived {
        return Err(ApiError::Validation("User is not archived.".to_string()));
    }
    user.status = UserStatus::Active;
    user.date_archived = None;
    Ok(user.clone())
}

/// Restores every archived account, clearing the archive timestamps.
pub fn restore_all_accounts(doc: &mut Document) -> usize {
    let mut count = 0usize;
    for user in doc
        .users
        .iter_mut()
        .filter(|u| u.status == UserStatus::Archived)
    {
        user.status = UserStatus::Active;
        user.date_archived = None;
        count += 1;
    }
    count
}

fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

/// Serialized user with the password hash stripped.
fn safe_user(user: &User) -> Value {
    let mut value = serde_json::to_value(user).unwrap_or_default();
    if let Value::Object(map) = &mut value {
        map.remove("password");
    }
    value
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddUserRequest {
    full_name: Option<String>,
    user_type: Option<UserRole>,
    email: Option<String>,
    password: Option<String>,
}

async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (full_name, user_type, email, password) =
        match (req.full_name, req.user_type, req.email, req.password) {
            (Some(n), Some(t), Some(e), Some(p))
                if !n.trim().is_empty() && !e.trim().is_empty() && !p.is_empty() =>
            {
                (n, t, e, p)
            }
            _ => {
                return Err(ApiError::Validation(
                    "All fields are required: fullName, userType, email, password.".to_string(),
                ))
            }
        };
    let password = hash_password(&password)?;

    let created = state
        .store
        .mutate(|doc| register_user(doc, full_name, user_type, email, password))
        .await?;
    info!("user registered: {}", created.user_id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": safe_user(&created) })),
    ))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .read(|doc| {
            doc.users
                .iter()
                .find(|u| u.user_id == user_id && u.status == UserStatus::Active)
                .cloned()
        })
        .await
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    Ok(Json(json!({ "success": true, "user": safe_user(&user) })))
}

/// Generic patch by database id; the human-readable userId stays immutable.
async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(mut patch): Json<serde_json::Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let id = crate::collections::parse_record_id(&user_id)?;
    patch.remove("userId");
    if let Some(plain) = patch.get("password").and_then(|p| p.as_str()) {
        let hashed = hash_password(plain)?;
        patch.insert("password".to_string(), json!(hashed));
    }
    let updated = state
        .store
        .mutate(|doc| {
            let merged = crate::collections::update_in(&mut doc.users, id, patch)?;
            let user: User = serde_json::from_value(merged)
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok::<_, ApiError>(user)
        })
        .await?;
    Ok(Json(json!({ "success": true, "user": safe_user(&updated) })))
}

async fn list_archived(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let archived = state
        .store
        .read(|doc| {
            doc.users
                .iter()
                .filter(|u| u.status == UserStatus::Archived)
                .map(safe_user)
                .collect::<Vec<_>>()
        })
        .await;
    Ok(Json(json!(archived)))
}

async fn archive_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let archived = state
        .store
        .mutate(|doc| archive_account(doc, &user_id))
        .await?;
    info!("user archived: {}", archived.user_id);
    Ok(Json(json!({
        "success": true,
        "message": "User archived successfully.",
        "user": safe_user(&archived),
    })))
}

async fn restore_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let restored = state
        .store
        .mutate(|doc| restore_account(doc, &user_id))
        .await?;
    info!("user restored: {}", restored.user_id);
    Ok(Json(json!({
        "success": true,
        "message": "User restored successfully.",
        "user": safe_user(&restored),
    })))
}

async fn restore_all(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let count = state
        .store
        .mutate(|doc| Ok::<_, ApiError>(restore_all_accounts(doc)))
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} users restored.", count),
    })))
}

/// Permanent removal; only archived accounts are eligible.
async fn delete_archived(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .mutate(|doc| {
            let index = doc
                .users
                .iter()
                .position(|u| u.user_id == user_id && u.status == UserStatus::Archived)
                .ok_or_else(|| ApiError::NotFound("Archived user not found.".to_string()))?;
            doc.users.remove(index);
            Ok::<_, ApiError>(())
        })
        .await?;
    info!("archived user deleted: {}", user_id);
    Ok(Json(json!({
        "success": true,
        "message": "User permanently deleted.",
    })))
}

async fn delete_all_archived(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let count = state
        .store
        .mutate(|doc| {
            let before = doc.users.len();
            doc.users.retain(|u| u.status != UserStatus::Archived);
            Ok::<_, ApiError>(before - doc.users.len())
        })
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} archived users deleted.", count),
    })))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/add", post(add_user))
        .route("/api/users/:userId", get(get_user).put(update_user))
        .route("/api/users/:userId/archive", patch(archive_user))
        .route("/api/archived-users", get(list_archived))
        .route("/api/archived-users/restore-all", patch(restore_all))
        .route("/api/archived-users/restore/:userId", patch(restore_user))
        .route("/api/archived-users/delete-all", delete(delete_all_archived))
        .route("/api/archived-users/:userId", delete(delete_archived))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{PasswordHash, PasswordVerifier};

    fn user(user_id: &str, email: &str, status: UserStatus) -> User {
        User {
            id: next_record_id(),
            user_id: user_id.into(),
            full_name: "Jo".into(),
            user_type: UserRole::Trainee,
            email: email.into(),
            password: "hash".into(),
            created_at: Utc::now(),
            status,
            date_archived: None,
        }
    }

    #[test]
    fn generated_ids_carry_the_role_prefix() {
        let doc = Document::default();
        assert!(generate_user_id(&doc, UserRole::Trainee).starts_with('T'));
        assert!(generate_user_id(&doc, UserRole::Sme).starts_with('S'));
        assert!(generate_user_id(&doc, UserRole::Admin).starts_with('A'));
        assert_eq!(generate_user_id(&doc, UserRole::Trainee).len(), 5);
    }

    #[test]
    fn generated_ids_avoid_existing_ones() {
        let mut doc = Document::default();
        // Occupy most of the space; the generator must still terminate on a
        // free id.
        for n in 1000..9999 {
            doc.users
                .push(user(&format!("T{}", n), &format!("u{}@x.io", n), UserStatus::Active));
        }
        let id = generate_user_id(&doc, UserRole::Trainee);
        assert_eq!(id, "T9999");
    }

    #[test]
    fn duplicate_email_is_a_conflict_and_changes_nothing() {
        let mut doc = Document::default();
        register_user(
            &mut doc,
            "Jo".into(),
            UserRole::Trainee,
            "jo@x.io".into(),
            "hash".into(),
        )
        .expect("first");
        let err = register_user(
            &mut doc,
            "Other Jo".into(),
            UserRole::Sme,
            "JO@X.IO".into(),
            "hash2".into(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(doc.users.len(), 1);
    }

    #[test]
    fn archiving_an_archived_user_is_rejected() {
        let mut doc = Document::default();
        doc.users.push(user("T1001", "jo@x.io", UserStatus::Active));

        let archived = archive_account(&mut doc, "T1001").expect("archive");
        assert_eq!(archived.status, UserStatus::Archived);
        assert!(archived.date_archived.is_some());

        let err = archive_account(&mut doc, "T1001").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn restoring_a_non_archived_user_is_rejected() {
        let mut doc = Document::default();
        doc.users.push(user("T1001", "jo@x.io", UserStatus::Active));

        let err = restore_account(&mut doc, "T1001").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        archive_account(&mut doc, "T1001").expect("archive");
        let restored = restore_account(&mut doc, "T1001").expect("restore");
        assert_eq!(restored.status, UserStatus::Active);
        assert!(restored.date_archived.is_none());
    }

    #[test]
    fn restore_all_reactivates_and_clears_timestamps() {
        let mut doc = Document::default();
        doc.users.push(user("T1001", "a@x.io", UserStatus::Active));
        doc.users.push(user("T1002", "b@x.io", UserStatus::Active));
        doc.users.push(user("T1003", "c@x.io", UserStatus::Active));
        archive_account(&mut doc, "T1002").expect("archive");
        archive_account(&mut doc, "T1003").expect("archive");

        assert_eq!(restore_all_accounts(&mut doc), 2);
        assert!(doc
            .users
            .iter()
            .all(|u| u.status == UserStatus::Active && u.date_archived.is_none()));
        assert_eq!(restore_all_accounts(&mut doc), 0);
    }

    #[test]
    fn password_hash_verifies_and_is_not_plaintext() {
        let hash = hash_password("hunter2").expect("hash");
        assert_ne!(hash, "hunter2");
        let parsed = PasswordHash::new(&hash).expect("parse");
        assert!(Argon2::default()
            .verify_password(b"hunter2", &parsed)
            .is_ok());
    }

    #[test]
    fn safe_user_strips_the_password() {
        let value = safe_user(&user("T1001", "jo@x.io", UserStatus::Active));
        assert!(value.get("password").is_none());
        assert_eq!(value["userId"], "T1001");
    }
}
